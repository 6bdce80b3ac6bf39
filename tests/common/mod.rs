#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use tokio::sync::mpsc;
use uuid::Uuid;

use pharmstock_api::auth::{Principal, Role};
use pharmstock_api::entities::{institution, medicine, warehouse};
use pharmstock_api::events::{process_events, EventSender};
use pharmstock_api::migrator::Migrator;
use pharmstock_api::models::PacketSize;
use pharmstock_api::notifications::{LogTransport, NotificationService};
use pharmstock_api::models::LineStatus;
use pharmstock_api::services::requirements::{policy_from_name, LineDecision};
use pharmstock_api::services::stock_ledger::NewWarehouseBatch;
use pharmstock_api::services::AppServices;

/// Everything a scenario needs: services over a fresh in-memory database
/// plus one seeded warehouse and institution with matching principals.
pub struct TestApp {
    pub db: Arc<DatabaseConnection>,
    pub services: AppServices,
    pub warehouse_id: Uuid,
    pub institution_id: Uuid,
    pub warehouse: Principal,
    pub institution: Principal,
    pub admin: Principal,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with_policy("all_or_nothing").await
}

pub async fn spawn_app_with_policy(policy: &str) -> TestApp {
    // A single pool connection keeps every session on the same in-memory
    // database.
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options.max_connections(1).sqlx_logging(false);
    let db = Arc::new(Database::connect(options).await.expect("connect sqlite"));
    Migrator::up(db.as_ref(), None).await.expect("migrations");

    let (tx, rx) = mpsc::channel(64);
    let notifier = NotificationService::new(Arc::new(LogTransport), false);
    tokio::spawn(process_events(rx, notifier));
    let services = AppServices::new(
        db.clone(),
        EventSender::new(tx),
        policy_from_name(policy).expect("policy"),
    );

    let warehouse_id = Uuid::new_v4();
    warehouse::ActiveModel {
        id: Set(warehouse_id),
        name: Set("Central Warehouse".to_string()),
        email: Set("central@example.org".to_string()),
        is_deleted: Set(false),
        created_at: Set(Utc::now()),
    }
    .insert(db.as_ref())
    .await
    .expect("seed warehouse");

    let institution_id = Uuid::new_v4();
    institution::ActiveModel {
        id: Set(institution_id),
        name: Set("City Hospital".to_string()),
        email: Set("pharmacy@example.org".to_string()),
        is_deleted: Set(false),
        created_at: Set(Utc::now()),
    }
    .insert(db.as_ref())
    .await
    .expect("seed institution");

    TestApp {
        db,
        services,
        warehouse_id,
        institution_id,
        warehouse: Principal {
            id: warehouse_id,
            role: Role::Warehouse,
        },
        institution: Principal {
            id: institution_id,
            role: Role::Institution,
        },
        admin: Principal {
            id: Uuid::new_v4(),
            role: Role::Admin,
        },
    }
}

impl TestApp {
    pub async fn seed_medicine(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        medicine::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            manufacturer: Set(None),
            is_deleted: Set(false),
            created_at: Set(Utc::now()),
        }
        .insert(self.db.as_ref())
        .await
        .expect("seed medicine");
        id
    }

    pub async fn seed_batch(&self, medicine_id: Uuid, batch_name: &str, quantity: i32, expiry: &str) {
        self.services
            .stock_ledger
            .add_batch(
                self.warehouse,
                self.warehouse_id,
                medicine_id,
                new_batch(batch_name, quantity, expiry),
            )
            .await
            .expect("seed batch");
    }
}

impl TestApp {
    pub async fn warehouse_batches(
        &self,
        medicine_id: Uuid,
    ) -> Vec<pharmstock_api::models::WarehouseBatch> {
        use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
        let record = pharmstock_api::entities::warehouse_stock::Entity::find()
            .filter(
                pharmstock_api::entities::warehouse_stock::Column::WarehouseId
                    .eq(self.warehouse_id),
            )
            .filter(
                pharmstock_api::entities::warehouse_stock::Column::MedicineId.eq(medicine_id),
            )
            .one(self.db.as_ref())
            .await
            .expect("query stock")
            .expect("stock record");
        record.batches().expect("decode batches")
    }

    pub async fn institution_batches(
        &self,
        medicine_id: Uuid,
    ) -> Vec<pharmstock_api::models::InstitutionBatch> {
        use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
        let record = pharmstock_api::entities::institution_stock::Entity::find()
            .filter(
                pharmstock_api::entities::institution_stock::Column::InstitutionId
                    .eq(self.institution_id),
            )
            .filter(
                pharmstock_api::entities::institution_stock::Column::MedicineId.eq(medicine_id),
            )
            .one(self.db.as_ref())
            .await
            .expect("query stock")
            .expect("stock record");
        record.batches().expect("decode batches")
    }
}

/// Full-approval decision set for every line of a requirement.
pub fn approve_all(model: &pharmstock_api::entities::requirement::Model) -> Vec<LineDecision> {
    model
        .lines()
        .expect("decode lines")
        .iter()
        .map(|l| LineDecision {
            medicine_id: l.medicine_id,
            status: LineStatus::Approved,
            approved_quantity: l.requested_quantity,
        })
        .collect()
}

pub fn new_batch(batch_name: &str, quantity: i32, expiry: &str) -> NewWarehouseBatch {
    NewWarehouseBatch {
        batch_name: batch_name.to_string(),
        quantity,
        mfg_date: None,
        expiry_date: expiry.parse::<NaiveDate>().expect("expiry date"),
        packet_size: PacketSize::default(),
        purchase_price: dec!(8.00),
        selling_price: dec!(10.00),
        mrp: dec!(12.50),
        received_date: Utc::now(),
    }
}
