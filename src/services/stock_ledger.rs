use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, Set, TransactionTrait,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::{Principal, Role};
use crate::entities::receipt_log::ReceiptEntryType;
use crate::entities::usage_log::UsageEntryType;
use crate::entities::{institution_stock, receipt_log, usage_log, warehouse_stock};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::batch::{total_current, total_sellable};
use crate::models::{InstitutionBatch, PacketSize, WarehouseBatch};
use crate::services::catalog::CatalogService;

/// Input for booking purchased stock into a warehouse.
#[derive(Debug, Clone)]
pub struct NewWarehouseBatch {
    pub batch_name: String,
    pub quantity: i32,
    pub mfg_date: Option<NaiveDate>,
    pub expiry_date: NaiveDate,
    pub packet_size: PacketSize,
    pub purchase_price: Decimal,
    pub selling_price: Decimal,
    pub mrp: Decimal,
    pub received_date: chrono::DateTime<Utc>,
}

/// Input for a manual institution-side stock addition.
#[derive(Debug, Clone)]
pub struct NewInstitutionBatch {
    pub batch_name: String,
    pub quantity: i32,
    pub expiry_date: NaiveDate,
    pub packet_size: PacketSize,
    pub purchase_price: Decimal,
    pub mrp: Decimal,
}

/// Whitelisted non-quantity batch fields open to correction after entry.
#[derive(Debug, Clone, Default)]
pub struct BatchDetailUpdate {
    pub mfg_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub packet_size: Option<PacketSize>,
    pub purchase_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    pub mrp: Option<Decimal>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AvailableMedicine {
    pub medicine_id: Uuid,
    pub available_quantity: i32,
}

/// Writes a warehouse stock record's batch array back, guarded by the
/// record version. Zero rows updated means another writer got there first.
pub(crate) async fn persist_warehouse_batches<C: ConnectionTrait>(
    conn: &C,
    record: &warehouse_stock::Model,
    batches: &[WarehouseBatch],
) -> Result<(), ServiceError> {
    let json = warehouse_stock::batches_to_json(batches)?;
    let result = warehouse_stock::Entity::update_many()
        .col_expr(warehouse_stock::Column::Batches, Expr::value(json))
        .col_expr(
            warehouse_stock::Column::Version,
            Expr::value(record.version + 1),
        )
        .col_expr(warehouse_stock::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(warehouse_stock::Column::Id.eq(record.id))
        .filter(warehouse_stock::Column::Version.eq(record.version))
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Err(ServiceError::ConcurrentModification(record.id));
    }
    Ok(())
}

pub(crate) async fn persist_institution_batches<C: ConnectionTrait>(
    conn: &C,
    record: &institution_stock::Model,
    batches: &[InstitutionBatch],
) -> Result<(), ServiceError> {
    let json = institution_stock::batches_to_json(batches)?;
    let result = institution_stock::Entity::update_many()
        .col_expr(institution_stock::Column::Batches, Expr::value(json))
        .col_expr(
            institution_stock::Column::Version,
            Expr::value(record.version + 1),
        )
        .col_expr(
            institution_stock::Column::UpdatedAt,
            Expr::value(Utc::now()),
        )
        .filter(institution_stock::Column::Id.eq(record.id))
        .filter(institution_stock::Column::Version.eq(record.version))
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Err(ServiceError::ConcurrentModification(record.id));
    }
    Ok(())
}

pub(crate) async fn find_warehouse_record<C: ConnectionTrait>(
    conn: &C,
    warehouse_id: Uuid,
    medicine_id: Uuid,
) -> Result<Option<warehouse_stock::Model>, ServiceError> {
    Ok(warehouse_stock::Entity::find()
        .filter(warehouse_stock::Column::WarehouseId.eq(warehouse_id))
        .filter(warehouse_stock::Column::MedicineId.eq(medicine_id))
        .filter(warehouse_stock::Column::IsDeleted.eq(false))
        .one(conn)
        .await?)
}

pub(crate) async fn find_institution_record<C: ConnectionTrait>(
    conn: &C,
    institution_id: Uuid,
    medicine_id: Uuid,
) -> Result<Option<institution_stock::Model>, ServiceError> {
    Ok(institution_stock::Entity::find()
        .filter(institution_stock::Column::InstitutionId.eq(institution_id))
        .filter(institution_stock::Column::MedicineId.eq(medicine_id))
        .filter(institution_stock::Column::IsDeleted.eq(false))
        .one(conn)
        .await?)
}

pub(crate) async fn find_or_create_institution_record<C: ConnectionTrait>(
    conn: &C,
    institution_id: Uuid,
    medicine_id: Uuid,
) -> Result<institution_stock::Model, ServiceError> {
    if let Some(record) = find_institution_record(conn, institution_id, medicine_id).await? {
        return Ok(record);
    }
    let now = Utc::now();
    let record = institution_stock::ActiveModel {
        id: Set(Uuid::new_v4()),
        institution_id: Set(institution_id),
        medicine_id: Set(medicine_id),
        batches: Set(serde_json::json!([])),
        version: Set(0),
        is_deleted: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(record.insert(conn).await?)
}

/// Warehouse and institution batch ledgers: receipts, manual additions,
/// availability views and soft deletion.
pub struct StockLedgerService {
    db: Arc<DatabaseConnection>,
    catalog: Arc<CatalogService>,
    event_sender: Option<EventSender>,
}

impl StockLedgerService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        catalog: Arc<CatalogService>,
        event_sender: Option<EventSender>,
    ) -> Self {
        Self {
            db,
            catalog,
            event_sender,
        }
    }

    /// Books purchased stock into a warehouse record, merging into an
    /// existing batch of the same name. A purchase receipt log row is
    /// written in the same transaction.
    #[instrument(skip(self, input), fields(batch = %input.batch_name))]
    pub async fn add_batch(
        &self,
        actor: Principal,
        warehouse_id: Uuid,
        medicine_id: Uuid,
        input: NewWarehouseBatch,
    ) -> Result<warehouse_stock::Model, ServiceError> {
        actor.require_role(Role::Warehouse)?;
        actor.require_owner(warehouse_id)?;
        if input.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "quantity must be positive".to_string(),
            ));
        }
        if input.batch_name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "batch name is required".to_string(),
            ));
        }

        let txn = self.db.begin().await?;
        self.catalog.ensure_warehouse(&txn, warehouse_id).await?;
        self.catalog
            .ensure_medicines_exist(&txn, &[medicine_id])
            .await?;

        let now = Utc::now();
        let record = match find_warehouse_record(&txn, warehouse_id, medicine_id).await? {
            Some(record) => record,
            None => {
                let fresh = warehouse_stock::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    warehouse_id: Set(warehouse_id),
                    medicine_id: Set(medicine_id),
                    batches: Set(serde_json::json!([])),
                    version: Set(0),
                    is_deleted: Set(false),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                fresh.insert(&txn).await?
            }
        };

        let mut batches = record.batches()?;
        match batches
            .iter_mut()
            .find(|b| b.batch_name == input.batch_name)
        {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(input.quantity)
                    .ok_or_else(|| {
                        ServiceError::ValidationError(format!(
                            "batch {} quantity would overflow",
                            input.batch_name
                        ))
                    })?;
            }
            None => batches.push(WarehouseBatch {
                batch_name: input.batch_name.clone(),
                quantity: input.quantity,
                reserved_quantity: 0,
                mfg_date: input.mfg_date,
                expiry_date: input.expiry_date,
                packet_size: input.packet_size,
                purchase_price: input.purchase_price,
                selling_price: input.selling_price,
                mrp: input.mrp,
                received_date: input.received_date,
                created_at: now,
            }),
        }
        persist_warehouse_batches(&txn, &record, &batches).await?;

        receipt_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            warehouse_id: Set(warehouse_id),
            medicine_id: Set(medicine_id),
            batch_name: Set(input.batch_name.clone()),
            quantity: Set(input.quantity),
            entry_type: Set(ReceiptEntryType::Purchase.to_string()),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        info!(%warehouse_id, %medicine_id, quantity = input.quantity, "stock booked in");

        if let Some(sender) = &self.event_sender {
            sender
                .send(Event::StockAdded {
                    warehouse_id,
                    medicine_id,
                    batch_name: input.batch_name,
                    quantity: input.quantity,
                })
                .await;
        }

        find_warehouse_record(&*self.db, warehouse_id, medicine_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("stock record vanished after insert"))
    }

    /// Manual institution-side addition, outside the shipment flow. An
    /// addition usage log row is written per appended batch.
    #[instrument(skip(self, inputs))]
    pub async fn add_manual(
        &self,
        actor: Principal,
        institution_id: Uuid,
        medicine_id: Uuid,
        inputs: Vec<NewInstitutionBatch>,
    ) -> Result<institution_stock::Model, ServiceError> {
        actor.require_role(Role::Institution)?;
        actor.require_owner(institution_id)?;
        if inputs.is_empty() {
            return Err(ServiceError::ValidationError(
                "at least one batch is required".to_string(),
            ));
        }
        if inputs.iter().any(|b| b.quantity <= 0) {
            return Err(ServiceError::ValidationError(
                "quantity must be positive".to_string(),
            ));
        }

        let txn = self.db.begin().await?;
        self.catalog.ensure_institution(&txn, institution_id).await?;
        self.catalog
            .ensure_medicines_exist(&txn, &[medicine_id])
            .await?;

        let record = find_or_create_institution_record(&txn, institution_id, medicine_id).await?;
        let mut batches = record.batches()?;
        let now = Utc::now();
        for input in &inputs {
            batches.push(InstitutionBatch {
                source_warehouse_id: None,
                batch_name: input.batch_name.clone(),
                expiry_date: input.expiry_date,
                packet_size: input.packet_size,
                quantity_received: input.quantity,
                current_quantity: input.quantity,
                purchase_price: input.purchase_price,
                mrp: input.mrp,
                received_date: now,
                created_at: now,
            });
            usage_log::ActiveModel {
                id: Set(Uuid::new_v4()),
                institution_id: Set(institution_id),
                medicine_id: Set(medicine_id),
                batch_name: Set(input.batch_name.clone()),
                quantity: Set(input.quantity),
                entry_type: Set(UsageEntryType::Addition.to_string()),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }
        persist_institution_batches(&txn, &record, &batches).await?;
        txn.commit().await?;

        find_institution_record(&*self.db, institution_id, medicine_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("stock record vanished after insert"))
    }

    /// Unreserved, unexpired warehouse stock per medicine, as shown to
    /// institutions planning a requirement.
    #[instrument(skip(self))]
    pub async fn available_stock(
        &self,
        warehouse_id: Uuid,
    ) -> Result<Vec<AvailableMedicine>, ServiceError> {
        let records = warehouse_stock::Entity::find()
            .filter(warehouse_stock::Column::WarehouseId.eq(warehouse_id))
            .filter(warehouse_stock::Column::IsDeleted.eq(false))
            .all(&*self.db)
            .await?;
        let today = Utc::now().date_naive();
        let mut out = Vec::with_capacity(records.len());
        for record in &records {
            let available = total_sellable(&record.batches()?, today);
            if available > 0 {
                out.push(AvailableMedicine {
                    medicine_id: record.medicine_id,
                    available_quantity: available,
                });
            }
        }
        Ok(out)
    }

    pub async fn list_warehouse_stock(
        &self,
        actor: Principal,
        warehouse_id: Uuid,
    ) -> Result<Vec<warehouse_stock::Model>, ServiceError> {
        actor.require_owner(warehouse_id)?;
        Ok(warehouse_stock::Entity::find()
            .filter(warehouse_stock::Column::WarehouseId.eq(warehouse_id))
            .filter(warehouse_stock::Column::IsDeleted.eq(false))
            .all(&*self.db)
            .await?)
    }

    pub async fn list_institution_stock(
        &self,
        actor: Principal,
        institution_id: Uuid,
    ) -> Result<Vec<institution_stock::Model>, ServiceError> {
        actor.require_owner(institution_id)?;
        Ok(institution_stock::Entity::find()
            .filter(institution_stock::Column::InstitutionId.eq(institution_id))
            .filter(institution_stock::Column::IsDeleted.eq(false))
            .all(&*self.db)
            .await?)
    }

    pub async fn institution_totals(
        &self,
        actor: Principal,
        institution_id: Uuid,
    ) -> Result<Vec<AvailableMedicine>, ServiceError> {
        let records = self.list_institution_stock(actor, institution_id).await?;
        let mut out = Vec::with_capacity(records.len());
        for record in &records {
            out.push(AvailableMedicine {
                medicine_id: record.medicine_id,
                available_quantity: total_current(&record.batches()?),
            });
        }
        Ok(out)
    }

    /// Soft-deletes a warehouse stock record. An absent or already deleted
    /// record is 404; a live record owned by someone else is 403.
    #[instrument(skip(self))]
    pub async fn soft_delete_warehouse_record(
        &self,
        actor: Principal,
        record_id: Uuid,
    ) -> Result<(), ServiceError> {
        actor.require_role(Role::Warehouse)?;
        let record = warehouse_stock::Entity::find_by_id(record_id)
            .one(&*self.db)
            .await?
            .filter(|r| !r.is_deleted)
            .ok_or_else(|| ServiceError::not_found(format!("stock record {record_id}")))?;
        actor.require_owner(record.warehouse_id)?;

        let mut active: warehouse_stock::ActiveModel = record.into();
        active.is_deleted = Set(true);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn soft_delete_institution_record(
        &self,
        actor: Principal,
        record_id: Uuid,
    ) -> Result<(), ServiceError> {
        actor.require_role(Role::Institution)?;
        let record = institution_stock::Entity::find_by_id(record_id)
            .one(&*self.db)
            .await?
            .filter(|r| !r.is_deleted)
            .ok_or_else(|| ServiceError::not_found(format!("stock record {record_id}")))?;
        actor.require_owner(record.institution_id)?;

        let mut active: institution_stock::ActiveModel = record.into();
        active.is_deleted = Set(true);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;
        Ok(())
    }

    /// Corrects descriptive batch fields. Quantities and reservations never
    /// change through this path.
    #[instrument(skip(self, update))]
    pub async fn update_batch_details(
        &self,
        actor: Principal,
        record_id: Uuid,
        batch_name: &str,
        update: BatchDetailUpdate,
    ) -> Result<warehouse_stock::Model, ServiceError> {
        actor.require_role(Role::Warehouse)?;
        let txn = self.db.begin().await?;
        let record = warehouse_stock::Entity::find_by_id(record_id)
            .one(&txn)
            .await?
            .filter(|r| !r.is_deleted)
            .ok_or_else(|| ServiceError::not_found(format!("stock record {record_id}")))?;
        actor.require_owner(record.warehouse_id)?;

        let mut batches = record.batches()?;
        let batch = batches
            .iter_mut()
            .find(|b| b.batch_name == batch_name)
            .ok_or_else(|| ServiceError::not_found(format!("batch {batch_name}")))?;
        if let Some(v) = update.mfg_date {
            batch.mfg_date = Some(v);
        }
        if let Some(v) = update.expiry_date {
            batch.expiry_date = v;
        }
        if let Some(v) = update.packet_size {
            batch.packet_size = v;
        }
        if let Some(v) = update.purchase_price {
            batch.purchase_price = v;
        }
        if let Some(v) = update.selling_price {
            batch.selling_price = v;
        }
        if let Some(v) = update.mrp {
            batch.mrp = v;
        }
        persist_warehouse_batches(&txn, &record, &batches).await?;
        txn.commit().await?;

        warehouse_stock::Entity::find_by_id(record_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("stock record {record_id}")))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use sea_orm::{ConnectOptions, Database};
    use sea_orm_migration::MigratorTrait;

    use super::*;
    use crate::migrator::Migrator;

    async fn connect() -> DatabaseConnection {
        let mut options = ConnectOptions::new("sqlite::memory:".to_string());
        options.max_connections(1).sqlx_logging(false);
        let db = Database::connect(options).await.expect("connect sqlite");
        Migrator::up(&db, None).await.expect("migrations");
        db
    }

    #[tokio::test]
    async fn a_stale_record_cannot_write_batches() {
        let db = connect().await;
        let now = Utc::now();
        let record = warehouse_stock::ActiveModel {
            id: Set(Uuid::new_v4()),
            warehouse_id: Set(Uuid::new_v4()),
            medicine_id: Set(Uuid::new_v4()),
            batches: Set(serde_json::json!([])),
            version: Set(0),
            is_deleted: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&db)
        .await
        .expect("insert record");

        persist_warehouse_batches(&db, &record, &[])
            .await
            .expect("first write");
        let err = persist_warehouse_batches(&db, &record, &[])
            .await
            .expect_err("stale write");
        assert_matches!(err, ServiceError::ConcurrentModification(id) if id == record.id);

        let current = warehouse_stock::Entity::find_by_id(record.id)
            .one(&db)
            .await
            .expect("query")
            .expect("row");
        assert_eq!(current.version, 1);
    }
}
