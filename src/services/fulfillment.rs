use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::{Principal, Role};
use crate::entities::receipt_log::ReceiptEntryType;
use crate::entities::{logistic, receipt_log, requirement};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::batch;
use crate::models::shipment::generate_shipment_id;
use crate::models::{
    LegTimestamps, LineStatus, ReceivedStatus, RequirementStatus, ShipmentStatus, ShippedMedicine,
    VehicleLeg,
};
use crate::services::requirements::persist_requirement;
use crate::services::stock_ledger::{find_warehouse_record, persist_warehouse_batches};

/// Writes a shipment's mutable columns back, guarded by the record
/// version. Zero rows updated means another writer got there first.
pub(crate) async fn persist_logistic<C: ConnectionTrait>(
    conn: &C,
    record: &logistic::Model,
    status: ShipmentStatus,
    received_status: ReceivedStatus,
    vehicles: &[VehicleLeg],
) -> Result<(), ServiceError> {
    let json = logistic::vehicles_to_json(vehicles)?;
    let result = logistic::Entity::update_many()
        .col_expr(logistic::Column::Status, Expr::value(status.to_string()))
        .col_expr(
            logistic::Column::ReceivedStatus,
            Expr::value(received_status.to_string()),
        )
        .col_expr(logistic::Column::Vehicles, Expr::value(json))
        .col_expr(logistic::Column::Version, Expr::value(record.version + 1))
        .col_expr(logistic::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(logistic::Column::Id.eq(record.id))
        .filter(logistic::Column::Version.eq(record.version))
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Err(ServiceError::ConcurrentModification(record.id));
    }
    Ok(())
}

/// Vehicle details supplied when a shipment is raised.
#[derive(Debug, Clone)]
pub struct VehicleInput {
    pub vehicle_number: String,
    pub driver_name: String,
    pub driver_contact: String,
}

/// Raises shipments against approved requirements and tracks their
/// transport status.
pub struct FulfillmentService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<EventSender>,
}

impl FulfillmentService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Ships every approved line of a requirement, consuming reserved
    /// stock earliest-expiry-first and freezing per-batch snapshots. Fully
    /// transactional; any line that cannot be covered aborts the shipment.
    #[instrument(skip(self, vehicles))]
    pub async fn create_shipment(
        &self,
        actor: Principal,
        requirement_id: Uuid,
        vehicles: Vec<VehicleInput>,
    ) -> Result<logistic::Model, ServiceError> {
        actor.require_role(Role::Warehouse)?;
        if vehicles.is_empty() {
            return Err(ServiceError::ValidationError(
                "at least one vehicle is required".to_string(),
            ));
        }

        let txn = self.db.begin().await?;
        let req = requirement::Entity::find_by_id(requirement_id)
            .one(&txn)
            .await?
            .filter(|r| !r.is_deleted)
            .ok_or_else(|| ServiceError::not_found(format!("requirement {requirement_id}")))?;
        actor.require_owner(req.warehouse_id)?;

        if req.logistic_id.is_some() {
            return Err(ServiceError::InvalidStateTransition(
                "requirement is already shipped".to_string(),
            ));
        }
        let status = req.status()?;
        let lines = req.lines()?;
        let undecided = lines.iter().any(|l| l.status == LineStatus::Pending);
        if !status.is_shippable() || undecided {
            return Err(ServiceError::InvalidStateTransition(format!(
                "requirement is {status} and cannot be shipped"
            )));
        }

        let now = Utc::now();
        let mut shipped: Vec<ShippedMedicine> = Vec::new();
        for line in lines
            .iter()
            .filter(|l| l.status == LineStatus::Approved && l.approved_quantity > 0)
        {
            let record = find_warehouse_record(&txn, req.warehouse_id, line.medicine_id)
                .await?
                .ok_or_else(|| {
                    ServiceError::StockInconsistency(format!(
                        "no stock record for approved medicine {}",
                        line.medicine_id
                    ))
                })?;
            let mut batches = record.batches()?;
            let reserved_total: i32 = batches.iter().map(|b| b.reserved_quantity).sum();
            if reserved_total < line.approved_quantity {
                return Err(ServiceError::ValidationError(format!(
                    "approved quantity {} exceeds reserved {} for medicine {}",
                    line.approved_quantity, reserved_total, line.medicine_id
                )));
            }
            let snapshots = batch::ship(&mut batches, line.approved_quantity)?;
            persist_warehouse_batches(&txn, &record, &batches).await?;

            for snap in &snapshots {
                receipt_log::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    warehouse_id: Set(req.warehouse_id),
                    medicine_id: Set(line.medicine_id),
                    batch_name: Set(snap.batch_name.clone()),
                    quantity: Set(snap.quantity),
                    entry_type: Set(ReceiptEntryType::Sale.to_string()),
                    created_at: Set(now),
                }
                .insert(&txn)
                .await?;
            }
            shipped.push(ShippedMedicine {
                medicine_id: line.medicine_id,
                batches: snapshots,
            });
        }

        let legs: Vec<VehicleLeg> = vehicles
            .into_iter()
            .map(|v| VehicleLeg {
                vehicle_number: v.vehicle_number,
                driver_name: v.driver_name,
                driver_contact: v.driver_contact,
                timestamps: LegTimestamps {
                    loaded_at: Some(now),
                    departed_at: Some(now),
                    arrived_at: None,
                    unloaded_at: None,
                },
            })
            .collect();

        let shipment_id = generate_shipment_id();
        let model = logistic::ActiveModel {
            id: Set(Uuid::new_v4()),
            shipment_id: Set(shipment_id.clone()),
            requirement_id: Set(requirement_id),
            warehouse_id: Set(req.warehouse_id),
            institution_id: Set(req.institution_id),
            medicines: Set(logistic::medicines_to_json(&shipped)?),
            vehicles: Set(logistic::vehicles_to_json(&legs)?),
            status: Set(ShipmentStatus::InTransit.to_string()),
            received_status: Set(ReceivedStatus::Pending.to_string()),
            version: Set(0),
            is_deleted: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let institution_id = req.institution_id;
        persist_requirement(&txn, &req, &lines, RequirementStatus::Shipped, Some(model.id)).await?;

        txn.commit().await?;
        info!(%shipment_id, %requirement_id, "shipment created");

        if let Some(sender) = &self.event_sender {
            sender
                .send(Event::ShipmentCreated {
                    logistic_id: model.id,
                    shipment_id,
                    requirement_id,
                    institution_id,
                })
                .await;
        }
        Ok(model)
    }

    /// Moves transport status forward. `Delivered` is terminal and nothing
    /// changes once the institution has received the shipment.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        actor: Principal,
        logistic_id: Uuid,
        new_status: ShipmentStatus,
    ) -> Result<logistic::Model, ServiceError> {
        actor.require_role(Role::Warehouse)?;
        let txn = self.db.begin().await?;
        let model = logistic::Entity::find_by_id(logistic_id)
            .one(&txn)
            .await?
            .filter(|l| !l.is_deleted)
            .ok_or_else(|| ServiceError::not_found(format!("shipment {logistic_id}")))?;
        actor.require_owner(model.warehouse_id)?;

        if model.received_status()? == ReceivedStatus::Received {
            return Err(ServiceError::InvalidStateTransition(
                "shipment was already received by the institution".to_string(),
            ));
        }
        let current = model.status()?;
        if current == ShipmentStatus::Delivered && new_status != ShipmentStatus::Delivered {
            return Err(ServiceError::InvalidStateTransition(
                "a delivered shipment cannot revert".to_string(),
            ));
        }

        let now = Utc::now();
        let delivered_now = new_status == ShipmentStatus::Delivered && current != new_status;
        let requirement_id = model.requirement_id;
        let institution_id = model.institution_id;
        let shipment_ref = model.shipment_id.clone();

        let mut vehicles = model.vehicles()?;
        if delivered_now {
            for leg in &mut vehicles {
                leg.timestamps.arrived_at = Some(now);
            }
        }

        persist_logistic(&txn, &model, new_status, model.received_status()?, &vehicles).await?;

        if delivered_now {
            if let Some(req) = requirement::Entity::find_by_id(requirement_id).one(&txn).await? {
                let req_lines = req.lines()?;
                persist_requirement(
                    &txn,
                    &req,
                    &req_lines,
                    RequirementStatus::Delivered,
                    req.logistic_id,
                )
                .await?;
            }
        }
        txn.commit().await?;

        if delivered_now {
            if let Some(sender) = &self.event_sender {
                sender
                    .send(Event::ShipmentDelivered {
                        logistic_id,
                        shipment_id: shipment_ref,
                        institution_id,
                    })
                    .await;
            }
        }
        logistic::Entity::find_by_id(logistic_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("shipment {logistic_id}")))
    }

    pub async fn get(
        &self,
        actor: Principal,
        logistic_id: Uuid,
    ) -> Result<logistic::Model, ServiceError> {
        let model = logistic::Entity::find_by_id(logistic_id)
            .one(&*self.db)
            .await?
            .filter(|l| !l.is_deleted)
            .ok_or_else(|| ServiceError::not_found(format!("shipment {logistic_id}")))?;
        match actor.role {
            Role::Admin => {}
            Role::Warehouse => actor.require_owner(model.warehouse_id)?,
            Role::Institution => actor.require_owner(model.institution_id)?,
        }
        Ok(model)
    }

    pub async fn list(&self, actor: Principal) -> Result<Vec<logistic::Model>, ServiceError> {
        let mut query = logistic::Entity::find()
            .filter(logistic::Column::IsDeleted.eq(false))
            .order_by_desc(logistic::Column::CreatedAt);
        query = match actor.role {
            Role::Admin => query,
            Role::Warehouse => query.filter(logistic::Column::WarehouseId.eq(actor.id)),
            Role::Institution => query.filter(logistic::Column::InstitutionId.eq(actor.id)),
        };
        Ok(query.all(&*self.db).await?)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use sea_orm::{ConnectOptions, Database, DatabaseConnection};
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
    async fn a_stale_shipment_record_cannot_write() {
        let db = connect().await;
        let now = Utc::now();
        let model = logistic::ActiveModel {
            id: Set(Uuid::new_v4()),
            shipment_id: Set(generate_shipment_id()),
            requirement_id: Set(Uuid::new_v4()),
            warehouse_id: Set(Uuid::new_v4()),
            institution_id: Set(Uuid::new_v4()),
            medicines: Set(logistic::medicines_to_json(&[]).unwrap()),
            vehicles: Set(logistic::vehicles_to_json(&[]).unwrap()),
            status: Set(ShipmentStatus::InTransit.to_string()),
            received_status: Set(ReceivedStatus::Pending.to_string()),
            version: Set(0),
            is_deleted: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&db)
        .await
        .expect("insert shipment");

        persist_logistic(&db, &model, ShipmentStatus::Delivered, ReceivedStatus::Pending, &[])
            .await
            .expect("first write");
        let err = persist_logistic(&db, &model, ShipmentStatus::Pending, ReceivedStatus::Pending, &[])
            .await
            .expect_err("stale write");
        assert_matches!(err, ServiceError::ConcurrentModification(_));

        let current = logistic::Entity::find_by_id(model.id)
            .one(&db)
            .await
            .expect("query")
            .expect("row");
        assert_eq!(current.status, ShipmentStatus::Delivered.to_string());
        assert_eq!(current.version, 1);
    }
}
