use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, Set, TransactionTrait,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::{Principal, Role};
use crate::entities::usage_log::UsageEntryType;
use crate::entities::{logistic, requirement, usage_log};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::{InstitutionBatch, ReceivedStatus, RequirementStatus, ShipmentStatus};
use crate::services::fulfillment::persist_logistic;
use crate::services::requirements::persist_requirement;
use crate::services::stock_ledger::{
    find_or_create_institution_record, persist_institution_batches,
};

/// Books a delivered shipment into institution stock.
pub struct ReceiptService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<EventSender>,
}

impl ReceiptService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Marks the shipment received and appends every shipped batch to the
    /// institution's stock, one addition log row per batch. Idempotent: a
    /// second call is rejected with `AlreadyReceived` and changes nothing.
    #[instrument(skip(self))]
    pub async fn receive_shipment(
        &self,
        actor: Principal,
        logistic_id: Uuid,
    ) -> Result<logistic::Model, ServiceError> {
        actor.require_role(Role::Institution)?;
        let txn = self.db.begin().await?;
        let model = logistic::Entity::find_by_id(logistic_id)
            .one(&txn)
            .await?
            .filter(|l| !l.is_deleted)
            .ok_or_else(|| ServiceError::not_found(format!("shipment {logistic_id}")))?;
        actor.require_owner(model.institution_id)?;

        if model.received_status()? == ReceivedStatus::Received {
            return Err(ServiceError::AlreadyReceived(logistic_id));
        }
        if model.status()? != ShipmentStatus::Delivered {
            // Receiving ahead of the transport update is allowed; the
            // institution has the goods in hand.
            warn!(shipment = %model.shipment_id, status = %model.status, "receiving before transport reports delivery");
        }

        let now = Utc::now();
        let institution_id = model.institution_id;
        let warehouse_id = model.warehouse_id;
        let shipment_ref = model.shipment_id.clone();

        for medicine in model.medicines()? {
            let record =
                find_or_create_institution_record(&txn, institution_id, medicine.medicine_id)
                    .await?;
            let mut batches = record.batches()?;
            for snap in &medicine.batches {
                batches.push(InstitutionBatch {
                    source_warehouse_id: Some(warehouse_id),
                    batch_name: snap.batch_name.clone(),
                    expiry_date: snap.expiry_date,
                    packet_size: snap.packet_size,
                    quantity_received: snap.quantity,
                    current_quantity: snap.quantity,
                    purchase_price: snap.selling_price,
                    mrp: snap.mrp,
                    received_date: now,
                    created_at: now,
                });
                usage_log::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    institution_id: Set(institution_id),
                    medicine_id: Set(medicine.medicine_id),
                    batch_name: Set(snap.batch_name.clone()),
                    quantity: Set(snap.quantity),
                    entry_type: Set(UsageEntryType::Addition.to_string()),
                    created_at: Set(now),
                }
                .insert(&txn)
                .await?;
            }
            persist_institution_batches(&txn, &record, &batches).await?;
        }

        let mut vehicles = model.vehicles()?;
        for leg in &mut vehicles {
            leg.timestamps.unloaded_at = Some(now);
        }
        let requirement_id = model.requirement_id;
        persist_logistic(&txn, &model, model.status()?, ReceivedStatus::Received, &vehicles)
            .await?;

        if let Some(req) = requirement::Entity::find_by_id(requirement_id).one(&txn).await? {
            let req_lines = req.lines()?;
            persist_requirement(
                &txn,
                &req,
                &req_lines,
                RequirementStatus::Received,
                req.logistic_id,
            )
            .await?;
        }
        txn.commit().await?;
        info!(shipment = %shipment_ref, "shipment received into institution stock");

        if let Some(sender) = &self.event_sender {
            sender
                .send(Event::ShipmentReceived {
                    logistic_id,
                    shipment_id: shipment_ref,
                    institution_id,
                })
                .await;
        }
        logistic::Entity::find_by_id(logistic_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("shipment {logistic_id}")))
    }
}
