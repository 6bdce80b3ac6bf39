use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set, TransactionTrait};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::{Principal, Role};
use crate::entities::usage_log::UsageEntryType;
use crate::entities::usage_log;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::batch;
use crate::services::stock_ledger::{find_institution_record, persist_institution_batches};

/// Debits institution stock as medicines are dispensed.
pub struct UsageService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<EventSender>,
}

impl UsageService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Debits `quantity` strips earliest-expiry-first, writing one usage
    /// log row per batch touched. The debit and its log rows commit
    /// together or not at all.
    #[instrument(skip(self))]
    pub async fn log_usage(
        &self,
        actor: Principal,
        institution_id: Uuid,
        medicine_id: Uuid,
        quantity: i32,
    ) -> Result<(), ServiceError> {
        actor.require_role(Role::Institution)?;
        actor.require_owner(institution_id)?;
        if quantity < 1 {
            return Err(ServiceError::ValidationError(
                "usage quantity must be at least 1".to_string(),
            ));
        }

        let txn = self.db.begin().await?;
        let record = find_institution_record(&txn, institution_id, medicine_id)
            .await?
            .ok_or(ServiceError::InsufficientStock {
                requested: quantity,
                available: 0,
            })?;
        let mut batches = record.batches()?;
        let debits = batch::deduct(&mut batches, quantity)?;
        persist_institution_batches(&txn, &record, &batches).await?;

        let now = Utc::now();
        for (batch_name, taken) in &debits {
            usage_log::ActiveModel {
                id: Set(Uuid::new_v4()),
                institution_id: Set(institution_id),
                medicine_id: Set(medicine_id),
                batch_name: Set(batch_name.clone()),
                quantity: Set(*taken),
                entry_type: Set(UsageEntryType::Usage.to_string()),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }
        txn.commit().await?;
        info!(%institution_id, %medicine_id, quantity, batches = debits.len(), "usage logged");

        if let Some(sender) = &self.event_sender {
            sender
                .send(Event::UsageLogged {
                    institution_id,
                    medicine_id,
                    quantity,
                })
                .await;
        }
        Ok(())
    }
}
