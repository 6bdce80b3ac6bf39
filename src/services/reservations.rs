use sea_orm::ConnectionTrait;
use tracing::warn;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::batch;
use crate::services::stock_ledger::{find_warehouse_record, persist_warehouse_batches};

/// Reserves and releases warehouse stock for requirement lines. All methods
/// run on a caller-provided connection so a whole approval decision shares
/// one transaction.
#[derive(Default)]
pub struct ReservationService;

impl ReservationService {
    pub fn new() -> Self {
        Self
    }

    /// Reserves `quantity` strips of one medicine, earliest expiry first.
    /// All-or-nothing per call.
    pub async fn reserve<C: ConnectionTrait>(
        &self,
        conn: &C,
        warehouse_id: Uuid,
        medicine_id: Uuid,
        quantity: i32,
    ) -> Result<(), ServiceError> {
        let record = find_warehouse_record(conn, warehouse_id, medicine_id)
            .await?
            .ok_or_else(|| {
                ServiceError::InsufficientStock {
                    requested: quantity,
                    available: 0,
                }
            })?;
        let mut batches = record.batches()?;
        batch::reserve(&mut batches, quantity)?;
        persist_warehouse_batches(conn, &record, &batches).await
    }

    /// Releases up to `quantity` previously reserved strips. A shortfall is
    /// logged, not raised; reservations may already have been consumed by a
    /// shipment.
    pub async fn release<C: ConnectionTrait>(
        &self,
        conn: &C,
        warehouse_id: Uuid,
        medicine_id: Uuid,
        quantity: i32,
    ) -> Result<i32, ServiceError> {
        if quantity <= 0 {
            return Ok(0);
        }
        let Some(record) = find_warehouse_record(conn, warehouse_id, medicine_id).await? else {
            warn!(%warehouse_id, %medicine_id, quantity, "release against missing stock record");
            return Ok(0);
        };
        let mut batches = record.batches()?;
        let released = batch::release(&mut batches, quantity);
        if released < quantity {
            warn!(
                %warehouse_id,
                %medicine_id,
                requested = quantity,
                released,
                discrepancy = quantity - released,
                "could not release full reserved quantity"
            );
        }
        persist_warehouse_batches(conn, &record, &batches).await?;
        Ok(released)
    }
}
