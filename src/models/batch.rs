use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::shipment::BatchSnapshot;

/// Pack geometry of a medicine batch, in strips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketSize {
    pub strips: i32,
    pub tablets_per_strip: i32,
}

impl Default for PacketSize {
    fn default() -> Self {
        Self {
            strips: 1,
            tablets_per_strip: 10,
        }
    }
}

/// One expiry-dated batch inside a warehouse stock record. Quantities are
/// strips. `reserved_quantity` is the portion already promised to approved
/// requirements and never exceeds `quantity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseBatch {
    pub batch_name: String,
    pub quantity: i32,
    #[serde(default)]
    pub reserved_quantity: i32,
    pub mfg_date: Option<NaiveDate>,
    pub expiry_date: NaiveDate,
    #[serde(default)]
    pub packet_size: PacketSize,
    pub purchase_price: Decimal,
    pub selling_price: Decimal,
    pub mrp: Decimal,
    pub received_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl WarehouseBatch {
    pub fn available(&self) -> i32 {
        self.quantity - self.reserved_quantity
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date < today
    }
}

/// One batch held by an institution, fed by received shipments or manual
/// additions. `current_quantity` drains toward zero as usage is logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstitutionBatch {
    pub source_warehouse_id: Option<Uuid>,
    pub batch_name: String,
    pub expiry_date: NaiveDate,
    #[serde(default)]
    pub packet_size: PacketSize,
    pub quantity_received: i32,
    pub current_quantity: i32,
    pub purchase_price: Decimal,
    pub mrp: Decimal,
    pub received_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Indices of `batches` ordered earliest-expiry-first, ties broken by batch
/// creation time. The sort is stable, so fully tied batches keep their
/// insertion order.
fn fefo_order<T, K: Ord>(batches: &[T], key: impl Fn(&T) -> K) -> Vec<usize> {
    let mut order: Vec<usize> = (0..batches.len()).collect();
    order.sort_by_key(|&i| key(&batches[i]));
    order
}

pub fn total_available(batches: &[WarehouseBatch]) -> i32 {
    batches.iter().map(WarehouseBatch::available).sum()
}

pub fn total_current(batches: &[InstitutionBatch]) -> i32 {
    batches.iter().map(|b| b.current_quantity).sum()
}

/// Available (unreserved, unexpired) quantity as exposed to institutions
/// browsing warehouse stock.
pub fn total_sellable(batches: &[WarehouseBatch], today: NaiveDate) -> i32 {
    batches
        .iter()
        .filter(|b| !b.is_expired(today))
        .map(WarehouseBatch::available)
        .sum()
}

/// Reserves `quantity` strips across `batches`, earliest expiry first.
///
/// All-or-nothing: if total availability falls short, no batch is touched
/// and `InsufficientStock` reports the shortfall.
pub fn reserve(batches: &mut [WarehouseBatch], quantity: i32) -> Result<(), ServiceError> {
    let available = total_available(batches);
    if available < quantity {
        return Err(ServiceError::InsufficientStock {
            requested: quantity,
            available,
        });
    }
    let mut remaining = quantity;
    for i in fefo_order(batches, |b| (b.expiry_date, b.created_at)) {
        if remaining == 0 {
            break;
        }
        let batch = &mut batches[i];
        let take = remaining.min(batch.available());
        batch.reserved_quantity += take;
        remaining -= take;
    }
    debug_assert_eq!(remaining, 0);
    Ok(())
}

/// Releases up to `quantity` reserved strips, earliest expiry first.
///
/// Returns how much was actually released. A shortfall is tolerated; the
/// caller logs the discrepancy and carries on.
pub fn release(batches: &mut [WarehouseBatch], quantity: i32) -> i32 {
    let mut remaining = quantity;
    for i in fefo_order(batches, |b| (b.expiry_date, b.created_at)) {
        if remaining == 0 {
            break;
        }
        let batch = &mut batches[i];
        let give_back = remaining.min(batch.reserved_quantity);
        batch.reserved_quantity -= give_back;
        remaining -= give_back;
    }
    quantity - remaining
}

/// Ships `quantity` strips out of previously reserved stock, earliest expiry
/// first, decrementing both on-hand and reserved counts and snapshotting
/// each batch taken from.
///
/// The caller has already checked `sum(reserved) >= quantity`; if the walk
/// still cannot account for the full amount the records are corrupt and
/// `StockInconsistency` is returned.
pub fn ship(
    batches: &mut [WarehouseBatch],
    quantity: i32,
) -> Result<Vec<BatchSnapshot>, ServiceError> {
    let mut remaining = quantity;
    let mut snapshots = Vec::new();
    for i in fefo_order(batches, |b| (b.expiry_date, b.created_at)) {
        if remaining == 0 {
            break;
        }
        let batch = &mut batches[i];
        let take = remaining.min(batch.reserved_quantity).min(batch.quantity);
        if take <= 0 {
            continue;
        }
        batch.quantity -= take;
        batch.reserved_quantity -= take;
        remaining -= take;
        snapshots.push(BatchSnapshot {
            batch_name: batch.batch_name.clone(),
            expiry_date: batch.expiry_date,
            quantity: take,
            packet_size: batch.packet_size,
            selling_price: batch.selling_price,
            mrp: batch.mrp,
        });
    }
    if remaining > 0 {
        return Err(ServiceError::StockInconsistency(format!(
            "could not ship {remaining} of {quantity} strips from reserved stock"
        )));
    }
    Ok(snapshots)
}

/// Debits `quantity` strips of institution stock, earliest expiry first.
///
/// Returns `(batch_name, taken)` per touched batch for usage logging. The
/// upfront total check makes a shortfall during the walk an internal
/// consistency failure.
pub fn deduct(
    batches: &mut [InstitutionBatch],
    quantity: i32,
) -> Result<Vec<(String, i32)>, ServiceError> {
    let current = total_current(batches);
    if current < quantity {
        return Err(ServiceError::InsufficientStock {
            requested: quantity,
            available: current,
        });
    }
    let mut remaining = quantity;
    let mut debits = Vec::new();
    for i in fefo_order(batches, |b| (b.expiry_date, b.created_at)) {
        if remaining == 0 {
            break;
        }
        let batch = &mut batches[i];
        let take = remaining.min(batch.current_quantity);
        if take <= 0 {
            continue;
        }
        batch.current_quantity -= take;
        remaining -= take;
        debits.push((batch.batch_name.clone(), take));
    }
    if remaining > 0 {
        return Err(ServiceError::StockInconsistency(format!(
            "could not debit {remaining} of {quantity} strips after availability check"
        )));
    }
    Ok(debits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn wb(name: &str, qty: i32, reserved: i32, expiry: &str, created_min: u32) -> WarehouseBatch {
        WarehouseBatch {
            batch_name: name.to_string(),
            quantity: qty,
            reserved_quantity: reserved,
            mfg_date: None,
            expiry_date: expiry.parse().unwrap(),
            packet_size: PacketSize::default(),
            purchase_price: dec!(8.50),
            selling_price: dec!(10.00),
            mrp: dec!(12.00),
            received_date: Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap(),
            created_at: Utc
                .with_ymd_and_hms(2026, 1, 1, 9, created_min, 0)
                .unwrap(),
        }
    }

    fn ib(name: &str, current: i32, received: i32, expiry: &str) -> InstitutionBatch {
        InstitutionBatch {
            source_warehouse_id: None,
            batch_name: name.to_string(),
            expiry_date: expiry.parse().unwrap(),
            packet_size: PacketSize::default(),
            quantity_received: received,
            current_quantity: current,
            purchase_price: dec!(10.00),
            mrp: dec!(12.00),
            received_date: Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap(),
            created_at: Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn reserve_prefers_earliest_expiry() {
        // Stored out of expiry order on purpose.
        let mut batches = vec![
            wb("B-LATE", 100, 0, "2027-06-30", 0),
            wb("B-EARLY", 10, 0, "2026-09-30", 1),
            wb("B-MID", 50, 0, "2026-12-31", 2),
        ];
        reserve(&mut batches, 40).unwrap();
        assert_eq!(batches[1].reserved_quantity, 10); // earliest, drained
        assert_eq!(batches[2].reserved_quantity, 30); // next expiry
        assert_eq!(batches[0].reserved_quantity, 0); // latest, untouched
    }

    #[test]
    fn reserve_tie_breaks_on_creation_order() {
        let mut batches = vec![
            wb("SECOND", 50, 0, "2026-09-30", 5),
            wb("FIRST", 50, 0, "2026-09-30", 1),
        ];
        reserve(&mut batches, 60).unwrap();
        assert_eq!(batches[1].reserved_quantity, 50);
        assert_eq!(batches[0].reserved_quantity, 10);
    }

    #[test]
    fn reserve_exact_availability_succeeds() {
        let mut batches = vec![wb("A", 30, 10, "2026-09-30", 0)];
        reserve(&mut batches, 20).unwrap();
        assert_eq!(batches[0].reserved_quantity, 30);
        assert_eq!(batches[0].available(), 0);
    }

    #[test]
    fn reserve_one_over_availability_fails_without_side_effects() {
        let mut batches = vec![
            wb("A", 30, 10, "2026-09-30", 0),
            wb("B", 5, 0, "2026-12-31", 1),
        ];
        let err = reserve(&mut batches, 26).unwrap_err();
        match err {
            ServiceError::InsufficientStock {
                requested,
                available,
            } => {
                assert_eq!(requested, 26);
                assert_eq!(available, 25);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(batches[0].reserved_quantity, 10);
        assert_eq!(batches[1].reserved_quantity, 0);
    }

    #[test]
    fn release_is_bounded_and_reports_shortfall() {
        let mut batches = vec![
            wb("A", 30, 5, "2026-09-30", 0),
            wb("B", 30, 3, "2026-12-31", 1),
        ];
        let released = release(&mut batches, 20);
        assert_eq!(released, 8);
        assert_eq!(batches[0].reserved_quantity, 0);
        assert_eq!(batches[1].reserved_quantity, 0);
    }

    #[test]
    fn ship_decrements_both_counts_and_snapshots() {
        let mut batches = vec![
            wb("A", 10, 10, "2026-09-30", 0),
            wb("B", 50, 15, "2026-12-31", 1),
        ];
        let snaps = ship(&mut batches, 25).unwrap();
        assert_eq!(snaps.len(), 2);
        assert_eq!(snaps[0].batch_name, "A");
        assert_eq!(snaps[0].quantity, 10);
        assert_eq!(snaps[1].batch_name, "B");
        assert_eq!(snaps[1].quantity, 15);
        assert_eq!(batches[0].quantity, 0);
        assert_eq!(batches[0].reserved_quantity, 0);
        assert_eq!(batches[1].quantity, 35);
        assert_eq!(batches[1].reserved_quantity, 0);
    }

    #[test]
    fn ship_beyond_reserved_is_an_inconsistency() {
        let mut batches = vec![wb("A", 50, 10, "2026-09-30", 0)];
        let err = ship(&mut batches, 11).unwrap_err();
        assert!(matches!(err, ServiceError::StockInconsistency(_)));
    }

    #[test]
    fn deduct_walks_earliest_expiry_and_reports_batches() {
        let mut batches = vec![
            ib("LATE", 40, 40, "2027-03-31"),
            ib("EARLY", 12, 20, "2026-10-31"),
        ];
        let debits = deduct(&mut batches, 20).unwrap();
        assert_eq!(debits, vec![("EARLY".to_string(), 12), ("LATE".to_string(), 8)]);
        assert_eq!(batches[1].current_quantity, 0);
        assert_eq!(batches[0].current_quantity, 32);
    }

    #[test]
    fn deduct_insufficient_reports_totals() {
        let mut batches = vec![ib("A", 4, 10, "2026-10-31")];
        let err = deduct(&mut batches, 5).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::InsufficientStock {
                requested: 5,
                available: 4
            }
        ));
        assert_eq!(batches[0].current_quantity, 4);
    }

    #[test]
    fn sellable_total_skips_expired_batches() {
        let batches = vec![
            wb("A", 30, 10, "2026-01-31", 0),
            wb("B", 40, 5, "2027-01-31", 1),
        ];
        let today: NaiveDate = "2026-06-01".parse().unwrap();
        assert_eq!(total_sellable(&batches, today), 35);
    }
}
