use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveDate, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tracing::{error, info};
use uuid::Uuid;

use crate::entities::{institution_stock, warehouse_stock};
use crate::errors::ServiceError;
use crate::notifications::NotificationService;

/// Last day of next month. Batches expiring on or before this date are
/// flagged.
pub fn expiry_cutoff(today: NaiveDate) -> NaiveDate {
    let (year, month) = if today.month() >= 11 {
        (today.year() + 1, today.month() - 10)
    } else {
        (today.year(), today.month() + 2)
    };
    // Day 1 of month+2, minus one day.
    NaiveDate::from_ymd_opt(year, month, 1)
        .expect("valid month")
        .pred_opt()
        .expect("date has a predecessor")
}

#[derive(Debug)]
struct ExpiringItem {
    medicine_id: Uuid,
    batch_name: String,
    quantity: i32,
    expiry_date: NaiveDate,
}

async fn scan_once(
    db: &DatabaseConnection,
    notifier: &NotificationService,
) -> Result<(), ServiceError> {
    let cutoff = expiry_cutoff(Utc::now().date_naive());
    info!(%cutoff, "scanning for expiring batches");

    let mut per_warehouse: HashMap<Uuid, Vec<ExpiringItem>> = HashMap::new();
    for record in warehouse_stock::Entity::find()
        .filter(warehouse_stock::Column::IsDeleted.eq(false))
        .all(db)
        .await?
    {
        for batch in record.batches()? {
            if batch.quantity > 0 && batch.expiry_date <= cutoff {
                per_warehouse
                    .entry(record.warehouse_id)
                    .or_default()
                    .push(ExpiringItem {
                        medicine_id: record.medicine_id,
                        batch_name: batch.batch_name,
                        quantity: batch.quantity,
                        expiry_date: batch.expiry_date,
                    });
            }
        }
    }

    let mut per_institution: HashMap<Uuid, Vec<ExpiringItem>> = HashMap::new();
    for record in institution_stock::Entity::find()
        .filter(institution_stock::Column::IsDeleted.eq(false))
        .all(db)
        .await?
    {
        for batch in record.batches()? {
            if batch.current_quantity > 0 && batch.expiry_date <= cutoff {
                per_institution
                    .entry(record.institution_id)
                    .or_default()
                    .push(ExpiringItem {
                        medicine_id: record.medicine_id,
                        batch_name: batch.batch_name,
                        quantity: batch.current_quantity,
                        expiry_date: batch.expiry_date,
                    });
            }
        }
    }

    for (owner, items) in per_warehouse.into_iter().chain(per_institution) {
        let body = items
            .iter()
            .map(|i| {
                format!(
                    "{} batch {} ({} strips) expires {}",
                    i.medicine_id, i.batch_name, i.quantity, i.expiry_date
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        notifier
            .notify(&owner.to_string(), "Stock expiry alert", &body)
            .await;
    }
    Ok(())
}

/// Periodic read-only scan; never aborts on error.
pub async fn run(
    db: Arc<DatabaseConnection>,
    notifier: NotificationService,
    interval_hours: u64,
) {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_hours * 3600));
    loop {
        ticker.tick().await;
        if let Err(e) = scan_once(&db, &notifier).await {
            error!(error = %e, "expiry alert scan failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cutoff_is_end_of_next_month() {
        let june: NaiveDate = "2026-06-15".parse().unwrap();
        assert_eq!(expiry_cutoff(june), "2026-07-31".parse::<NaiveDate>().unwrap());
    }

    #[test]
    fn cutoff_handles_year_boundary() {
        let november: NaiveDate = "2026-11-03".parse().unwrap();
        assert_eq!(
            expiry_cutoff(november),
            "2026-12-31".parse::<NaiveDate>().unwrap()
        );
        let december: NaiveDate = "2026-12-20".parse().unwrap();
        assert_eq!(
            expiry_cutoff(december),
            "2027-01-31".parse::<NaiveDate>().unwrap()
        );
    }
}
