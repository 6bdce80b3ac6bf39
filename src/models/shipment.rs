use chrono::{DateTime, NaiveDate, Utc};
use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::models::batch::PacketSize;

/// Transport state of a shipment. `Delivered` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    Pending,
    InTransit,
    Delivered,
}

/// Whether the destination institution has booked the shipment in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReceivedStatus {
    Pending,
    Received,
}

/// Immutable record of what was taken from one warehouse batch at shipment
/// time. Prices are frozen here so later edits to the warehouse batch do
/// not rewrite shipment history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSnapshot {
    pub batch_name: String,
    pub expiry_date: NaiveDate,
    pub quantity: i32,
    #[serde(default)]
    pub packet_size: PacketSize,
    pub selling_price: Decimal,
    pub mrp: Decimal,
}

/// All batches shipped for one medicine line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippedMedicine {
    pub medicine_id: Uuid,
    pub batches: Vec<BatchSnapshot>,
}

impl ShippedMedicine {
    pub fn total_quantity(&self) -> i32 {
        self.batches.iter().map(|b| b.quantity).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LegTimestamps {
    pub loaded_at: Option<DateTime<Utc>>,
    pub departed_at: Option<DateTime<Utc>>,
    pub arrived_at: Option<DateTime<Utc>>,
    pub unloaded_at: Option<DateTime<Utc>>,
}

/// One vehicle carrying (part of) a shipment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleLeg {
    pub vehicle_number: String,
    pub driver_name: String,
    pub driver_contact: String,
    #[serde(default)]
    pub timestamps: LegTimestamps,
}

/// Human-readable shipment reference, e.g. `SHP1764922531000X7K2QF`.
pub fn generate_shipment_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|c| (c as char).to_ascii_uppercase())
        .collect();
    format!("SHP{}{}", Utc::now().timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipment_ids_have_prefix_and_are_unique() {
        let a = generate_shipment_id();
        let b = generate_shipment_id();
        assert!(a.starts_with("SHP"));
        assert!(a.len() > 9);
        assert_ne!(a, b);
    }

    #[test]
    fn shipped_totals_sum_over_snapshots() {
        let med = ShippedMedicine {
            medicine_id: Uuid::new_v4(),
            batches: vec![
                BatchSnapshot {
                    batch_name: "A".into(),
                    expiry_date: "2026-12-31".parse().unwrap(),
                    quantity: 10,
                    packet_size: PacketSize::default(),
                    selling_price: Decimal::new(1000, 2),
                    mrp: Decimal::new(1200, 2),
                },
                BatchSnapshot {
                    batch_name: "B".into(),
                    expiry_date: "2027-06-30".parse().unwrap(),
                    quantity: 15,
                    packet_size: PacketSize::default(),
                    selling_price: Decimal::new(1000, 2),
                    mrp: Decimal::new(1200, 2),
                },
            ],
        };
        assert_eq!(med.total_quantity(), 25);
    }
}
