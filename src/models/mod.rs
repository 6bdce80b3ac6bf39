pub mod batch;
pub mod requirement;
pub mod shipment;

pub use batch::{InstitutionBatch, PacketSize, WarehouseBatch};
pub use requirement::{LineStatus, RequirementLine, RequirementStatus};
pub use shipment::{
    BatchSnapshot, LegTimestamps, ReceivedStatus, ShipmentStatus, ShippedMedicine, VehicleLeg,
};
