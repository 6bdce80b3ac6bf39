use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::models::{ReceivedStatus, ShipmentStatus, ShippedMedicine, VehicleLeg};

/// A shipment raised against an approved requirement. `medicines` holds the
/// immutable per-batch snapshots taken at fulfillment time.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "logistics")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub shipment_id: String,
    pub requirement_id: Uuid,
    pub warehouse_id: Uuid,
    pub institution_id: Uuid,
    #[sea_orm(column_type = "Json")]
    pub medicines: Json,
    #[sea_orm(column_type = "Json")]
    pub vehicles: Json,
    pub status: String,
    pub received_status: String,
    pub version: i32,
    pub is_deleted: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    pub fn medicines(&self) -> Result<Vec<ShippedMedicine>, ServiceError> {
        serde_json::from_value(self.medicines.clone()).map_err(|e| {
            ServiceError::InternalError(format!(
                "shipment {} holds malformed medicine data: {e}",
                self.shipment_id
            ))
        })
    }

    pub fn vehicles(&self) -> Result<Vec<VehicleLeg>, ServiceError> {
        serde_json::from_value(self.vehicles.clone()).map_err(|e| {
            ServiceError::InternalError(format!(
                "shipment {} holds malformed vehicle data: {e}",
                self.shipment_id
            ))
        })
    }

    pub fn status(&self) -> Result<ShipmentStatus, ServiceError> {
        self.status.parse().map_err(|_| {
            ServiceError::InternalError(format!(
                "shipment {} has unknown status '{}'",
                self.shipment_id, self.status
            ))
        })
    }

    pub fn received_status(&self) -> Result<ReceivedStatus, ServiceError> {
        self.received_status.parse().map_err(|_| {
            ServiceError::InternalError(format!(
                "shipment {} has unknown received status '{}'",
                self.shipment_id, self.received_status
            ))
        })
    }
}

pub fn medicines_to_json(medicines: &[ShippedMedicine]) -> Result<Json, ServiceError> {
    serde_json::to_value(medicines)
        .map_err(|e| ServiceError::InternalError(format!("medicine serialization failed: {e}")))
}

pub fn vehicles_to_json(vehicles: &[VehicleLeg]) -> Result<Json, ServiceError> {
    serde_json::to_value(vehicles)
        .map_err(|e| ServiceError::InternalError(format!("vehicle serialization failed: {e}")))
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::requirement::Entity",
        from = "Column::RequirementId",
        to = "super::requirement::Column::Id"
    )]
    Requirement,
}

impl Related<super::requirement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Requirement.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
