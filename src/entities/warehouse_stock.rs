use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::models::WarehouseBatch;

/// Per-warehouse, per-medicine stock record. The batch array lives in the
/// `batches` JSON column and is always rewritten as a whole; `version` is
/// bumped on every write and checked to serialize concurrent writers.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "warehouse_stock")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub medicine_id: Uuid,
    #[sea_orm(column_type = "Json")]
    pub batches: Json,
    pub version: i32,
    pub is_deleted: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    pub fn batches(&self) -> Result<Vec<WarehouseBatch>, ServiceError> {
        serde_json::from_value(self.batches.clone()).map_err(|e| {
            ServiceError::StockInconsistency(format!(
                "stock record {} holds malformed batch data: {e}",
                self.id
            ))
        })
    }
}

pub fn batches_to_json(batches: &[WarehouseBatch]) -> Result<Json, ServiceError> {
    serde_json::to_value(batches)
        .map_err(|e| ServiceError::InternalError(format!("batch serialization failed: {e}")))
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::warehouse::Entity",
        from = "Column::WarehouseId",
        to = "super::warehouse::Column::Id"
    )]
    Warehouse,
    #[sea_orm(
        belongs_to = "super::medicine::Entity",
        from = "Column::MedicineId",
        to = "super::medicine::Column::Id"
    )]
    Medicine,
}

impl Related<super::warehouse::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Warehouse.def()
    }
}

impl Related<super::medicine::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Medicine.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
