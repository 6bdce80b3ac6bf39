use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::models::InstitutionBatch;

/// Per-institution, per-medicine stock record, fed by received shipments
/// and manual additions. Same whole-array JSON + `version` discipline as
/// warehouse stock.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "institution_stock")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub institution_id: Uuid,
    pub medicine_id: Uuid,
    #[sea_orm(column_type = "Json")]
    pub batches: Json,
    pub version: i32,
    pub is_deleted: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    pub fn batches(&self) -> Result<Vec<InstitutionBatch>, ServiceError> {
        serde_json::from_value(self.batches.clone()).map_err(|e| {
            ServiceError::StockInconsistency(format!(
                "stock record {} holds malformed batch data: {e}",
                self.id
            ))
        })
    }
}

pub fn batches_to_json(batches: &[InstitutionBatch]) -> Result<Json, ServiceError> {
    serde_json::to_value(batches)
        .map_err(|e| ServiceError::InternalError(format!("batch serialization failed: {e}")))
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::institution::Entity",
        from = "Column::InstitutionId",
        to = "super::institution::Column::Id"
    )]
    Institution,
    #[sea_orm(
        belongs_to = "super::medicine::Entity",
        from = "Column::MedicineId",
        to = "super::medicine::Column::Id"
    )]
    Medicine,
}

impl Related<super::institution::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Institution.def()
    }
}

impl Related<super::medicine::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Medicine.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
