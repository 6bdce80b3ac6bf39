use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::models::{RequirementLine, RequirementStatus};

/// A multi-line stock request from an institution to a warehouse. Lines
/// are stored as a JSON array mirroring the batch-array discipline.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "requirements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub institution_id: Uuid,
    pub warehouse_id: Uuid,
    #[sea_orm(column_type = "Json")]
    pub lines: Json,
    pub overall_status: String,
    pub logistic_id: Option<Uuid>,
    pub version: i32,
    pub is_deleted: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    pub fn lines(&self) -> Result<Vec<RequirementLine>, ServiceError> {
        serde_json::from_value(self.lines.clone()).map_err(|e| {
            ServiceError::InternalError(format!(
                "requirement {} holds malformed line data: {e}",
                self.id
            ))
        })
    }

    pub fn status(&self) -> Result<RequirementStatus, ServiceError> {
        self.overall_status.parse().map_err(|_| {
            ServiceError::InternalError(format!(
                "requirement {} has unknown status '{}'",
                self.id, self.overall_status
            ))
        })
    }
}

pub fn lines_to_json(lines: &[RequirementLine]) -> Result<Json, ServiceError> {
    serde_json::to_value(lines)
        .map_err(|e| ServiceError::InternalError(format!("line serialization failed: {e}")))
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
        belongs_to = "super::warehouse::Entity",
        from = "Column::WarehouseId",
        to = "super::warehouse::Column::Id"
    )]
    Warehouse,
}

impl Related<super::institution::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Institution.def()
    }
}

impl Related<super::warehouse::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Warehouse.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
