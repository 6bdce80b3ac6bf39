use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A consuming institution (hospital, clinic). Provisioned upstream.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "institutions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub is_deleted: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::institution_stock::Entity")]
    InstitutionStock,
}

impl Related<super::institution_stock::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InstitutionStock.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
