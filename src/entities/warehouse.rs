use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A central warehouse account. Provisioned upstream.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "warehouses")]
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
    #[sea_orm(has_many = "super::warehouse_stock::Entity")]
    WarehouseStock,
}

impl Related<super::warehouse_stock::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WarehouseStock.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
