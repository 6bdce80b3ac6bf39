use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::entities::{institution, medicine, warehouse};
use crate::errors::ServiceError;

/// Read-only checks against the upstream-managed catalog tables. Every
/// reference a client hands us is validated before it enters a document.
#[derive(Default)]
pub struct CatalogService;

impl CatalogService {
    pub fn new() -> Self {
        Self
    }

    pub async fn ensure_medicines_exist<C: ConnectionTrait>(
        &self,
        conn: &C,
        medicine_ids: &[Uuid],
    ) -> Result<(), ServiceError> {
        let found = medicine::Entity::find()
            .filter(medicine::Column::Id.is_in(medicine_ids.to_vec()))
            .filter(medicine::Column::IsDeleted.eq(false))
            .all(conn)
            .await?;
        if found.len() != medicine_ids.len() {
            let known: Vec<Uuid> = found.iter().map(|m| m.id).collect();
            let missing: Vec<String> = medicine_ids
                .iter()
                .filter(|id| !known.contains(id))
                .map(Uuid::to_string)
                .collect();
            return Err(ServiceError::not_found(format!(
                "medicine(s) {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }

    pub async fn ensure_warehouse<C: ConnectionTrait>(
        &self,
        conn: &C,
        warehouse_id: Uuid,
    ) -> Result<warehouse::Model, ServiceError> {
        warehouse::Entity::find_by_id(warehouse_id)
            .filter(warehouse::Column::IsDeleted.eq(false))
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("warehouse {warehouse_id}")))
    }

    pub async fn ensure_institution<C: ConnectionTrait>(
        &self,
        conn: &C,
        institution_id: Uuid,
    ) -> Result<institution::Model, ServiceError> {
        institution::Entity::find_by_id(institution_id)
            .filter(institution::Column::IsDeleted.eq(false))
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("institution {institution_id}")))
    }
}
