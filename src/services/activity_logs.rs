use std::sync::Arc;

use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

use crate::auth::{Principal, Role};
use crate::entities::{receipt_log, usage_log};
use crate::errors::ServiceError;
use crate::PaginatedResponse;

/// Read side of the append-only movement logs.
pub struct ActivityLogService {
    db: Arc<DatabaseConnection>,
}

impl ActivityLogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn usage_logs(
        &self,
        actor: Principal,
        institution_id: Uuid,
        page: u64,
        limit: u64,
    ) -> Result<PaginatedResponse<usage_log::Model>, ServiceError> {
        actor.require_role(Role::Institution)?;
        actor.require_owner(institution_id)?;
        let (page, limit) = normalize(page, limit)?;
        let paginator = usage_log::Entity::find()
            .filter(usage_log::Column::InstitutionId.eq(institution_id))
            .order_by_desc(usage_log::Column::CreatedAt)
            .paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;
        Ok(PaginatedResponse::new(items, total, page, limit))
    }

    pub async fn receipt_logs(
        &self,
        actor: Principal,
        warehouse_id: Uuid,
        page: u64,
        limit: u64,
    ) -> Result<PaginatedResponse<receipt_log::Model>, ServiceError> {
        actor.require_role(Role::Warehouse)?;
        actor.require_owner(warehouse_id)?;
        let (page, limit) = normalize(page, limit)?;
        let paginator = receipt_log::Entity::find()
            .filter(receipt_log::Column::WarehouseId.eq(warehouse_id))
            .order_by_desc(receipt_log::Column::CreatedAt)
            .paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;
        Ok(PaginatedResponse::new(items, total, page, limit))
    }
}

fn normalize(page: u64, limit: u64) -> Result<(u64, u64), ServiceError> {
    if page == 0 {
        return Err(ServiceError::ValidationError(
            "page starts at 1".to_string(),
        ));
    }
    if limit == 0 || limit > 100 {
        return Err(ServiceError::ValidationError(
            "limit must be between 1 and 100".to_string(),
        ));
    }
    Ok((page, limit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_bounds() {
        assert!(normalize(0, 20).is_err());
        assert!(normalize(1, 0).is_err());
        assert!(normalize(1, 101).is_err());
        assert_eq!(normalize(2, 50).unwrap(), (2, 50));
    }
}
