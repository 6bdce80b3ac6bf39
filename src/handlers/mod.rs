pub mod health;
pub mod institution_stock;
pub mod logistics;
pub mod requirements;
pub mod warehouse_stock;

use axum::Router;

use crate::AppState;

/// Assembles the versioned API surface.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(warehouse_stock::router())
        .merge(institution_stock::router())
        .merge(requirements::router())
        .merge(logistics::router())
}
