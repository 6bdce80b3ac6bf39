use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::errors::ServiceError;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<AppState>) -> Result<Json<Value>, ServiceError> {
    state.db.ping().await?;
    Ok(Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    })))
}
