use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Principal;
use crate::entities::logistic;
use crate::errors::ServiceError;
use crate::models::ShipmentStatus;
use crate::{ApiResponse, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/logistics", get(list))
        .route("/logistics/:id", get(get_one))
        .route("/logistics/:id/status", post(update_status))
        .route("/logistics/:id/receive", post(receive))
}

async fn list(
    State(state): State<AppState>,
    actor: Principal,
) -> Result<Json<ApiResponse<Vec<logistic::Model>>>, ServiceError> {
    let models = state.services.fulfillment.list(actor).await?;
    Ok(Json(ApiResponse::success(models)))
}

async fn get_one(
    State(state): State<AppState>,
    actor: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<logistic::Model>>, ServiceError> {
    let model = state.services.fulfillment.get(actor, id).await?;
    Ok(Json(ApiResponse::success(model)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: ShipmentStatus,
}

async fn update_status(
    State(state): State<AppState>,
    actor: Principal,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<logistic::Model>>, ServiceError> {
    let model = state
        .services
        .fulfillment
        .update_status(actor, id, body.status)
        .await?;
    Ok(Json(ApiResponse::success(model)))
}

async fn receive(
    State(state): State<AppState>,
    actor: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<logistic::Model>>, ServiceError> {
    let model = state.services.receipts.receive_shipment(actor, id).await?;
    Ok(Json(ApiResponse::success(model)))
}
