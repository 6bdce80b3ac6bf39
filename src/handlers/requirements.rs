use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::Principal;
use crate::entities::requirement;
use crate::errors::ServiceError;
use crate::models::LineStatus;
use crate::services::fulfillment::VehicleInput;
use crate::services::requirements::LineDecision;
use crate::{ApiResponse, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/requirements", post(create).get(list))
        .route("/requirements/:id", get(get_one))
        .route("/requirements/:id/decisions", post(decide))
        .route("/requirements/:id/reject", post(reject))
        .route("/requirements/:id/shipment", post(create_shipment))
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RequirementLineRequest {
    pub medicine_id: Uuid,
    #[validate(range(min = 1))]
    pub requested_quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRequirementRequest {
    pub warehouse_id: Uuid,
    #[validate(length(min = 1))]
    pub lines: Vec<RequirementLineRequest>,
}

async fn create(
    State(state): State<AppState>,
    actor: Principal,
    Json(body): Json<CreateRequirementRequest>,
) -> Result<Json<ApiResponse<requirement::Model>>, ServiceError> {
    body.validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
    let lines = body
        .lines
        .iter()
        .map(|l| (l.medicine_id, l.requested_quantity))
        .collect();
    let model = state
        .services
        .requirements
        .create(actor, actor.id, body.warehouse_id, lines)
        .await?;
    Ok(Json(ApiResponse::success(model)))
}

async fn list(
    State(state): State<AppState>,
    actor: Principal,
) -> Result<Json<ApiResponse<Vec<requirement::Model>>>, ServiceError> {
    let models = state.services.requirements.list(actor).await?;
    Ok(Json(ApiResponse::success(models)))
}

async fn get_one(
    State(state): State<AppState>,
    actor: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<requirement::Model>>, ServiceError> {
    let model = state.services.requirements.get(actor, id).await?;
    Ok(Json(ApiResponse::success(model)))
}

#[derive(Debug, Deserialize)]
pub struct LineDecisionRequest {
    pub medicine_id: Uuid,
    pub status: LineStatus,
    #[serde(default)]
    pub approved_quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct DecideRequest {
    pub decisions: Vec<LineDecisionRequest>,
}

async fn decide(
    State(state): State<AppState>,
    actor: Principal,
    Path(id): Path<Uuid>,
    Json(body): Json<DecideRequest>,
) -> Result<Json<ApiResponse<requirement::Model>>, ServiceError> {
    let decisions = body
        .decisions
        .into_iter()
        .map(|d| LineDecision {
            medicine_id: d.medicine_id,
            status: d.status,
            approved_quantity: d.approved_quantity,
        })
        .collect();
    let model = state.services.requirements.decide(actor, id, decisions).await?;
    Ok(Json(ApiResponse::success(model)))
}

async fn reject(
    State(state): State<AppState>,
    actor: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<requirement::Model>>, ServiceError> {
    let model = state.services.requirements.reject(actor, id).await?;
    Ok(Json(ApiResponse::success(model)))
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct VehicleRequest {
    #[validate(length(min = 1, max = 32))]
    pub vehicle_number: String,
    #[validate(length(min = 1, max = 128))]
    pub driver_name: String,
    #[validate(length(min = 1, max = 32))]
    pub driver_contact: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateShipmentRequest {
    #[validate(length(min = 1))]
    pub vehicles: Vec<VehicleRequest>,
}

async fn create_shipment(
    State(state): State<AppState>,
    actor: Principal,
    Path(id): Path<Uuid>,
    Json(body): Json<CreateShipmentRequest>,
) -> Result<Json<ApiResponse<crate::entities::logistic::Model>>, ServiceError> {
    body.validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
    let vehicles = body
        .vehicles
        .into_iter()
        .map(|v| VehicleInput {
            vehicle_number: v.vehicle_number,
            driver_name: v.driver_name,
            driver_contact: v.driver_contact,
        })
        .collect();
    let model = state
        .services
        .fulfillment
        .create_shipment(actor, id, vehicles)
        .await?;
    Ok(Json(ApiResponse::success(model)))
}
