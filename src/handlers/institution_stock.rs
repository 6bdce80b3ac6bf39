use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::Principal;
use crate::entities::{institution_stock, usage_log};
use crate::errors::ServiceError;
use crate::handlers::warehouse_stock::PacketSizeRequest;
use crate::services::stock_ledger::{AvailableMedicine, NewInstitutionBatch};
use crate::{ApiResponse, AppState, ListQuery, PaginatedResponse};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/institutions/:institution_id/stock", post(add_manual))
        .route("/institutions/:institution_id/stock", get(list_stock))
        .route(
            "/institutions/:institution_id/stock/totals",
            get(stock_totals),
        )
        .route("/institutions/:institution_id/usage", post(log_usage))
        .route("/institutions/:institution_id/usage-logs", get(usage_logs))
        .route("/institution-stock/:record_id", delete(delete_record))
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ManualBatchRequest {
    #[validate(length(min = 1, max = 64))]
    pub batch_name: String,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub expiry_date: NaiveDate,
    pub packet_size: Option<PacketSizeRequest>,
    pub purchase_price: Decimal,
    pub mrp: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddManualStockRequest {
    pub medicine_id: Uuid,
    #[validate(length(min = 1))]
    pub batches: Vec<ManualBatchRequest>,
}

async fn add_manual(
    State(state): State<AppState>,
    actor: Principal,
    Path(institution_id): Path<Uuid>,
    Json(body): Json<AddManualStockRequest>,
) -> Result<Json<ApiResponse<institution_stock::Model>>, ServiceError> {
    body.validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
    for batch in &body.batches {
        batch
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
    }
    let batches = body
        .batches
        .into_iter()
        .map(|b| NewInstitutionBatch {
            batch_name: b.batch_name,
            quantity: b.quantity,
            expiry_date: b.expiry_date,
            packet_size: b.packet_size.map(Into::into).unwrap_or_default(),
            purchase_price: b.purchase_price,
            mrp: b.mrp,
        })
        .collect();
    let model = state
        .services
        .stock_ledger
        .add_manual(actor, institution_id, body.medicine_id, batches)
        .await?;
    Ok(Json(ApiResponse::success(model)))
}

async fn list_stock(
    State(state): State<AppState>,
    actor: Principal,
    Path(institution_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<institution_stock::Model>>>, ServiceError> {
    let records = state
        .services
        .stock_ledger
        .list_institution_stock(actor, institution_id)
        .await?;
    Ok(Json(ApiResponse::success(records)))
}

async fn stock_totals(
    State(state): State<AppState>,
    actor: Principal,
    Path(institution_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<AvailableMedicine>>>, ServiceError> {
    let rows = state
        .services
        .stock_ledger
        .institution_totals(actor, institution_id)
        .await?;
    Ok(Json(ApiResponse::success(rows)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct LogUsageRequest {
    pub medicine_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

async fn log_usage(
    State(state): State<AppState>,
    actor: Principal,
    Path(institution_id): Path<Uuid>,
    Json(body): Json<LogUsageRequest>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    body.validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
    state
        .services
        .usage
        .log_usage(actor, institution_id, body.medicine_id, body.quantity)
        .await?;
    Ok(Json(ApiResponse::message("usage recorded")))
}

async fn usage_logs(
    State(state): State<AppState>,
    actor: Principal,
    Path(institution_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<usage_log::Model>>>, ServiceError> {
    let page = state
        .services
        .activity_logs
        .usage_logs(actor, institution_id, query.page, query.limit)
        .await?;
    Ok(Json(ApiResponse::success(page)))
}

async fn delete_record(
    State(state): State<AppState>,
    actor: Principal,
    Path(record_id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state
        .services
        .stock_ledger
        .soft_delete_institution_record(actor, record_id)
        .await?;
    Ok(Json(ApiResponse::message("stock record deleted")))
}
