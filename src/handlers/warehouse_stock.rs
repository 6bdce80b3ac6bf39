use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, patch, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::Principal;
use crate::entities::{receipt_log, warehouse_stock};
use crate::errors::ServiceError;
use crate::models::PacketSize;
use crate::services::stock_ledger::{AvailableMedicine, BatchDetailUpdate, NewWarehouseBatch};
use crate::{ApiResponse, AppState, ListQuery, PaginatedResponse};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/warehouses/:warehouse_id/stock", post(add_batch))
        .route("/warehouses/:warehouse_id/stock", get(list_stock))
        .route(
            "/warehouses/:warehouse_id/stock/available",
            get(available_stock),
        )
        .route(
            "/warehouses/:warehouse_id/receipt-logs",
            get(receipt_logs),
        )
        .route("/warehouse-stock/:record_id", delete(delete_record))
        .route(
            "/warehouse-stock/:record_id/batches/:batch_name",
            patch(update_batch_details),
        )
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddBatchRequest {
    pub medicine_id: Uuid,
    #[validate(length(min = 1, max = 64))]
    pub batch_name: String,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub mfg_date: Option<NaiveDate>,
    pub expiry_date: NaiveDate,
    pub packet_size: Option<PacketSizeRequest>,
    pub purchase_price: Decimal,
    pub selling_price: Decimal,
    pub mrp: Decimal,
    pub received_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PacketSizeRequest {
    pub strips: i32,
    pub tablets_per_strip: i32,
}

impl From<PacketSizeRequest> for PacketSize {
    fn from(value: PacketSizeRequest) -> Self {
        PacketSize {
            strips: value.strips,
            tablets_per_strip: value.tablets_per_strip,
        }
    }
}

async fn add_batch(
    State(state): State<AppState>,
    actor: Principal,
    Path(warehouse_id): Path<Uuid>,
    Json(body): Json<AddBatchRequest>,
) -> Result<Json<ApiResponse<warehouse_stock::Model>>, ServiceError> {
    body.validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
    let model = state
        .services
        .stock_ledger
        .add_batch(
            actor,
            warehouse_id,
            body.medicine_id,
            NewWarehouseBatch {
                batch_name: body.batch_name,
                quantity: body.quantity,
                mfg_date: body.mfg_date,
                expiry_date: body.expiry_date,
                packet_size: body.packet_size.map(Into::into).unwrap_or_default(),
                purchase_price: body.purchase_price,
                selling_price: body.selling_price,
                mrp: body.mrp,
                received_date: body.received_date.unwrap_or_else(Utc::now),
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(model)))
}

async fn list_stock(
    State(state): State<AppState>,
    actor: Principal,
    Path(warehouse_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<warehouse_stock::Model>>>, ServiceError> {
    let records = state
        .services
        .stock_ledger
        .list_warehouse_stock(actor, warehouse_id)
        .await?;
    Ok(Json(ApiResponse::success(records)))
}

async fn available_stock(
    State(state): State<AppState>,
    _actor: Principal,
    Path(warehouse_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<AvailableMedicine>>>, ServiceError> {
    let rows = state
        .services
        .stock_ledger
        .available_stock(warehouse_id)
        .await?;
    Ok(Json(ApiResponse::success(rows)))
}

async fn receipt_logs(
    State(state): State<AppState>,
    actor: Principal,
    Path(warehouse_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<receipt_log::Model>>>, ServiceError> {
    let page = state
        .services
        .activity_logs
        .receipt_logs(actor, warehouse_id, query.page, query.limit)
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
        .soft_delete_warehouse_record(actor, record_id)
        .await?;
    Ok(Json(ApiResponse::message("stock record deleted")))
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateBatchRequest {
    pub mfg_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub packet_size: Option<PacketSizeRequest>,
    pub purchase_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    pub mrp: Option<Decimal>,
}

async fn update_batch_details(
    State(state): State<AppState>,
    actor: Principal,
    Path((record_id, batch_name)): Path<(Uuid, String)>,
    Json(body): Json<UpdateBatchRequest>,
) -> Result<Json<ApiResponse<warehouse_stock::Model>>, ServiceError> {
    let model = state
        .services
        .stock_ledger
        .update_batch_details(
            actor,
            record_id,
            &batch_name,
            BatchDetailUpdate {
                mfg_date: body.mfg_date,
                expiry_date: body.expiry_date,
                packet_size: body.packet_size.map(Into::into),
                purchase_price: body.purchase_price,
                selling_price: body.selling_price,
                mrp: body.mrp,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(model)))
}
