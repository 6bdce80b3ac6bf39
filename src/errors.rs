use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Unified error type for all services and handlers.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i32, available: i32 },

    #[error("invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("shipment already received: {0}")]
    AlreadyReceived(Uuid),

    #[error("concurrent modification of record {0}, retry the operation")]
    ConcurrentModification(Uuid),

    #[error("stock inconsistency: {0}")]
    StockInconsistency(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

impl ServiceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ServiceError::NotFound(what.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::ValidationError(_) | ServiceError::InvalidStateTransition(_) => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::AlreadyReceived(_) | ServiceError::ConcurrentModification(_) => {
                StatusCode::CONFLICT
            }
            ServiceError::InsufficientStock { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::StockInconsistency(_)
            | ServiceError::DatabaseError(_)
            | ServiceError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Internal failures are sanitized so database
    /// details never leak into responses.
    pub fn response_message(&self) -> String {
        match self {
            ServiceError::DatabaseError(_) => "a database error occurred".to_string(),
            ServiceError::InternalError(_) => "an internal error occurred".to_string(),
            ServiceError::StockInconsistency(_) => {
                "stock records are inconsistent, the operation was rolled back".to_string()
            }
            other => other.to_string(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ServiceError::DatabaseError(_) => "DATABASE_ERROR",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::ValidationError(_) => "VALIDATION_ERROR",
            ServiceError::Forbidden(_) => "FORBIDDEN",
            ServiceError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            ServiceError::InvalidStateTransition(_) => "INVALID_STATE_TRANSITION",
            ServiceError::AlreadyReceived(_) => "ALREADY_RECEIVED",
            ServiceError::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            ServiceError::StockInconsistency(_) => "STOCK_INCONSISTENCY",
            ServiceError::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
    pub request_id: String,
    pub timestamp: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        let body = ErrorResponse {
            error: self.error_code(),
            message: self.response_message(),
            request_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now().to_rfc3339(),
        };
        (status, Json(body)).into_response()
    }
}
