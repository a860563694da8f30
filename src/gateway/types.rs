//! Gateway response envelope and error codes

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::engine::{ErrorCategory, TransitionError};
use crate::history::HistoryError;

/// Uniform JSON envelope for every endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response code: 0 for success, non-zero for errors
    #[schema(example = 0)]
    pub code: i32,
    /// Response message
    #[schema(example = "ok")]
    pub msg: String,
    /// Response data (only present when code == 0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Create success response
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    /// Create error response
    pub fn error(code: i32, msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

pub mod error_codes {
    // Success
    pub const SUCCESS: i32 = 0;

    // Validation errors (1xxx) - rejected before any transaction opened
    pub const INVALID_PARAMETER: i32 = 1001;

    // Resource errors (2xxx) - rolled back, caller may correct and retry
    pub const INSUFFICIENT_INVENTORY: i32 = 2001;
    pub const DUPLICATE_BATCH: i32 = 2002;
    pub const NOT_FOUND: i32 = 2404;

    // Policy errors (3xxx) - business-rule rejections, never auto-retried
    pub const INVALID_DESTINATION: i32 = 3001;
    pub const ALREADY_RECALLED: i32 = 3002;
    pub const RECALL_WINDOW_EXPIRED: i32 = 3003;
    pub const ALREADY_RECEIVED: i32 = 3004;
    pub const INVALID_UNIT_STATE: i32 = 3005;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SERVICE_UNAVAILABLE: i32 = 5001;
    pub const CONTENTION_RETRY: i32 = 5003;
}

/// Map an engine failure to HTTP status + stable error code. Resource and
/// policy errors stay distinguishable so the caller can show "not enough
/// stock" vs. "too late to recall" instead of a generic failure.
pub fn transition_error_response(e: TransitionError) -> (StatusCode, Json<ApiResponse<()>>) {
    let (status, code) = match &e {
        TransitionError::Validation(_) => (StatusCode::BAD_REQUEST, error_codes::INVALID_PARAMETER),
        TransitionError::InsufficientInventory { .. } => {
            (StatusCode::BAD_REQUEST, error_codes::INSUFFICIENT_INVENTORY)
        }
        TransitionError::DuplicateBatch { .. } => {
            (StatusCode::CONFLICT, error_codes::DUPLICATE_BATCH)
        }
        TransitionError::InvalidDestination(_) => {
            (StatusCode::BAD_REQUEST, error_codes::INVALID_DESTINATION)
        }
        TransitionError::NotFound { .. } => (StatusCode::NOT_FOUND, error_codes::NOT_FOUND),
        TransitionError::AlreadyRecalled => (StatusCode::CONFLICT, error_codes::ALREADY_RECALLED),
        TransitionError::RecallWindowExpired => {
            (StatusCode::CONFLICT, error_codes::RECALL_WINDOW_EXPIRED)
        }
        TransitionError::AlreadyReceived => (StatusCode::CONFLICT, error_codes::ALREADY_RECEIVED),
        TransitionError::InvalidUnitState { .. } => {
            (StatusCode::CONFLICT, error_codes::INVALID_UNIT_STATE)
        }
        _ if e.category() == ErrorCategory::Transient => {
            (StatusCode::SERVICE_UNAVAILABLE, error_codes::CONTENTION_RETRY)
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, error_codes::INTERNAL_ERROR),
    };

    if status.is_server_error() {
        tracing::error!("Transition failed: {:?}", e);
    }

    (status, Json(ApiResponse::<()>::error(code, e.to_string())))
}

pub fn history_error_response(e: HistoryError) -> (StatusCode, Json<ApiResponse<()>>) {
    match e {
        HistoryError::InvalidCursor(_) => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error(
                error_codes::INVALID_PARAMETER,
                e.to_string(),
            )),
        ),
        other => {
            tracing::error!("History query failed: {:?}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error(
                    error_codes::INTERNAL_ERROR,
                    other.to_string(),
                )),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_and_resource_errors_stay_distinguishable() {
        let (status, body) = transition_error_response(TransitionError::InsufficientInventory {
            requested: 10,
            available: 3,
        });
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, error_codes::INSUFFICIENT_INVENTORY);

        let (status, body) = transition_error_response(TransitionError::RecallWindowExpired);
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.code, error_codes::RECALL_WINDOW_EXPIRED);

        let (status, body) = transition_error_response(TransitionError::AlreadyRecalled);
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.code, error_codes::ALREADY_RECALLED);
    }
}
