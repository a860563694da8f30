//! HTTP handlers for the custody operations

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::engine::types::{
    AdministerOutcome, AdministerRequest, DisposeOutcome, DisposeRequest, ProduceOutcome,
    ProduceRequest, ShipmentOutcome, ShipmentRequest,
};
use crate::history::{Cursor, HistoryPage, HistoryQuery, HistorySummarizer};
use crate::ledger::models::{ActionKind, OwnerKind, OwnerRef};

use super::state::AppState;
use super::types::{
    error_codes, history_error_response, transition_error_response, ApiResponse,
};

type HandlerError = (StatusCode, Json<ApiResponse<()>>);

// --- Requests ---

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecallRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub owner_id: i64,
    /// ORGANIZATION (default) or PATIENT
    pub owner_type: Option<String>,
    /// Comma-separated action kinds, e.g. `SHIPPED,RECALLED`
    pub actions: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page_size: Option<u32>,
    /// Opaque cursor from the previous page
    pub cursor: Option<String>,
}

// --- Responses ---

#[derive(Debug, Serialize, ToSchema)]
pub struct ReceiptResponse {
    pub transfer_id: Uuid,
    pub confirmed_units: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub git_hash: String,
}

// --- Handlers ---

/// Register a production batch
///
/// POST /api/v1/production/register
#[utoipa::path(
    post,
    path = "/api/v1/production/register",
    request_body = ProduceRequest,
    responses(
        (status = 200, description = "Batch registered", body = ApiResponse<ProduceOutcome>),
        (status = 400, description = "Invalid quantity or identifiers"),
        (status = 409, description = "Duplicate batch number")
    ),
    tag = "Production"
)]
pub async fn register_production(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProduceRequest>,
) -> Result<Json<ApiResponse<ProduceOutcome>>, HandlerError> {
    match state.engine.produce(req).await {
        Ok(outcome) => Ok(Json(ApiResponse::success(outcome))),
        Err(e) => Err(transition_error_response(e)),
    }
}

/// Create a shipment
///
/// POST /api/v1/shipments
#[utoipa::path(
    post,
    path = "/api/v1/shipments",
    request_body = ShipmentRequest,
    responses(
        (status = 200, description = "Shipment created", body = ApiResponse<ShipmentOutcome>),
        (status = 400, description = "Insufficient inventory or invalid destination")
    ),
    tag = "Shipments"
)]
pub async fn create_shipment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ShipmentRequest>,
) -> Result<Json<ApiResponse<ShipmentOutcome>>, HandlerError> {
    match state.engine.ship(req).await {
        Ok(outcome) => Ok(Json(ApiResponse::success(outcome))),
        Err(e) => Err(transition_error_response(e)),
    }
}

/// Confirm receipt of a shipment
///
/// POST /api/v1/shipments/{transfer_id}/receive
#[utoipa::path(
    post,
    path = "/api/v1/shipments/{transfer_id}/receive",
    params(("transfer_id" = Uuid, Path, description = "Transfer batch ID")),
    responses(
        (status = 200, description = "Receipt confirmed", body = ApiResponse<ReceiptResponse>),
        (status = 404, description = "Transfer not found"),
        (status = 409, description = "Already confirmed")
    ),
    tag = "Shipments"
)]
pub async fn confirm_receipt(
    State(state): State<Arc<AppState>>,
    Path(transfer_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReceiptResponse>>, HandlerError> {
    match state.engine.confirm_receipt(transfer_id).await {
        Ok(confirmed_units) => Ok(Json(ApiResponse::success(ReceiptResponse {
            transfer_id,
            confirmed_units,
        }))),
        Err(e) => Err(transition_error_response(e)),
    }
}

/// Recall a shipment within the reversal window
///
/// POST /api/v1/shipments/{transfer_id}/recall
#[utoipa::path(
    post,
    path = "/api/v1/shipments/{transfer_id}/recall",
    params(("transfer_id" = Uuid, Path, description = "Transfer batch ID")),
    request_body = RecallRequest,
    responses(
        (status = 200, description = "Shipment recalled"),
        (status = 404, description = "Transfer not found"),
        (status = 409, description = "Already recalled or window expired")
    ),
    tag = "Shipments"
)]
pub async fn recall_shipment(
    State(state): State<Arc<AppState>>,
    Path(transfer_id): Path<Uuid>,
    Json(req): Json<RecallRequest>,
) -> Result<Json<ApiResponse<()>>, HandlerError> {
    match state.engine.recall_shipment(transfer_id, &req.reason).await {
        Ok(()) => Ok(Json(ApiResponse::success(()))),
        Err(e) => Err(transition_error_response(e)),
    }
}

/// Record an administration to a patient
///
/// POST /api/v1/administrations
#[utoipa::path(
    post,
    path = "/api/v1/administrations",
    request_body = AdministerRequest,
    responses(
        (status = 200, description = "Administration recorded", body = ApiResponse<AdministerOutcome>),
        (status = 400, description = "Insufficient inventory")
    ),
    tag = "Administrations"
)]
pub async fn create_administration(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AdministerRequest>,
) -> Result<Json<ApiResponse<AdministerOutcome>>, HandlerError> {
    match state.engine.administer(req).await {
        Ok(outcome) => Ok(Json(ApiResponse::success(outcome))),
        Err(e) => Err(transition_error_response(e)),
    }
}

/// Recall an administration within the reversal window
///
/// POST /api/v1/administrations/{administration_id}/recall
#[utoipa::path(
    post,
    path = "/api/v1/administrations/{administration_id}/recall",
    params(("administration_id" = Uuid, Path, description = "Administration record ID")),
    request_body = RecallRequest,
    responses(
        (status = 200, description = "Administration recalled"),
        (status = 404, description = "Administration not found"),
        (status = 409, description = "Already recalled or window expired")
    ),
    tag = "Administrations"
)]
pub async fn recall_administration(
    State(state): State<Arc<AppState>>,
    Path(administration_id): Path<Uuid>,
    Json(req): Json<RecallRequest>,
) -> Result<Json<ApiResponse<()>>, HandlerError> {
    match state
        .engine
        .recall_administration(administration_id, &req.reason)
        .await
    {
        Ok(()) => Ok(Json(ApiResponse::success(()))),
        Err(e) => Err(transition_error_response(e)),
    }
}

/// Dispose units
///
/// POST /api/v1/units/dispose
#[utoipa::path(
    post,
    path = "/api/v1/units/dispose",
    request_body = DisposeRequest,
    responses(
        (status = 200, description = "Units disposed", body = ApiResponse<DisposeOutcome>),
        (status = 404, description = "Unit not found or not owned by caller"),
        (status = 409, description = "Unit not in a disposable state")
    ),
    tag = "Units"
)]
pub async fn dispose_units(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DisposeRequest>,
) -> Result<Json<ApiResponse<DisposeOutcome>>, HandlerError> {
    match state.engine.dispose(req).await {
        Ok(outcome) => Ok(Json(ApiResponse::success(outcome))),
        Err(e) => Err(transition_error_response(e)),
    }
}

/// Grouped custody history with cursor pagination
///
/// GET /api/v1/history
#[utoipa::path(
    get,
    path = "/api/v1/history",
    params(
        ("owner_id" = i64, Query, description = "Owner whose history to show"),
        ("owner_type" = Option<String>, Query, description = "ORGANIZATION (default) or PATIENT"),
        ("actions" = Option<String>, Query, description = "Comma-separated action filter"),
        ("from" = Option<String>, Query, description = "Inclusive lower bound (RFC 3339)"),
        ("to" = Option<String>, Query, description = "Inclusive upper bound (RFC 3339)"),
        ("page_size" = Option<u32>, Query, description = "Page size, clamped to 200"),
        ("cursor" = Option<String>, Query, description = "Cursor from the previous page")
    ),
    responses(
        (status = 200, description = "One page of grouped history", body = ApiResponse<HistoryPage>),
        (status = 400, description = "Malformed cursor or filter")
    ),
    tag = "History"
)]
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<ApiResponse<HistoryPage>>, HandlerError> {
    let query = history_query_from_params(params).map_err(|msg| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error(error_codes::INVALID_PARAMETER, msg)),
        )
    })?;

    match HistorySummarizer::history(state.db.pool(), &query).await {
        Ok(page) => Ok(Json(ApiResponse::success(page))),
        Err(e) => Err(history_error_response(e)),
    }
}

/// Service health
///
/// GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service healthy", body = ApiResponse<HealthResponse>),
        (status = 503, description = "Database unreachable")
    ),
    tag = "Health"
)]
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<HealthResponse>>, HandlerError> {
    match state.db.health_check().await {
        Ok(()) => Ok(Json(ApiResponse::success(HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            git_hash: env!("GIT_HASH").to_string(),
        }))),
        Err(e) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::<()>::error(
                error_codes::SERVICE_UNAVAILABLE,
                format!("Database unreachable: {}", e),
            )),
        )),
    }
}

fn history_query_from_params(params: HistoryParams) -> Result<HistoryQuery, String> {
    let kind = match params.owner_type.as_deref() {
        None | Some("ORGANIZATION") => OwnerKind::Organization,
        Some("PATIENT") => OwnerKind::Patient,
        Some(other) => return Err(format!("Unknown owner_type: {}", other)),
    };

    let actions = params
        .actions
        .as_deref()
        .map(|csv| {
            csv.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|name| {
                    ActionKind::from_name(name).ok_or_else(|| format!("Unknown action: {}", name))
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;

    let cursor = params
        .cursor
        .as_deref()
        .map(Cursor::decode)
        .transpose()
        .map_err(|e| e.to_string())?;

    Ok(HistoryQuery {
        owner: OwnerRef {
            kind,
            id: params.owner_id,
        },
        actions,
        from: params.from,
        to: params.to,
        page_size: params.page_size.unwrap_or(50),
        cursor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(actions: Option<&str>, cursor: Option<&str>) -> HistoryParams {
        HistoryParams {
            owner_id: 1,
            owner_type: None,
            actions: actions.map(String::from),
            from: None,
            to: None,
            page_size: None,
            cursor: cursor.map(String::from),
        }
    }

    #[test]
    fn history_params_parse_action_filter() {
        let query = history_query_from_params(params(Some("SHIPPED, RECALLED"), None)).unwrap();
        assert_eq!(
            query.actions,
            Some(vec![ActionKind::Shipped, ActionKind::Recalled])
        );
        assert_eq!(query.owner.kind, OwnerKind::Organization);
        assert_eq!(query.page_size, 50);
    }

    #[test]
    fn history_params_reject_unknown_action() {
        assert!(history_query_from_params(params(Some("TELEPORTED"), None)).is_err());
    }

    #[test]
    fn history_params_reject_bad_cursor() {
        assert!(history_query_from_params(params(None, Some("garbage"))).is_err());
    }
}
