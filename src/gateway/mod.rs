//! HTTP gateway
//!
//! Thin axum surface over the transition engine and history summarizer.
//! Authentication, organization onboarding and notifications live in the
//! surrounding platform; this service only speaks custody.

pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use axum::{
    Json, Router,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use utoipa::OpenApi;

use crate::config::AppConfig;

use openapi::ApiDoc;
use state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/api/v1/production/register",
            post(handlers::register_production),
        )
        .route("/api/v1/shipments", post(handlers::create_shipment))
        .route(
            "/api/v1/shipments/{transfer_id}/receive",
            post(handlers::confirm_receipt),
        )
        .route(
            "/api/v1/shipments/{transfer_id}/recall",
            post(handlers::recall_shipment),
        )
        .route(
            "/api/v1/administrations",
            post(handlers::create_administration),
        )
        .route(
            "/api/v1/administrations/{administration_id}/recall",
            post(handlers::recall_administration),
        )
        .route("/api/v1/units/dispose", post(handlers::dispose_units))
        .route("/api/v1/history", get(handlers::get_history))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn run_gateway(config: &AppConfig, state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Gateway listening on {}", addr);

    let app = build_router(state);
    axum::serve(listener, app).await?;
    Ok(())
}
