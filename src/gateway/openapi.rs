//! OpenAPI documentation
//!
//! Served as JSON at `/api-docs/openapi.json`.

use utoipa::OpenApi;

use crate::engine::types::{
    AdministerOutcome, AdministerRequest, DisposeOutcome, DisposeRequest, LineItem,
    ProduceOutcome, ProduceRequest, ShipmentOutcome, ShipmentRequest,
};
use crate::history::{HistoryPage, ProductDetail, SummaryRow};
use crate::ledger::models::{ActionKind, OwnerKind, OwnerRef};

use super::handlers::{HealthResponse, ReceiptResponse, RecallRequest};

/// Main API documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Medtrace Custody Ledger API",
        version = "1.0.0",
        description = "Unit-level custody tracking for medical-device items: production, shipment, administration, time-bounded recall and grouped history.",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health_check,
        crate::gateway::handlers::register_production,
        crate::gateway::handlers::create_shipment,
        crate::gateway::handlers::confirm_receipt,
        crate::gateway::handlers::recall_shipment,
        crate::gateway::handlers::create_administration,
        crate::gateway::handlers::recall_administration,
        crate::gateway::handlers::dispose_units,
        crate::gateway::handlers::get_history,
    ),
    components(schemas(
        ProduceRequest,
        ProduceOutcome,
        ShipmentRequest,
        ShipmentOutcome,
        LineItem,
        AdministerRequest,
        AdministerOutcome,
        DisposeRequest,
        DisposeOutcome,
        RecallRequest,
        ReceiptResponse,
        HealthResponse,
        HistoryPage,
        SummaryRow,
        ProductDetail,
        ActionKind,
        OwnerKind,
        OwnerRef,
    )),
    tags(
        (name = "Production", description = "Production batch registration"),
        (name = "Shipments", description = "Shipment, receipt and recall"),
        (name = "Administrations", description = "Patient administration and recall"),
        (name = "Units", description = "Unit disposal"),
        (name = "History", description = "Grouped custody history"),
        (name = "Health", description = "Service health"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_builds() {
        let doc = ApiDoc::openapi();
        let json = doc.to_json().expect("OpenAPI doc serializes");
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let paths = value["paths"].as_object().unwrap();
        assert!(paths.contains_key("/api/v1/shipments"));
        assert!(paths.contains_key("/api/v1/history"));
        assert!(paths.contains_key("/health"));
    }
}
