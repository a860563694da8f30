//! Transition request/response types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::core_types::{BatchId, OrgId, PatientId, ProductId};

/// One requested product line in a shipment or administration
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LineItem {
    pub product_id: ProductId,
    /// Restrict allocation to one production batch
    #[serde(default)]
    pub lot_id: Option<BatchId>,
    pub quantity: i64,
}

/// Register a manufacturing run
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ProduceRequest {
    pub manufacturer_id: OrgId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub manufactured_on: NaiveDate,
    pub expires_on: NaiveDate,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProduceOutcome {
    pub batch_id: BatchId,
    pub batch_number: String,
    pub unit_count: u32,
}

/// Ship units from one organization to another
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ShipmentRequest {
    pub source_org: OrgId,
    pub destination_org: OrgId,
    pub lines: Vec<LineItem>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ShipmentOutcome {
    pub transfer_id: Uuid,
    /// Codes of every unit moved, in allocation order
    pub unit_codes: Vec<String>,
}

/// Administer units to a patient
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AdministerRequest {
    pub hospital_org: OrgId,
    pub patient_id: PatientId,
    /// Defaults to today when omitted
    #[serde(default)]
    pub administered_on: Option<NaiveDate>,
    pub lines: Vec<LineItem>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdministerOutcome {
    pub administration_id: Uuid,
    pub unit_codes: Vec<String>,
}

/// Mark units disposed; ownership is unchanged
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DisposeRequest {
    pub owner_org: OrgId,
    pub unit_codes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DisposeOutcome {
    pub disposed: u32,
}
