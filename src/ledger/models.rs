//! Custody ledger entity types
//!
//! Type definitions for the four persisted entities plus the enums they
//! store as `SMALLINT` discriminants.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::core_types::{BatchId, EventId, OrgId, ProductId, UnitId};

/// Owner category for an inventory unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[repr(i16)]
#[serde(rename_all = "UPPERCASE")]
pub enum OwnerKind {
    /// Manufacturer, distributor or hospital
    Organization = 1,
    /// Patient, terminal owner after administration
    Patient = 2,
}

impl OwnerKind {
    /// Get numeric ID for PostgreSQL storage
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    /// Convert from PostgreSQL ID
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(OwnerKind::Organization),
            2 => Some(OwnerKind::Patient),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerKind::Organization => "ORGANIZATION",
            OwnerKind::Patient => "PATIENT",
        }
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Current owner of a unit: owner category plus id.
///
/// A unit has exactly one of these at all times; it changes only through
/// the transition engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct OwnerRef {
    pub kind: OwnerKind,
    pub id: i64,
}

impl OwnerRef {
    pub fn org(id: OrgId) -> Self {
        Self {
            kind: OwnerKind::Organization,
            id,
        }
    }

    pub fn patient(id: i64) -> Self {
        Self {
            kind: OwnerKind::Patient,
            id,
        }
    }

    /// Rebuild from nullable DB columns; both present or both absent.
    pub fn from_columns(kind: Option<i16>, id: Option<i64>) -> Option<Self> {
        match (kind, id) {
            (Some(k), Some(id)) => OwnerKind::from_id(k).map(|kind| Self { kind, id }),
            _ => None,
        }
    }
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Unit lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i16)]
#[serde(rename_all = "UPPERCASE")]
pub enum UnitStatus {
    /// In inventory, eligible for allocation
    Active = 1,
    /// Administered to a patient
    Consumed = 2,
    /// Destroyed or written off; terminal
    Disposed = 3,
}

impl UnitStatus {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(UnitStatus::Active),
            2 => Some(UnitStatus::Consumed),
            3 => Some(UnitStatus::Disposed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UnitStatus::Active => "ACTIVE",
            UnitStatus::Consumed => "CONSUMED",
            UnitStatus::Disposed => "DISPOSED",
        }
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ownership-relevant action recorded in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[repr(i16)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionKind {
    Produced = 1,
    Shipped = 2,
    Received = 3,
    Administered = 4,
    Recalled = 5,
    Disposed = 6,
}

impl ActionKind {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(ActionKind::Produced),
            2 => Some(ActionKind::Shipped),
            3 => Some(ActionKind::Received),
            4 => Some(ActionKind::Administered),
            5 => Some(ActionKind::Recalled),
            6 => Some(ActionKind::Disposed),
            _ => None,
        }
    }

    /// Parse an UPPERCASE action name (query-string filter form)
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "PRODUCED" => Some(ActionKind::Produced),
            "SHIPPED" => Some(ActionKind::Shipped),
            "RECEIVED" => Some(ActionKind::Received),
            "ADMINISTERED" => Some(ActionKind::Administered),
            "RECALLED" => Some(ActionKind::Recalled),
            "DISPOSED" => Some(ActionKind::Disposed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Produced => "PRODUCED",
            ActionKind::Shipped => "SHIPPED",
            ActionKind::Received => "RECEIVED",
            ActionKind::Administered => "ADMINISTERED",
            ActionKind::Recalled => "RECALLED",
            ActionKind::Disposed => "DISPOSED",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One physical traceable item
#[derive(Debug, Clone, Serialize)]
pub struct InventoryUnit {
    pub unit_id: UnitId,
    pub unit_code: String,
    pub batch_id: BatchId,
    pub product_id: ProductId,
    pub owner: OwnerRef,
    pub status: UnitStatus,
    pub created_at: DateTime<Utc>,
}

/// One manufacturing run; immutable after registration
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductionBatch {
    pub batch_id: BatchId,
    pub batch_number: String,
    pub manufacturer_id: OrgId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub manufactured_on: NaiveDate,
    pub expires_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// One shipment event grouping the units moved together
#[derive(Debug, Clone, Serialize)]
pub struct TransferBatch {
    pub transfer_id: Uuid,
    pub source_org: OrgId,
    pub destination: OwnerRef,
    pub created_at: DateTime<Utc>,
    pub reversed: bool,
    pub reversed_at: Option<DateTime<Utc>>,
    pub reversal_reason: Option<String>,
}

/// One administration event grouping the units given to a patient
#[derive(Debug, Clone, Serialize)]
pub struct AdministrationRecord {
    pub administration_id: Uuid,
    pub hospital_org: OrgId,
    pub patient_id: i64,
    pub administered_on: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub reversed: bool,
    pub reversed_at: Option<DateTime<Utc>>,
    pub reversal_reason: Option<String>,
}

/// Append-only record of one ownership-relevant action on one unit.
///
/// Never updated, never deleted. Corrections are new events.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEvent {
    pub event_id: EventId,
    pub unit_id: UnitId,
    pub action: ActionKind,
    pub from_owner: Option<OwnerRef>,
    pub to_owner: Option<OwnerRef>,
    pub transfer_id: Option<Uuid>,
    pub production_batch_id: Option<BatchId>,
    pub administration_id: Option<Uuid>,
    pub reversal: bool,
    pub reversal_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for one ledger event; id and timestamp are assigned by
/// the database at append time.
#[derive(Debug, Clone)]
pub struct NewLedgerEvent {
    pub unit_id: UnitId,
    pub action: ActionKind,
    pub from_owner: Option<OwnerRef>,
    pub to_owner: Option<OwnerRef>,
    pub transfer_id: Option<Uuid>,
    pub production_batch_id: Option<BatchId>,
    pub administration_id: Option<Uuid>,
    pub reversal: bool,
    pub reversal_reason: Option<String>,
}

impl NewLedgerEvent {
    /// Event with no batch reference (disposal)
    pub fn unreferenced(unit_id: UnitId, action: ActionKind, owner: OwnerRef) -> Self {
        Self {
            unit_id,
            action,
            from_owner: Some(owner),
            to_owner: Some(owner),
            transfer_id: None,
            production_batch_id: None,
            administration_id: None,
            reversal: false,
            reversal_reason: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_kind_id_round_trip() {
        for kind in [OwnerKind::Organization, OwnerKind::Patient] {
            assert_eq!(OwnerKind::from_id(kind.id()), Some(kind));
        }
        assert_eq!(OwnerKind::from_id(0), None);
        assert_eq!(OwnerKind::from_id(99), None);
    }

    #[test]
    fn unit_status_id_round_trip() {
        for status in [UnitStatus::Active, UnitStatus::Consumed, UnitStatus::Disposed] {
            assert_eq!(UnitStatus::from_id(status.id()), Some(status));
        }
        assert_eq!(UnitStatus::from_id(4), None);
    }

    #[test]
    fn action_kind_id_round_trip() {
        for action in [
            ActionKind::Produced,
            ActionKind::Shipped,
            ActionKind::Received,
            ActionKind::Administered,
            ActionKind::Recalled,
            ActionKind::Disposed,
        ] {
            assert_eq!(ActionKind::from_id(action.id()), Some(action));
        }
        assert_eq!(ActionKind::from_id(7), None);
    }

    #[test]
    fn owner_ref_from_columns_requires_both() {
        assert_eq!(
            OwnerRef::from_columns(Some(1), Some(42)),
            Some(OwnerRef::org(42))
        );
        assert_eq!(OwnerRef::from_columns(Some(1), None), None);
        assert_eq!(OwnerRef::from_columns(None, Some(42)), None);
        // unknown discriminant
        assert_eq!(OwnerRef::from_columns(Some(9), Some(42)), None);
    }

    #[test]
    fn owner_ref_display() {
        assert_eq!(OwnerRef::org(7).to_string(), "ORGANIZATION:7");
        assert_eq!(OwnerRef::patient(3).to_string(), "PATIENT:3");
    }
}
