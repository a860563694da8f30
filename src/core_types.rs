//! Core types used throughout the system
//!
//! These are fundamental type aliases used by all modules.
//! They provide semantic meaning and enable future type evolution.

/// Inventory unit ID - globally unique identifier for one traceable item.
///
/// # Constraints:
/// - **Immutable**: Once assigned, NEVER changes
/// - **Monotonic**: Assigned by the database sequence, ascending
///
/// The ascending property matters: FIFO allocation breaks ties on
/// `unit_id ASC`, so equal-timestamp units still allocate deterministically.
pub type UnitId = i64;

/// Ledger event ID - unique, ascending append position.
///
/// Together with `created_at` this forms the compound pagination cursor.
pub type EventId = i64;

/// Organization ID (manufacturer, distributor, hospital).
pub type OrgId = i64;

/// Patient ID - opaque reference to a patient record.
pub type PatientId = i64;

/// Product catalog reference.
pub type ProductId = i64;

/// Production batch ID (database key, distinct from the batch number).
pub type BatchId = i64;
