//! Custody ledger module
//!
//! PostgreSQL-based storage for inventory units, batches and the
//! append-only ledger of ownership changes. All other modules mutate
//! custody state exclusively through [`store::LedgerStore`].

pub mod error;
pub mod models;
pub mod store;

// Re-export commonly used types
pub use error::LedgerError;
pub use models::{
    ActionKind, AdministrationRecord, InventoryUnit, LedgerEvent, NewLedgerEvent, OwnerKind,
    OwnerRef, ProductionBatch, TransferBatch, UnitStatus,
};
pub use store::LedgerStore;
