//! Medtrace - Medical Device Custody Ledger
//!
//! Unit-level custody tracking for manufactured medical-device items as
//! they move from manufacturer to distributor/hospital to patient, with
//! time-bounded recall.
//!
//! # Modules
//!
//! - [`core_types`] - Core type aliases (UnitId, OrgId, etc.)
//! - [`ledger`] - Entities and the append-only ledger store
//! - [`allocator`] - FIFO unit allocation with non-blocking row claims
//! - [`engine`] - Atomic transition operations (produce, ship, receive,
//!   administer, recall, dispose)
//! - [`history`] - Grouped history with compound-cursor pagination
//! - [`sequence`] - Per-manufacturer batch number sequencing
//! - [`gateway`] - HTTP surface (axum)
//! - [`db`] - PostgreSQL pool and schema
//! - [`validation`] - Pre-transaction input validation

// Core types - must be first!
pub mod core_types;

// Custody components
pub mod allocator;
pub mod engine;
pub mod history;
pub mod ledger;
pub mod sequence;
pub mod validation;

// Infrastructure
pub mod config;
pub mod db;
pub mod gateway;
pub mod logging;

// Convenient re-exports at crate root
pub use allocator::UnitAllocator;
pub use core_types::{BatchId, EventId, OrgId, PatientId, ProductId, UnitId};
pub use db::Database;
pub use engine::{TransitionEngine, TransitionError};
pub use history::HistorySummarizer;
pub use ledger::{ActionKind, LedgerStore, OwnerKind, OwnerRef, UnitStatus};
pub use sequence::{BatchSequencer, InMemorySequencer, PgBatchSequencer};
