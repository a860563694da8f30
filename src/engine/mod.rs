//! Transition engine
//!
//! Executes each named business operation (produce, ship, receive,
//! administer, recall, dispose) as a single atomic unit of work: one
//! operation, one transaction. Ledger events are emitted explicitly from
//! the same transaction as the state change they describe; there is no
//! trigger-based or implicit write path.
//!
//! External side effects (notifications etc.) are never performed while a
//! transaction is open; callers sequence those after commit.

pub mod administer;
pub mod dispose;
pub mod error;
pub mod produce;
pub mod recall;
pub mod recall_guard;
pub mod receive;
pub mod ship;
pub mod types;

use std::sync::Arc;

use chrono::Duration;

use crate::db::Database;
use crate::sequence::BatchSequencer;

pub use error::{ErrorCategory, TransitionError};
pub use recall_guard::RecallGuard;
pub use types::{
    AdministerOutcome, AdministerRequest, DisposeOutcome, DisposeRequest, LineItem,
    ProduceOutcome, ProduceRequest, ShipmentOutcome, ShipmentRequest,
};

/// Atomic custody transition operations over the ledger store
pub struct TransitionEngine {
    db: Arc<Database>,
    sequencer: Arc<dyn BatchSequencer>,
    recall_guard: RecallGuard,
}

impl TransitionEngine {
    pub fn new(db: Arc<Database>, sequencer: Arc<dyn BatchSequencer>, recall_window: Duration) -> Self {
        Self {
            db,
            sequencer,
            recall_guard: RecallGuard::new(recall_window),
        }
    }

    pub(crate) fn db(&self) -> &Database {
        &self.db
    }

    pub(crate) fn sequencer(&self) -> &dyn BatchSequencer {
        self.sequencer.as_ref()
    }

    pub(crate) fn recall_guard(&self) -> &RecallGuard {
        &self.recall_guard
    }
}
