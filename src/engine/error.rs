use thiserror::Error;

use crate::allocator::AllocationError;
use crate::ledger::LedgerError;
use crate::sequence::SequenceError;
use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum TransitionError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Sequence(#[from] SequenceError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory { requested: u32, available: u32 },

    #[error("Duplicate batch number: {batch_number}")]
    DuplicateBatch { batch_number: String },

    #[error("Invalid destination: {0}")]
    InvalidDestination(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Transaction already recalled")]
    AlreadyRecalled,

    #[error("Recall window expired")]
    RecallWindowExpired,

    #[error("Shipment already confirmed received")]
    AlreadyReceived,

    #[error("Unit {unit_code} is not eligible: status {status}")]
    InvalidUnitState {
        unit_code: String,
        status: &'static str,
    },
}

/// Failure category per the error handling contract. Callers use this to
/// decide retry vs. user-facing message without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rejected before any transaction opened; fix the input
    Validation,
    /// Rolled back cleanly; caller may correct and retry
    Resource,
    /// Business-rule rejection; never retried automatically
    Policy,
    /// Serialization/contention; safe to retry the whole operation
    Transient,
    /// Storage or internal failure
    Internal,
}

impl TransitionError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            TransitionError::Validation(_) => ErrorCategory::Validation,
            TransitionError::InsufficientInventory { .. }
            | TransitionError::DuplicateBatch { .. }
            | TransitionError::NotFound { .. } => ErrorCategory::Resource,
            TransitionError::InvalidDestination(_)
            | TransitionError::AlreadyRecalled
            | TransitionError::RecallWindowExpired
            | TransitionError::AlreadyReceived
            | TransitionError::InvalidUnitState { .. } => ErrorCategory::Policy,
            TransitionError::Database(e) if is_serialization_failure(e) => ErrorCategory::Transient,
            TransitionError::Database(_)
            | TransitionError::Ledger(_)
            | TransitionError::Sequence(_) => ErrorCategory::Internal,
        }
    }

    /// True when retrying the whole operation from scratch is safe and
    /// likely to succeed (nothing committed, failure was contention).
    pub fn is_transient(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }
}

/// SQLSTATE 40001 (serialization_failure) / 40P01 (deadlock_detected)
fn is_serialization_failure(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|d| d.code())
        .map(|code| code == "40001" || code == "40P01")
        .unwrap_or(false)
}

/// SQLSTATE 23505 (unique_violation)
pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|d| d.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}

impl From<AllocationError> for TransitionError {
    fn from(e: AllocationError) -> Self {
        match e {
            AllocationError::Database(e) => TransitionError::Database(e),
            AllocationError::InsufficientInventory {
                requested,
                available,
            } => TransitionError::InsufficientInventory {
                requested,
                available,
            },
            AllocationError::Corrupt(msg) => TransitionError::Ledger(LedgerError::Corrupt(msg)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationError;

    #[test]
    fn categories_follow_the_taxonomy() {
        let e = TransitionError::Validation(ValidationError::NonPositiveQuantity { got: 0 });
        assert_eq!(e.category(), ErrorCategory::Validation);

        let e = TransitionError::InsufficientInventory {
            requested: 5,
            available: 2,
        };
        assert_eq!(e.category(), ErrorCategory::Resource);

        assert_eq!(
            TransitionError::AlreadyRecalled.category(),
            ErrorCategory::Policy
        );
        assert_eq!(
            TransitionError::RecallWindowExpired.category(),
            ErrorCategory::Policy
        );
        assert!(!TransitionError::AlreadyRecalled.is_transient());
    }
}
