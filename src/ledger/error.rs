use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored discriminant (status, action, owner type) did not map back
    /// to a known enum value. Indicates out-of-band writes to the tables.
    #[error("Corrupt ledger row: {0}")]
    Corrupt(String),
}
