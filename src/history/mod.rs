//! History summarizer
//!
//! Read-only presentation of the ledger as grouped transactions with
//! compound-cursor pagination. Holds no state and never writes; the
//! grouping logic is pure so it can be tested without a database.

pub mod summarizer;
pub mod types;

use thiserror::Error;

pub use summarizer::HistorySummarizer;
pub use types::{
    Cursor, GroupKey, GroupRef, HistoryPage, HistoryQuery, ProductDetail, SummaryRow,
};

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt ledger row: {0}")]
    Corrupt(String),

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),
}
