//! Batch number sequencing
//!
//! Lot numbers are drawn from an injected collaborator scoped per
//! manufacturer rather than a process-wide counter, so tests can supply
//! deterministic sequences. The Postgres implementation increments outside
//! the produce transaction; a gap after a failed registration is harmless
//! because uniqueness is enforced by the `(manufacturer_id, batch_number)`
//! constraint, not by the sequence.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use crate::core_types::OrgId;

#[derive(Error, Debug)]
pub enum SequenceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Per-manufacturer monotonic sequence source
#[async_trait]
pub trait BatchSequencer: Send + Sync {
    /// Next sequence value for this manufacturer (starts at 1)
    async fn next(&self, manufacturer_id: OrgId) -> Result<i64, SequenceError>;
}

/// Format a lot number from a manufacturer id and sequence value
pub fn format_batch_number(manufacturer_id: OrgId, seq: i64) -> String {
    format!("LOT-{}-{:06}", manufacturer_id, seq)
}

/// Format a unit code; fixed format, globally unique because the batch
/// number is unique and the ordinal is unique within the batch.
pub fn format_unit_code(batch_number: &str, ordinal: u32) -> String {
    format!("MD-{}-{:05}", batch_number, ordinal)
}

/// PostgreSQL-backed sequencer using an upsert counter per manufacturer
pub struct PgBatchSequencer {
    pool: PgPool,
}

impl PgBatchSequencer {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BatchSequencer for PgBatchSequencer {
    async fn next(&self, manufacturer_id: OrgId) -> Result<i64, SequenceError> {
        let seq = sqlx::query_scalar::<_, i64>(
            "INSERT INTO batch_sequences (manufacturer_id, last_seq)
             VALUES ($1, 1)
             ON CONFLICT (manufacturer_id)
             DO UPDATE SET last_seq = batch_sequences.last_seq + 1
             RETURNING last_seq",
        )
        .bind(manufacturer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(seq)
    }
}

/// Deterministic in-memory sequencer for tests
#[derive(Default)]
pub struct InMemorySequencer {
    counters: Mutex<HashMap<OrgId, i64>>,
}

impl InMemorySequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a manufacturer's counter so the next draw is `last + 1`
    pub fn seed(&self, manufacturer_id: OrgId, last: i64) {
        self.counters
            .lock()
            .expect("sequencer lock poisoned")
            .insert(manufacturer_id, last);
    }
}

#[async_trait]
impl BatchSequencer for InMemorySequencer {
    async fn next(&self, manufacturer_id: OrgId) -> Result<i64, SequenceError> {
        let mut counters = self.counters.lock().expect("sequencer lock poisoned");
        let seq = counters.entry(manufacturer_id).or_insert(0);
        *seq += 1;
        Ok(*seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_sequencer_is_per_manufacturer() {
        let seq = InMemorySequencer::new();
        assert_eq!(seq.next(1).await.unwrap(), 1);
        assert_eq!(seq.next(1).await.unwrap(), 2);
        assert_eq!(seq.next(2).await.unwrap(), 1);
        assert_eq!(seq.next(1).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn seeded_sequencer_continues_from_seed() {
        let seq = InMemorySequencer::new();
        seq.seed(7, 41);
        assert_eq!(seq.next(7).await.unwrap(), 42);
    }

    #[test]
    fn batch_number_format() {
        assert_eq!(format_batch_number(12, 7), "LOT-12-000007");
    }

    #[test]
    fn unit_code_format() {
        assert_eq!(format_unit_code("LOT-12-000007", 1), "MD-LOT-12-000007-00001");
        assert_eq!(format_unit_code("LOT-12-000007", 100), "MD-LOT-12-000007-00100");
    }
}
