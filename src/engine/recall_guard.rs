//! Recall guard: admission control for reversals
//!
//! A transfer batch or administration record may be reversed only while
//! (a) it has not already been reversed and (b) the elapsed time since its
//! creation is strictly below the configured window.
//!
//! Admission is a compare-and-set UPDATE executed inside the reversal
//! transaction, so the window and the reversed flag are re-checked at
//! write time, not just at request time. Two concurrent recalls of the
//! same batch serialize on the row: the loser matches zero rows and reads
//! back the already-set flag as `AlreadyRecalled`.

use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgConnection;
use sqlx::Row;
use uuid::Uuid;

use super::error::TransitionError;

/// True when a reversal of a record created at `created_at` is still
/// inside the window at instant `now`. The bound is strict: exactly
/// `window` elapsed is already expired.
pub fn window_permits(created_at: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    now - created_at < window
}

/// Time-window admission for recall operations
pub struct RecallGuard {
    window: Duration,
}

impl RecallGuard {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Claim a transfer batch for reversal, or fail with `NotFound`,
    /// `AlreadyRecalled` or `RecallWindowExpired`.
    pub async fn admit_transfer(
        &self,
        conn: &mut PgConnection,
        transfer_id: Uuid,
        reason: &str,
    ) -> Result<(), TransitionError> {
        let claimed = sqlx::query(
            "UPDATE transfer_batches
             SET reversed = TRUE, reversed_at = clock_timestamp(), reversal_reason = $2
             WHERE transfer_id = $1 AND reversed = FALSE
               AND clock_timestamp() - created_at < make_interval(secs => $3)",
        )
        .bind(transfer_id)
        .bind(reason)
        .bind(self.window.num_seconds() as f64)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if claimed == 1 {
            return Ok(());
        }

        // Zero rows matched: read the row back to say why.
        let row = sqlx::query("SELECT reversed FROM transfer_batches WHERE transfer_id = $1")
            .bind(transfer_id)
            .fetch_optional(&mut *conn)
            .await?;

        Err(classify_rejection(row, "transfer batch", transfer_id))
    }

    /// Claim an administration record for reversal. Same contract as
    /// [`RecallGuard::admit_transfer`].
    pub async fn admit_administration(
        &self,
        conn: &mut PgConnection,
        administration_id: Uuid,
        reason: &str,
    ) -> Result<(), TransitionError> {
        let claimed = sqlx::query(
            "UPDATE administration_records
             SET reversed = TRUE, reversed_at = clock_timestamp(), reversal_reason = $2
             WHERE administration_id = $1 AND reversed = FALSE
               AND clock_timestamp() - created_at < make_interval(secs => $3)",
        )
        .bind(administration_id)
        .bind(reason)
        .bind(self.window.num_seconds() as f64)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if claimed == 1 {
            return Ok(());
        }

        let row =
            sqlx::query("SELECT reversed FROM administration_records WHERE administration_id = $1")
                .bind(administration_id)
                .fetch_optional(&mut *conn)
                .await?;

        Err(classify_rejection(row, "administration record", administration_id))
    }
}

fn classify_rejection(
    row: Option<sqlx::postgres::PgRow>,
    entity: &'static str,
    id: Uuid,
) -> TransitionError {
    match row {
        None => TransitionError::NotFound {
            entity,
            id: id.to_string(),
        },
        Some(row) if row.get::<bool, _>("reversed") => TransitionError::AlreadyRecalled,
        Some(_) => TransitionError::RecallWindowExpired,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, h, m, s).unwrap()
    }

    #[test]
    fn window_boundary_is_strict() {
        let created = at(10, 0, 0);
        let window = Duration::hours(24);

        // 23h59m59s elapsed: permitted
        let now = created + Duration::hours(23) + Duration::minutes(59) + Duration::seconds(59);
        assert!(window_permits(created, now, window));

        // exactly 24h: expired
        let now = created + Duration::hours(24);
        assert!(!window_permits(created, now, window));

        // beyond: expired
        let now = created + Duration::hours(24) + Duration::seconds(1);
        assert!(!window_permits(created, now, window));
    }

    #[test]
    fn window_permits_fresh_record() {
        let created = at(10, 0, 0);
        assert!(window_permits(created, created, Duration::hours(24)));
        assert!(window_permits(
            created,
            created + Duration::minutes(5),
            Duration::hours(24)
        ));
    }
}
