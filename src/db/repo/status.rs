//! Closure status rows: the persisted state machine.
//!
//! The status row is the durability boundary of the closure engine. Every
//! resumed or retried run consults it before acting, and the `archiving`
//! claim is a single conditional upsert so concurrent runners cannot race
//! the same (model, period).

use super::Repository;
use crate::domain::{ModelId, Period, TimeMs};
use crate::engine::ClosureState;
use sqlx::Row;
use tracing::warn;

/// Full closure status row, with per-transition timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosureStatusRow {
    pub model: ModelId,
    pub state: ClosureState,
    pub early_frozen_at_ms: Option<TimeMs>,
    pub archiving_at_ms: Option<TimeMs>,
    pub completed_at_ms: Option<TimeMs>,
    pub failed_at_ms: Option<TimeMs>,
    pub error: Option<String>,
}

impl Repository {
    /// Current closure state for a (model, period), `None` meaning pending.
    pub async fn get_closure_state(
        &self,
        model: &ModelId,
        period: Period,
    ) -> Result<Option<ClosureState>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT state
            FROM closure_status
            WHERE model = ? AND period_start = ? AND period_type = ?
            "#,
        )
        .bind(model.as_str())
        .bind(period.start_str())
        .bind(period.half.as_str())
        .fetch_optional(self.pool())
        .await?;

        Ok(row.and_then(|r| {
            let raw: String = r.get("state");
            let parsed = ClosureState::parse(&raw);
            if parsed.is_none() {
                warn!(model = %model, state = %raw, "Unknown stored closure state");
            }
            parsed
        }))
    }

    /// Full closure status row for reporting and tests.
    pub async fn get_closure_status(
        &self,
        model: &ModelId,
        period: Period,
    ) -> Result<Option<ClosureStatusRow>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT model, state, early_frozen_at_ms, archiving_at_ms,
                   completed_at_ms, failed_at_ms, error
            FROM closure_status
            WHERE model = ? AND period_start = ? AND period_type = ?
            "#,
        )
        .bind(model.as_str())
        .bind(period.start_str())
        .bind(period.half.as_str())
        .fetch_optional(self.pool())
        .await?;

        Ok(row.and_then(|r| {
            let raw: String = r.get("state");
            ClosureState::parse(&raw).map(|state| ClosureStatusRow {
                model: ModelId::new(r.get("model")),
                state,
                early_frozen_at_ms: r.get::<Option<i64>, _>("early_frozen_at_ms").map(TimeMs::new),
                archiving_at_ms: r.get::<Option<i64>, _>("archiving_at_ms").map(TimeMs::new),
                completed_at_ms: r.get::<Option<i64>, _>("completed_at_ms").map(TimeMs::new),
                failed_at_ms: r.get::<Option<i64>, _>("failed_at_ms").map(TimeMs::new),
                error: r.get("error"),
            })
        }))
    }

    /// Record the advisory early-freeze marker.
    ///
    /// Creates the row in `early_frozen` state, or leaves an existing row
    /// untouched (re-invocation is a no-op once the status is
    /// `early_frozen` or later). Returns whether a new row was created.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn mark_early_frozen(
        &self,
        model: &ModelId,
        period: Period,
        now: TimeMs,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO closure_status
                (model, period_start, period_type, state, early_frozen_at_ms)
            VALUES (?, ?, ?, 'early_frozen', ?)
            ON CONFLICT(model, period_start, period_type) DO NOTHING
            "#,
        )
        .bind(model.as_str())
        .bind(period.start_str())
        .bind(period.half.as_str())
        .bind(now.as_ms())
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Claim the `archiving` state for this runner.
    ///
    /// Succeeds from no-row, `early_frozen`, or `failed`; returns `false`
    /// without changing anything when another runner holds `archiving` or
    /// the closure is already `completed`. The claim also clears any
    /// previous error so a retry starts clean.
    ///
    /// # Errors
    /// Returns an error if the upsert fails.
    pub async fn claim_archiving(
        &self,
        model: &ModelId,
        period: Period,
        now: TimeMs,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO closure_status
                (model, period_start, period_type, state, archiving_at_ms)
            VALUES (?, ?, ?, 'archiving', ?)
            ON CONFLICT(model, period_start, period_type) DO UPDATE SET
                state = 'archiving',
                archiving_at_ms = excluded.archiving_at_ms,
                error = NULL
            WHERE closure_status.state IN ('early_frozen', 'failed')
            "#,
        )
        .bind(model.as_str())
        .bind(period.start_str())
        .bind(period.half.as_str())
        .bind(now.as_ms())
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Transition `archiving` → `completed`. No transition ever leaves
    /// `completed`.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub async fn mark_completed(
        &self,
        model: &ModelId,
        period: Period,
        now: TimeMs,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE closure_status
            SET state = 'completed', completed_at_ms = ?, error = NULL
            WHERE model = ? AND period_start = ? AND period_type = ?
              AND state = 'archiving'
            "#,
        )
        .bind(now.as_ms())
        .bind(model.as_str())
        .bind(period.start_str())
        .bind(period.half.as_str())
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Transition to `failed` with the underlying error message. Never
    /// downgrades a `completed` closure.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub async fn mark_failed(
        &self,
        model: &ModelId,
        period: Period,
        now: TimeMs,
        message: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE closure_status
            SET state = 'failed', failed_at_ms = ?, error = ?
            WHERE model = ? AND period_start = ? AND period_type = ?
              AND state IN ('early_frozen', 'archiving')
            "#,
        )
        .bind(now.as_ms())
        .bind(message)
        .bind(model.as_str())
        .bind(period.start_str())
        .bind(period.half.as_str())
        .execute(self.pool())
        .await?;

        Ok(())
    }
}
