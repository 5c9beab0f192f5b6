//! Closed-period rate correction.
//!
//! Re-runs the valuation engine over already-archived rows with
//! administrator-supplied replacement rates. Only rows with an archival
//! timestamp exist in the ledger, so the working set is never touched.
//! Raw values, currencies, percentages, and natural keys never change
//! through this path.

use crate::db::Repository;
use crate::domain::{ModelId, Period, RateOverrides, TimeMs};
use crate::engine::compute_derived_values;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum CorrectionError {
    #[error("no replacement rates supplied")]
    EmptyOverrides,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Applies replacement rates to an already-closed period.
pub struct RateCorrector {
    repo: Arc<Repository>,
}

impl RateCorrector {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Recompute every archived record in the period (optionally scoped to
    /// one model) with the replacement rates.
    ///
    /// Rate kinds not supplied fall back to the rate stored on each
    /// record. Idempotent: the derived values are a pure function of the
    /// stored inputs and the effective rates, so re-running with the same
    /// overrides stores the same values. Returns the number of records
    /// updated.
    ///
    /// # Errors
    /// Rejects an override set with no rates at all; propagates
    /// persistence errors.
    pub async fn recompute_closed_period(
        &self,
        period: Period,
        model: Option<&ModelId>,
        overrides: &RateOverrides,
        now: TimeMs,
    ) -> Result<usize, CorrectionError> {
        if overrides.is_empty() {
            return Err(CorrectionError::EmptyOverrides);
        }

        let records = self.repo.query_archived_records(period, model).await?;

        let corrected: Vec<_> = records
            .into_iter()
            .map(|mut record| {
                let rates = overrides.apply_to(&record.rates);
                let derived = compute_derived_values(
                    record.raw_value,
                    record.currency,
                    &record.platform,
                    record.share_pct,
                    &rates,
                );
                record.rates = rates;
                record.gross_usd = derived.gross_usd;
                record.model_usd = derived.model_usd;
                record.model_local = derived.model_local;
                record.corrected_at_ms = Some(now);
                record
            })
            .collect();

        let updated = self.repo.update_corrected_records(&corrected).await?;
        info!(period = %period, updated, "Closed-period rate correction applied");
        Ok(updated)
    }
}
