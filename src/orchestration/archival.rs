//! The archival transaction: archive a model's period into the ledger,
//! then reset the working set.
//!
//! Step order is load survivors → snapshot → rates/share → upsert ledger
//! rows → verify count → delete working rows. Everything before the
//! delete leaves the working set untouched, so any failure up to and
//! including verification is safely retryable. The verify-before-delete
//! gate prefers leaving working data in place over silently losing
//! history.

use crate::config::ModelShares;
use crate::db::Repository;
use crate::domain::{
    resolve_survivors, ArchivedRecord, BackupSnapshot, ModelId, Period, SnapshotError, TimeMs,
};
use crate::engine::{compute_derived_values, may_claim_archival, ClosureState, RateSource};
use backoff::ExponentialBackoff;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum ArchivalError {
    #[error("verification mismatch for {model} {period}: wrote {written}, found {found}")]
    VerificationMismatch {
        model: ModelId,
        period: Period,
        written: usize,
        found: i64,
    },
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Result of one archival attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchivalOutcome {
    /// Records archived and verified. `working_cleared` is false when the
    /// final delete failed after verification; the ledger copy is
    /// canonical at that point and only cleanup retry is needed.
    Archived {
        records: usize,
        working_cleared: bool,
    },
    /// Closure already completed for this (model, period); nothing done.
    AlreadyClosed,
    /// Another runner currently holds the archiving claim; skipped.
    InProgress,
}

/// Executes the archive-and-reset transaction for one (model, period).
pub struct Archiver {
    repo: Arc<Repository>,
    rates: Arc<dyn RateSource>,
    shares: ModelShares,
}

impl Archiver {
    pub fn new(repo: Arc<Repository>, rates: Arc<dyn RateSource>, shares: ModelShares) -> Self {
        Self {
            repo,
            rates,
            shares,
        }
    }

    /// Archive the model's working set for the period and reset it.
    ///
    /// Idempotent: a completed closure is skipped, a concurrent claim is
    /// skipped, and a retry after partial failure re-upserts the same
    /// keys. On any error the closure status is set to `failed` with the
    /// underlying message before the error propagates.
    ///
    /// # Errors
    /// Returns an error if any step before the final delete fails; the
    /// working set is left untouched in that case.
    pub async fn archive_and_reset(
        &self,
        model: &ModelId,
        period: Period,
        now: TimeMs,
    ) -> Result<ArchivalOutcome, ArchivalError> {
        let observed = self.repo.get_closure_state(model, period).await?;
        if !may_claim_archival(observed) {
            return match observed {
                Some(ClosureState::Completed) => {
                    info!(model = %model, period = %period, "Closure already completed, skipping");
                    // The ledger copy is canonical; clear any working rows
                    // left behind by an earlier failed delete.
                    let leftovers = self.repo.count_working_entries(model, period).await?;
                    if leftovers > 0 {
                        warn!(
                            model = %model,
                            period = %period,
                            leftovers,
                            "Retrying working-set cleanup for completed closure"
                        );
                        self.delete_with_retry(model, period).await?;
                    }
                    Ok(ArchivalOutcome::AlreadyClosed)
                }
                _ => {
                    warn!(model = %model, period = %period, "Archiving claim held elsewhere, skipping");
                    Ok(ArchivalOutcome::InProgress)
                }
            };
        }

        if !self.repo.claim_archiving(model, period, now).await? {
            // Claim can only be denied by a concurrent archiving holder or
            // a completion that landed since the read above.
            return match self.repo.get_closure_state(model, period).await? {
                Some(ClosureState::Completed) => Ok(ArchivalOutcome::AlreadyClosed),
                _ => {
                    warn!(model = %model, period = %period, "Archiving claim held elsewhere, skipping");
                    Ok(ArchivalOutcome::InProgress)
                }
            };
        }

        match self.run_claimed(model, period, now).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                if let Err(mark_err) = self
                    .repo
                    .mark_failed(model, period, now, &e.to_string())
                    .await
                {
                    warn!(model = %model, error = %mark_err, "Failed to record closure failure");
                }
                Err(e)
            }
        }
    }

    /// Steps 1-6, entered only with the archiving claim held.
    async fn run_claimed(
        &self,
        model: &ModelId,
        period: Period,
        now: TimeMs,
    ) -> Result<ArchivalOutcome, ArchivalError> {
        // Step 1: snapshot the working set, last write per platform wins,
        // non-positive values dropped.
        let raw_entries = self.repo.load_working_entries(model, period).await?;
        let survivors = resolve_survivors(raw_entries);

        // Step 2: recovery point, before anything destructive.
        let snapshot = BackupSnapshot::capture(model, period, &survivors, now)?;
        self.repo.insert_backup_snapshot(&snapshot).await?;

        // Step 3: the values in force at archival time.
        let share_pct = self.shares.share_for(model);
        let rates = self.rates.active_rates().await?;

        // Step 4: idempotent upsert of the ledger rows.
        let records: Vec<ArchivedRecord> = survivors
            .iter()
            .map(|entry| {
                let derived = compute_derived_values(
                    entry.raw_value,
                    entry.currency,
                    &entry.platform,
                    share_pct,
                    &rates,
                );
                ArchivedRecord {
                    model: entry.model.clone(),
                    platform: entry.platform.clone(),
                    period,
                    currency: entry.currency,
                    raw_value: entry.raw_value,
                    share_pct,
                    rates,
                    gross_usd: derived.gross_usd,
                    model_usd: derived.model_usd,
                    model_local: derived.model_local,
                    archived_at_ms: now,
                    corrected_at_ms: None,
                }
            })
            .collect();
        self.repo.upsert_archived_records(&records).await?;

        // Step 5: verify before anything is deleted.
        let found = self.repo.count_archived_records(model, period).await?;
        if found != records.len() as i64 {
            return Err(ArchivalError::VerificationMismatch {
                model: model.clone(),
                period,
                written: records.len(),
                found,
            });
        }

        // Step 6: reset the working set. The ledger copy is canonical
        // once verification passed, so a delete failure is reported for
        // cleanup rather than failing the closure.
        let working_cleared = match self.delete_with_retry(model, period).await {
            Ok(deleted) => {
                info!(
                    model = %model,
                    period = %period,
                    archived = records.len(),
                    deleted,
                    "Archival completed"
                );
                true
            }
            Err(e) => {
                error!(
                    model = %model,
                    period = %period,
                    error = %e,
                    "Working set delete failed after verified archival; cleanup retry needed"
                );
                false
            }
        };

        self.repo.mark_completed(model, period, now).await?;

        Ok(ArchivalOutcome::Archived {
            records: records.len(),
            working_cleared,
        })
    }

    async fn delete_with_retry(
        &self,
        model: &ModelId,
        period: Period,
    ) -> Result<u64, sqlx::Error> {
        let policy = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(20)),
            ..Default::default()
        };

        backoff::future::retry(policy, || async {
            self.repo
                .delete_working_entries(model, period)
                .await
                .map_err(backoff::Error::transient)
        })
        .await
    }
}
