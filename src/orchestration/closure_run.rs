//! Closure run drivers: the twice-monthly Early Freeze and Full Close
//! jobs invoked by the external scheduler.
//!
//! Each run is idempotent against duplicate or delayed invocation: the
//! period clock gates on the cutoff, and per-model closure status makes
//! re-invocation a no-op. Models are independent; one model's failure
//! never aborts the rest, and every run returns an operator-facing
//! summary report.

use crate::db::Repository;
use crate::domain::{ModelId, Period, TimeMs};
use crate::engine::clock;
use crate::orchestration::archival::{ArchivalOutcome, Archiver};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Bounded fan-out for per-model archivals within one run.
const CLOSURE_CONCURRENCY: usize = 4;

/// One model's failure inside a run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelFailure {
    pub model: ModelId,
    pub error: String,
}

/// Operator-facing summary of an early-freeze run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreezeReport {
    pub due: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
    pub frozen: usize,
    pub already_frozen: usize,
}

/// Operator-facing summary of a full-close run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosureRunReport {
    pub due: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
    pub succeeded: Vec<ModelId>,
    pub skipped: Vec<ModelId>,
    pub failed: Vec<ModelFailure>,
    /// Models whose ledger copy is verified but whose working-set delete
    /// still needs cleanup retry.
    pub cleanup_pending: Vec<ModelId>,
}

impl ClosureRunReport {
    fn not_due() -> Self {
        ClosureRunReport {
            due: false,
            period: None,
            succeeded: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            cleanup_pending: Vec::new(),
        }
    }
}

/// Drives closure runs over every model active in the closing period.
pub struct ClosureRunner {
    repo: Arc<Repository>,
    archiver: Arc<Archiver>,
}

impl ClosureRunner {
    pub fn new(repo: Arc<Repository>, archiver: Arc<Archiver>) -> Self {
        Self { repo, archiver }
    }

    /// Early Freeze: mark every active model's closure as `early_frozen`.
    ///
    /// Advisory only, no data moves. Re-invocation is a no-op for models
    /// already frozen or further along.
    ///
    /// # Errors
    /// Returns an error only if the model enumeration itself fails;
    /// per-model marking failures are isolated into the report.
    pub async fn early_freeze(&self, now: DateTime<Utc>) -> Result<FreezeReport, sqlx::Error> {
        if !clock::is_early_freeze_cutoff(now) {
            info!("Early freeze invoked before cutoff, not due");
            return Ok(FreezeReport {
                due: false,
                period: None,
                frozen: 0,
                already_frozen: 0,
            });
        }

        let period = clock::resolve_period(now);
        let now_ms = TimeMs::new(now.timestamp_millis());
        let models = self.repo.distinct_models_with_entries(period).await?;

        let mut frozen = 0usize;
        let mut already_frozen = 0usize;
        for model in &models {
            match self.repo.mark_early_frozen(model, period, now_ms).await {
                Ok(true) => frozen += 1,
                Ok(false) => already_frozen += 1,
                Err(e) => {
                    warn!(model = %model, error = %e, "Early freeze failed for model");
                }
            }
        }

        info!(
            period = %period,
            frozen,
            already_frozen,
            "Early freeze run finished"
        );
        Ok(FreezeReport {
            due: true,
            period: Some(period),
            frozen,
            already_frozen,
        })
    }

    /// Full Close: archive and reset every active model in the closing
    /// period, with bounded concurrency.
    ///
    /// # Errors
    /// Returns an error only if the model enumeration itself fails;
    /// per-model archival failures are isolated into the report.
    pub async fn full_close(&self, now: DateTime<Utc>) -> Result<ClosureRunReport, sqlx::Error> {
        if !clock::is_closure_cutoff(now) {
            info!("Full close invoked before cutoff, not due");
            return Ok(ClosureRunReport::not_due());
        }

        let period = clock::resolve_period(now);
        let now_ms = TimeMs::new(now.timestamp_millis());
        let models = self.repo.distinct_models_with_entries(period).await?;

        let outcomes: Vec<(ModelId, Result<ArchivalOutcome, String>)> = stream::iter(models)
            .map(|model| {
                let archiver = self.archiver.clone();
                async move {
                    let result = archiver
                        .archive_and_reset(&model, period, now_ms)
                        .await
                        .map_err(|e| e.to_string());
                    (model, result)
                }
            })
            .buffer_unordered(CLOSURE_CONCURRENCY)
            .collect()
            .await;

        let mut report = ClosureRunReport {
            due: true,
            period: Some(period),
            succeeded: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            cleanup_pending: Vec::new(),
        };

        for (model, result) in outcomes {
            match result {
                Ok(ArchivalOutcome::Archived {
                    working_cleared, ..
                }) => {
                    if !working_cleared {
                        report.cleanup_pending.push(model.clone());
                    }
                    report.succeeded.push(model);
                }
                Ok(ArchivalOutcome::AlreadyClosed) | Ok(ArchivalOutcome::InProgress) => {
                    report.skipped.push(model);
                }
                Err(error) => {
                    warn!(model = %model, error = %error, "Model closure failed");
                    report.failed.push(ModelFailure { model, error });
                }
            }
        }

        report.succeeded.sort();
        report.skipped.sort();
        report.failed.sort_by(|a, b| a.model.cmp(&b.model));

        info!(
            period = %period,
            succeeded = report.succeeded.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Full close run finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelShares;
    use crate::db::migrations::init_db;
    use crate::domain::{Currency, Money, Platform, RateSet, WorkingEntry};
    use crate::engine::{ClosureState, FixedRateProvider};
    use chrono::TimeZone;
    use tempfile::TempDir;

    /// 2024-06-15 22:30 in agency time (UTC-5) = 2024-06-16 03:30 UTC.
    fn closure_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 16, 3, 30, 0).unwrap()
    }

    fn closing_period() -> Period {
        clock::resolve_period(closure_instant())
    }

    async fn setup() -> (Arc<Repository>, ClosureRunner, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        let repo = Arc::new(Repository::new(pool));
        let archiver = Arc::new(Archiver::new(
            repo.clone(),
            Arc::new(FixedRateProvider::new(RateSet::fallback())),
            ModelShares::with_default(Money::from_str_canonical("60").unwrap()),
        ));
        let runner = ClosureRunner::new(repo.clone(), archiver);
        (repo, runner, temp_dir)
    }

    async fn seed(repo: &Repository, model: &str, raw: &str) {
        repo.insert_working_entry(&WorkingEntry {
            model: ModelId::new(model.to_string()),
            platform: Platform::Chaturbate,
            currency: Currency::Usd,
            raw_value: Money::from_str_canonical(raw).unwrap(),
            period: closing_period(),
            recorded_at_ms: TimeMs::new(1000),
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_full_close_not_due_before_cutoff() {
        let (repo, runner, _temp) = setup().await;
        seed(&repo, "m-1", "100").await;

        // 2024-06-15 10:00 agency time: cutoff day, before the hour.
        let early = Utc.with_ymd_and_hms(2024, 6, 15, 15, 0, 0).unwrap();
        let report = runner.full_close(early).await.unwrap();

        assert!(!report.due);
        assert!(report.succeeded.is_empty());
        assert_eq!(
            repo.count_working_entries(&ModelId::new("m-1".to_string()), closing_period())
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_full_close_archives_all_models() {
        let (repo, runner, _temp) = setup().await;
        seed(&repo, "m-1", "100").await;
        seed(&repo, "m-2", "50").await;
        seed(&repo, "m-3", "25").await;

        let report = runner.full_close(closure_instant()).await.unwrap();

        assert!(report.due);
        assert_eq!(report.succeeded.len(), 3);
        assert!(report.failed.is_empty());

        for model in ["m-1", "m-2", "m-3"] {
            let id = ModelId::new(model.to_string());
            assert_eq!(
                repo.get_closure_state(&id, closing_period()).await.unwrap(),
                Some(ClosureState::Completed)
            );
            assert_eq!(
                repo.count_working_entries(&id, closing_period())
                    .await
                    .unwrap(),
                0
            );
        }
    }

    #[tokio::test]
    async fn test_second_full_close_skips_everyone() {
        let (repo, runner, _temp) = setup().await;
        seed(&repo, "m-1", "100").await;

        runner.full_close(closure_instant()).await.unwrap();
        let second = runner.full_close(closure_instant()).await.unwrap();

        assert!(second.due);
        assert!(second.succeeded.is_empty());
        assert!(second.failed.is_empty());
        // Working set already cleared, so the model is no longer
        // enumerated at all.
        assert!(second.skipped.is_empty());
        assert_eq!(
            repo.count_archived_records(&ModelId::new("m-1".to_string()), closing_period())
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_one_model_failure_does_not_block_others() {
        let (repo, runner, _temp) = setup().await;
        seed(&repo, "m-1", "100").await;
        seed(&repo, "m-2", "50").await;

        // Force a verification mismatch for m-1 only.
        repo.upsert_archived_records(&[crate::domain::ArchivedRecord {
            model: ModelId::new("m-1".to_string()),
            platform: Platform::CamSoda,
            period: closing_period(),
            currency: Currency::Usd,
            raw_value: Money::from_str_canonical("1").unwrap(),
            share_pct: Money::from_str_canonical("60").unwrap(),
            rates: RateSet::fallback(),
            gross_usd: Money::from_str_canonical("0.8").unwrap(),
            model_usd: Money::from_str_canonical("0.48").unwrap(),
            model_local: Money::from_str_canonical("1872").unwrap(),
            archived_at_ms: TimeMs::new(100),
            corrected_at_ms: None,
        }])
        .await
        .unwrap();

        let report = runner.full_close(closure_instant()).await.unwrap();

        assert_eq!(report.succeeded, vec![ModelId::new("m-2".to_string())]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].model, ModelId::new("m-1".to_string()));
        assert!(report.failed[0].error.contains("mismatch"));

        // The failed model's working set is preserved for retry.
        assert_eq!(
            repo.count_working_entries(&ModelId::new("m-1".to_string()), closing_period())
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_early_freeze_marks_and_is_idempotent() {
        let (repo, runner, _temp) = setup().await;
        seed(&repo, "m-1", "100").await;
        seed(&repo, "m-2", "50").await;

        // 2024-06-15 12:30 agency time.
        let freeze_time = Utc.with_ymd_and_hms(2024, 6, 15, 17, 30, 0).unwrap();
        let first = runner.early_freeze(freeze_time).await.unwrap();
        assert!(first.due);
        assert_eq!(first.frozen, 2);
        assert_eq!(first.already_frozen, 0);

        let second = runner.early_freeze(freeze_time).await.unwrap();
        assert_eq!(second.frozen, 0);
        assert_eq!(second.already_frozen, 2);

        assert_eq!(
            repo.get_closure_state(&ModelId::new("m-1".to_string()), closing_period())
                .await
                .unwrap(),
            Some(ClosureState::EarlyFrozen)
        );
    }

    #[tokio::test]
    async fn test_early_freeze_not_due_on_ordinary_day() {
        let (_repo, runner, _temp) = setup().await;
        let ordinary = Utc.with_ymd_and_hms(2024, 6, 10, 18, 0, 0).unwrap();
        let report = runner.early_freeze(ordinary).await.unwrap();
        assert!(!report.due);
    }
}
