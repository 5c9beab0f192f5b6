//! Working entry operations.

use super::{parse_money_column, Repository};
use crate::domain::{Currency, ModelId, Period, Platform, TimeMs, WorkingEntry};
use sqlx::Row;
use tracing::warn;

impl Repository {
    /// Append a working entry row. The input path never updates in place;
    /// the most recently recorded row per platform is the current value.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_working_entry(&self, entry: &WorkingEntry) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO working_entries
                (model, platform, currency, raw_value, period_start, period_type, recorded_at_ms)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.model.as_str())
        .bind(entry.platform.slug())
        .bind(entry.currency.as_str())
        .bind(entry.raw_value.to_canonical_string())
        .bind(entry.period.start_str())
        .bind(entry.period.half.as_str())
        .bind(entry.recorded_at_ms.as_ms())
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Load all working entry rows for a model and period, oldest first.
    ///
    /// Ordered by (recorded_at_ms, id) so last-write-wins resolution can
    /// simply keep the last row seen per platform.
    pub async fn load_working_entries(
        &self,
        model: &ModelId,
        period: Period,
    ) -> Result<Vec<WorkingEntry>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT model, platform, currency, raw_value, recorded_at_ms
            FROM working_entries
            WHERE model = ? AND period_start = ? AND period_type = ?
            ORDER BY recorded_at_ms ASC, id ASC
            "#,
        )
        .bind(model.as_str())
        .bind(period.start_str())
        .bind(period.half.as_str())
        .fetch_all(self.pool())
        .await?;

        let entries = rows
            .iter()
            .map(|row| {
                let platform: String = row.get("platform");
                let currency_str: String = row.get("currency");
                let currency = Currency::parse(&currency_str).unwrap_or_else(|| {
                    warn!(
                        model = %model,
                        currency = %currency_str,
                        "Unknown stored currency, treating as USD"
                    );
                    Currency::Usd
                });

                WorkingEntry {
                    model: ModelId::new(row.get("model")),
                    platform: Platform::from_slug(&platform),
                    currency,
                    raw_value: parse_money_column(
                        row.get("raw_value"),
                        "working_entries.raw_value",
                    ),
                    period,
                    recorded_at_ms: TimeMs::new(row.get("recorded_at_ms")),
                }
            })
            .collect();

        Ok(entries)
    }

    /// Models that have at least one working entry in the period.
    pub async fn distinct_models_with_entries(
        &self,
        period: Period,
    ) -> Result<Vec<ModelId>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT model
            FROM working_entries
            WHERE period_start = ? AND period_type = ?
            ORDER BY model ASC
            "#,
        )
        .bind(period.start_str())
        .bind(period.half.as_str())
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .iter()
            .map(|row| ModelId::new(row.get("model")))
            .collect())
    }

    /// Delete all working entry rows for a model and period, returning the
    /// number of rows removed. Only called after archival verification.
    ///
    /// # Errors
    /// Returns an error if the delete fails.
    pub async fn delete_working_entries(
        &self,
        model: &ModelId,
        period: Period,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM working_entries
            WHERE model = ? AND period_start = ? AND period_type = ?
            "#,
        )
        .bind(model.as_str())
        .bind(period.start_str())
        .bind(period.half.as_str())
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected())
    }

    /// Count working entry rows for a model and period.
    pub async fn count_working_entries(
        &self,
        model: &ModelId,
        period: Period,
    ) -> Result<i64, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) as n
            FROM working_entries
            WHERE model = ? AND period_start = ? AND period_type = ?
            "#,
        )
        .bind(model.as_str())
        .bind(period.start_str())
        .bind(period.half.as_str())
        .fetch_one(self.pool())
        .await?;

        Ok(row.get("n"))
    }
}
