//! Archived ledger record operations.

use super::{parse_money_column, Repository};
use crate::domain::{ArchivedRecord, Currency, ModelId, Period, Platform, RateSet, TimeMs};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::warn;

impl Repository {
    /// Upsert archived records keyed by
    /// `(model, platform, period_start, period_type)`, all in one
    /// transaction. Re-running after a partial failure rewrites the same
    /// keys without duplication.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn upsert_archived_records(
        &self,
        records: &[ArchivedRecord],
    ) -> Result<(), sqlx::Error> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool().begin().await?;

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO archived_records
                    (model, platform, period_start, period_type, currency, raw_value,
                     share_pct, eur_usd_rate, gbp_usd_rate, usd_cop_rate,
                     gross_usd, model_usd, model_local, archived_at_ms)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(model, platform, period_start, period_type) DO UPDATE SET
                    currency = excluded.currency,
                    raw_value = excluded.raw_value,
                    share_pct = excluded.share_pct,
                    eur_usd_rate = excluded.eur_usd_rate,
                    gbp_usd_rate = excluded.gbp_usd_rate,
                    usd_cop_rate = excluded.usd_cop_rate,
                    gross_usd = excluded.gross_usd,
                    model_usd = excluded.model_usd,
                    model_local = excluded.model_local,
                    archived_at_ms = excluded.archived_at_ms
                "#,
            )
            .bind(record.model.as_str())
            .bind(record.platform.slug())
            .bind(record.period.start_str())
            .bind(record.period.half.as_str())
            .bind(record.currency.as_str())
            .bind(record.raw_value.to_canonical_string())
            .bind(record.share_pct.to_canonical_string())
            .bind(record.rates.eur_usd.to_canonical_string())
            .bind(record.rates.gbp_usd.to_canonical_string())
            .bind(record.rates.usd_cop.to_canonical_string())
            .bind(record.gross_usd.to_canonical_string())
            .bind(record.model_usd.to_canonical_string())
            .bind(record.model_local.to_canonical_string())
            .bind(record.archived_at_ms.as_ms())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Count archived rows for a model and period (the verification read).
    pub async fn count_archived_records(
        &self,
        model: &ModelId,
        period: Period,
    ) -> Result<i64, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) as n
            FROM archived_records
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

    /// Query archived records for a period, optionally scoped to a model.
    /// Ordered by (model, platform) for deterministic output.
    pub async fn query_archived_records(
        &self,
        period: Period,
        model: Option<&ModelId>,
    ) -> Result<Vec<ArchivedRecord>, sqlx::Error> {
        let rows = match model {
            Some(m) => {
                sqlx::query(
                    r#"
                    SELECT model, platform, currency, raw_value, share_pct,
                           eur_usd_rate, gbp_usd_rate, usd_cop_rate,
                           gross_usd, model_usd, model_local,
                           archived_at_ms, corrected_at_ms
                    FROM archived_records
                    WHERE period_start = ? AND period_type = ? AND model = ?
                    ORDER BY model ASC, platform ASC
                    "#,
                )
                .bind(period.start_str())
                .bind(period.half.as_str())
                .bind(m.as_str())
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT model, platform, currency, raw_value, share_pct,
                           eur_usd_rate, gbp_usd_rate, usd_cop_rate,
                           gross_usd, model_usd, model_local,
                           archived_at_ms, corrected_at_ms
                    FROM archived_records
                    WHERE period_start = ? AND period_type = ?
                    ORDER BY model ASC, platform ASC
                    "#,
                )
                .bind(period.start_str())
                .bind(period.half.as_str())
                .fetch_all(self.pool())
                .await?
            }
        };

        Ok(rows.iter().map(|row| row_to_record(row, period)).collect())
    }

    /// Apply rate corrections in place: update only the rate and derived
    /// fields plus the correction timestamp, never the raw value or key,
    /// all in one transaction.
    ///
    /// Returns the number of rows updated.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn update_corrected_records(
        &self,
        records: &[ArchivedRecord],
    ) -> Result<usize, sqlx::Error> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool().begin().await?;
        let mut updated = 0usize;

        for record in records {
            let result = sqlx::query(
                r#"
                UPDATE archived_records
                SET eur_usd_rate = ?, gbp_usd_rate = ?, usd_cop_rate = ?,
                    gross_usd = ?, model_usd = ?, model_local = ?,
                    corrected_at_ms = ?
                WHERE model = ? AND platform = ? AND period_start = ? AND period_type = ?
                "#,
            )
            .bind(record.rates.eur_usd.to_canonical_string())
            .bind(record.rates.gbp_usd.to_canonical_string())
            .bind(record.rates.usd_cop.to_canonical_string())
            .bind(record.gross_usd.to_canonical_string())
            .bind(record.model_usd.to_canonical_string())
            .bind(record.model_local.to_canonical_string())
            .bind(record.corrected_at_ms.map(|t| t.as_ms()))
            .bind(record.model.as_str())
            .bind(record.platform.slug())
            .bind(record.period.start_str())
            .bind(record.period.half.as_str())
            .execute(&mut *tx)
            .await?;

            updated += result.rows_affected() as usize;
        }

        tx.commit().await?;
        Ok(updated)
    }
}

fn row_to_record(row: &SqliteRow, period: Period) -> ArchivedRecord {
    let platform: String = row.get("platform");
    let currency_str: String = row.get("currency");
    let currency = Currency::parse(&currency_str).unwrap_or_else(|| {
        warn!(currency = %currency_str, "Unknown stored currency, treating as USD");
        Currency::Usd
    });

    ArchivedRecord {
        model: ModelId::new(row.get("model")),
        platform: Platform::from_slug(&platform),
        period,
        currency,
        raw_value: parse_money_column(row.get("raw_value"), "archived_records.raw_value"),
        share_pct: parse_money_column(row.get("share_pct"), "archived_records.share_pct"),
        rates: RateSet {
            eur_usd: parse_money_column(row.get("eur_usd_rate"), "archived_records.eur_usd_rate"),
            gbp_usd: parse_money_column(row.get("gbp_usd_rate"), "archived_records.gbp_usd_rate"),
            usd_cop: parse_money_column(row.get("usd_cop_rate"), "archived_records.usd_cop_rate"),
        },
        gross_usd: parse_money_column(row.get("gross_usd"), "archived_records.gross_usd"),
        model_usd: parse_money_column(row.get("model_usd"), "archived_records.model_usd"),
        model_local: parse_money_column(row.get("model_local"), "archived_records.model_local"),
        archived_at_ms: TimeMs::new(row.get("archived_at_ms")),
        corrected_at_ms: row.get::<Option<i64>, _>("corrected_at_ms").map(TimeMs::new),
    }
}
