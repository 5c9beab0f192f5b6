//! Repository layer for database operations.
//!
//! Methods are organized across submodules by collection:
//! - `entries.rs` - working entry operations
//! - `status.rs` - closure status state machine rows
//! - `archive.rs` - archived ledger records
//! - `snapshots.rs` - pre-archival backup snapshots
//!
//! Monetary columns are stored as canonical decimal strings and parsed
//! back through `Money`; SQLite's REAL arithmetic is never used for money.

mod archive;
mod entries;
mod snapshots;
mod status;

use crate::domain::{Money, RateSet, TimeMs};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use tracing::warn;

pub use status::ClosureStatusRow;

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // =========================================================================
    // Rate set operations
    // =========================================================================

    /// Read the single active rate set, if one exists.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_active_rate_set(&self) -> Result<Option<RateSet>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT eur_usd, gbp_usd, usd_cop
            FROM rate_sets
            WHERE is_active = 1
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| RateSet {
            eur_usd: parse_money_column(r.get("eur_usd"), "rate_sets.eur_usd"),
            gbp_usd: parse_money_column(r.get("gbp_usd"), "rate_sets.gbp_usd"),
            usd_cop: parse_money_column(r.get("usd_cop"), "rate_sets.usd_cop"),
        }))
    }

    /// Replace the active rate set: deactivate the current one and insert
    /// the replacement as active, in one transaction.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn replace_active_rate_set(
        &self,
        rates: &RateSet,
        now: TimeMs,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE rate_sets SET is_active = 0 WHERE is_active = 1")
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO rate_sets (eur_usd, gbp_usd, usd_cop, is_active, created_at_ms)
            VALUES (?, ?, ?, 1, ?)
            "#,
        )
        .bind(rates.eur_usd.to_canonical_string())
        .bind(rates.gbp_usd.to_canonical_string())
        .bind(rates.usd_cop.to_canonical_string())
        .bind(now.as_ms())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

/// Parse a stored decimal column, warning and defaulting to zero on
/// corruption rather than failing the whole read.
pub(crate) fn parse_money_column(raw: String, column: &str) -> Money {
    Money::from_str_canonical(&raw).unwrap_or_else(|e| {
        warn!(column = column, value = %raw, error = %e, "Failed to parse stored decimal, using default");
        Money::default()
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Repository;
    use crate::db::migrations::init_db;
    use tempfile::TempDir;

    pub async fn setup_test_db() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Repository::new(pool), temp_dir)
    }
}
