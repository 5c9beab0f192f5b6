//! Backup snapshot operations. Append-only: snapshots are inserted before
//! destructive archival work and only ever read back during recovery.

use super::Repository;
use crate::domain::{BackupSnapshot, ModelId, Period, TimeMs};
use sqlx::Row;

impl Repository {
    /// Insert a backup snapshot. Snapshots are never updated or deleted.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_backup_snapshot(
        &self,
        snapshot: &BackupSnapshot,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO backup_snapshots
                (id, model, period_start, period_type, entry_count, checksum, payload, created_at_ms)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&snapshot.id)
        .bind(snapshot.model.as_str())
        .bind(snapshot.period.start_str())
        .bind(snapshot.period.half.as_str())
        .bind(snapshot.entry_count)
        .bind(&snapshot.checksum)
        .bind(&snapshot.payload)
        .bind(snapshot.created_at_ms.as_ms())
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Most recent snapshot for a (model, period), the recovery point.
    pub async fn latest_backup_snapshot(
        &self,
        model: &ModelId,
        period: Period,
    ) -> Result<Option<BackupSnapshot>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, model, entry_count, checksum, payload, created_at_ms
            FROM backup_snapshots
            WHERE model = ? AND period_start = ? AND period_type = ?
            ORDER BY created_at_ms DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(model.as_str())
        .bind(period.start_str())
        .bind(period.half.as_str())
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(|r| BackupSnapshot {
            id: r.get("id"),
            model: ModelId::new(r.get("model")),
            period,
            entry_count: r.get("entry_count"),
            checksum: r.get("checksum"),
            payload: r.get("payload"),
            created_at_ms: TimeMs::new(r.get("created_at_ms")),
        }))
    }

    /// Count snapshots for a (model, period).
    pub async fn count_backup_snapshots(
        &self,
        model: &ModelId,
        period: Period,
    ) -> Result<i64, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) as n
            FROM backup_snapshots
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
