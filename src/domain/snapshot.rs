//! Pre-archival backup snapshots.
//!
//! A snapshot is an append-only copy of a model's surviving working set
//! for one period, written strictly before the archival transaction does
//! anything destructive. The payload is canonical JSON, lz4-frame
//! compressed, with a SHA-256 checksum over the uncompressed bytes so
//! recovery can detect a corrupt blob before trusting it.

use crate::domain::{ModelId, Period, TimeMs, WorkingEntry};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to encode snapshot payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to compress snapshot payload: {0}")]
    Compress(String),
    #[error("failed to decompress snapshot payload: {0}")]
    Decompress(String),
    #[error("snapshot checksum mismatch: stored {stored}, computed {computed}")]
    ChecksumMismatch { stored: String, computed: String },
}

/// Immutable pre-archival copy of a model's working set for a period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSnapshot {
    pub id: String,
    pub model: ModelId,
    pub period: Period,
    pub entry_count: i64,
    pub checksum: String,
    pub payload: Vec<u8>,
    pub created_at_ms: TimeMs,
}

impl BackupSnapshot {
    /// Capture a snapshot of the exact entry set the archival will operate on.
    ///
    /// # Errors
    /// Returns an error if the entry set cannot be serialized.
    pub fn capture(
        model: &ModelId,
        period: Period,
        entries: &[WorkingEntry],
        now: TimeMs,
    ) -> Result<BackupSnapshot, SnapshotError> {
        let json = serde_json::to_vec(entries)?;
        let checksum = hex_sha256(&json);

        let mut encoder = lz4_flex::frame::FrameEncoder::new(Vec::new());
        std::io::Write::write_all(&mut encoder, &json)
            .map_err(|e| SnapshotError::Compress(e.to_string()))?;
        let payload = encoder
            .finish()
            .map_err(|e| SnapshotError::Compress(e.to_string()))?;

        Ok(BackupSnapshot {
            id: Uuid::new_v4().to_string(),
            model: model.clone(),
            period,
            entry_count: entries.len() as i64,
            checksum,
            payload,
            created_at_ms: now,
        })
    }

    /// Decompress, checksum-verify, and decode the stored entry set.
    ///
    /// # Errors
    /// Returns an error if the payload is corrupt or fails verification.
    pub fn restore_entries(&self) -> Result<Vec<WorkingEntry>, SnapshotError> {
        let mut decoder = lz4_flex::frame::FrameDecoder::new(self.payload.as_slice());
        let mut json = Vec::new();
        std::io::Read::read_to_end(&mut decoder, &mut json)
            .map_err(|e| SnapshotError::Decompress(e.to_string()))?;

        let computed = hex_sha256(&json);
        if computed != self.checksum {
            return Err(SnapshotError::ChecksumMismatch {
                stored: self.checksum.clone(),
                computed,
            });
        }

        Ok(serde_json::from_slice(&json)?)
    }
}

fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
