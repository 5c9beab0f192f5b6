//! Domain types for the billing ledger.
//!
//! This module provides:
//! - Decimal-safe money handling via the Money wrapper
//! - Domain primitives: ModelId, TimeMs, Currency, Platform
//! - Half-month billing periods with a stable persisted key form
//! - Working entries, archived ledger rows, and backup snapshots
//! - Rate sets with documented fallback defaults

pub mod entry;
pub mod money;
pub mod period;
pub mod primitives;
pub mod rates;
pub mod snapshot;

pub use entry::{resolve_survivors, ArchivedRecord, WorkingEntry};
pub use money::{Money, MONEY_SCALE};
pub use period::{Period, PeriodParseError, PeriodType};
pub use primitives::{Currency, ModelId, Platform, TimeMs};
pub use rates::{RateOverrides, RateSet};
pub use snapshot::{BackupSnapshot, SnapshotError};
