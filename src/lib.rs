pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use config::{Config, ModelShares};
pub use db::{init_db, Repository};
pub use domain::{
    ArchivedRecord, BackupSnapshot, Currency, Money, ModelId, Period, PeriodType, Platform,
    RateOverrides, RateSet, TimeMs, WorkingEntry,
};
pub use engine::{ClosureState, DbRateProvider, FixedRateProvider, RateSource};
pub use error::AppError;
pub use orchestration::{Archiver, ClosureRunner, RateCorrector};
