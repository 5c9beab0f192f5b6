//! Orchestration of the closure pipeline: the archival transaction, the
//! scheduler-driven run drivers, and closed-period rate correction.

pub mod archival;
pub mod closure_run;
pub mod correction;

pub use archival::{ArchivalError, ArchivalOutcome, Archiver};
pub use closure_run::{ClosureRunReport, ClosureRunner, FreezeReport, ModelFailure};
pub use correction::{CorrectionError, RateCorrector};
