//! Pure computation engines for the closure pipeline.
//!
//! The clock and valuation modules are side-effect free; the rate
//! provider is the one read-only I/O seam, behind a trait so tests can
//! substitute fixed rates.

pub mod clock;
pub mod closure;
pub mod rates;
pub mod valuation;

pub use closure::{may_claim_archival, ClosureState};
pub use rates::{DbRateProvider, FixedRateProvider, RateSource};
pub use valuation::{compute_derived_values, fee_multiplier, Derived};
