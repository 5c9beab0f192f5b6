//! Currency conversion rate sets.

use crate::domain::Money;
use serde::{Deserialize, Serialize};

/// Fallback EUR→USD rate used when no rate set is active.
pub const DEFAULT_EUR_USD_CENTS: i64 = 108;
/// Fallback GBP→USD rate used when no rate set is active.
pub const DEFAULT_GBP_USD_CENTS: i64 = 127;
/// Fallback USD→COP rate used when no rate set is active.
pub const DEFAULT_USD_COP: i64 = 3900;

/// The three conversion factors in force at a point in time.
///
/// At most one rate set is active at any instant. Closure copies the
/// active values into each archived record; once archived, rates are a
/// value, not a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateSet {
    pub eur_usd: Money,
    pub gbp_usd: Money,
    pub usd_cop: Money,
}

impl RateSet {
    /// Documented default constants, used when no active rate set exists.
    /// Billing proceeds with a best-effort rate rather than failing.
    pub fn fallback() -> RateSet {
        RateSet {
            eur_usd: Money::from_scaled(DEFAULT_EUR_USD_CENTS, 2),
            gbp_usd: Money::from_scaled(DEFAULT_GBP_USD_CENTS, 2),
            usd_cop: Money::from_scaled(DEFAULT_USD_COP, 0),
        }
    }
}

/// Partial replacement rates for closed-period correction.
///
/// Each kind left unset falls back to the rate already stored on the
/// record being corrected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateOverrides {
    pub eur_usd: Option<Money>,
    pub gbp_usd: Option<Money>,
    pub usd_cop: Option<Money>,
}

impl RateOverrides {
    pub fn is_empty(&self) -> bool {
        self.eur_usd.is_none() && self.gbp_usd.is_none() && self.usd_cop.is_none()
    }

    /// Merge over a stored rate set, keeping stored values for unset kinds.
    pub fn apply_to(&self, stored: &RateSet) -> RateSet {
        RateSet {
            eur_usd: self.eur_usd.unwrap_or(stored.eur_usd),
            gbp_usd: self.gbp_usd.unwrap_or(stored.gbp_usd),
            usd_cop: self.usd_cop.unwrap_or(stored.usd_cop),
        }
    }
}
