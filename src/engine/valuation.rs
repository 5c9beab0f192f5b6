//! Valuation engine: raw platform values to derived monetary values.
//!
//! Pure functions, no I/O. Conversion order is fixed: foreign currency to
//! USD first, then the platform fee multiplier, then the share split and
//! local conversion. Rounding happens once per derived value, at the end.

use crate::domain::{Currency, Money, Platform, RateSet};

/// The three derived monetary values stored on an archived record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Derived {
    pub gross_usd: Money,
    pub model_usd: Money,
    pub model_local: Money,
}

/// Payout multiplier applied when converting a platform's reported value
/// to gross USD.
///
/// Closed table keyed by platform identity; unknown platforms pass
/// through at 1.00.
pub fn fee_multiplier(platform: &Platform) -> Money {
    match platform {
        Platform::Chaturbate => Money::from_scaled(80, 2),
        Platform::Stripchat => Money::from_scaled(75, 2),
        Platform::BongaCams => Money::from_scaled(90, 2),
        Platform::LiveJasmin => Money::from_scaled(85, 2),
        Platform::CamSoda => Money::from_scaled(80, 2),
        Platform::Flirt4Free => Money::from_scaled(70, 2),
        Platform::Other(_) => Money::from_scaled(100, 2),
    }
}

/// Compute the derived values for one raw entry.
///
/// `share_pct` is the model's percentage (e.g. 80 for 80%). All
/// intermediates stay at full decimal precision; each returned value is
/// rounded to the stored money scale.
pub fn compute_derived_values(
    raw_value: Money,
    currency: Currency,
    platform: &Platform,
    share_pct: Money,
    rates: &RateSet,
) -> Derived {
    let raw_usd = match currency {
        Currency::Usd => raw_value,
        Currency::Eur => raw_value * rates.eur_usd,
        Currency::Gbp => raw_value * rates.gbp_usd,
    };

    let gross_usd = raw_usd * fee_multiplier(platform);
    let model_usd = gross_usd * share_pct / Money::hundred();
    let model_local = model_usd * rates.usd_cop;

    Derived {
        gross_usd: gross_usd.round_money(),
        model_usd: model_usd.round_money(),
        model_local: model_local.round_money(),
    }
}
