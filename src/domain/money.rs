//! Decimal-safe money type backed by rust_decimal.
//!
//! All monetary arithmetic in the crate goes through this wrapper so that
//! nothing is ever computed in binary floating point. Values persist and
//! serialize as canonical strings; rounding happens only at the final
//! stored value, never on intermediates.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of fractional digits kept on stored monetary values.
pub const MONEY_SCALE: u32 = 2;

/// Lossless monetary amount.
///
/// Serializes as a canonical JSON string (normalized, no exponent) so
/// ledger values round-trip exactly through API payloads and snapshot
/// blobs regardless of internal scale.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Money(#[serde(with = "canonical_str")] Decimal);

mod canonical_str {
    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.normalize().to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        let s = String::deserialize(deserializer)?;
        Decimal::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl Money {
    pub fn new(value: Decimal) -> Self {
        Money(value)
    }

    /// Build a value from scaled integer parts: `from_scaled(108, 2)` is 1.08.
    pub fn from_scaled(units: i64, scale: u32) -> Self {
        Money(Decimal::new(units, scale))
    }

    /// Parse from a decimal string losslessly.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        Decimal::from_str(s).map(Money)
    }

    /// Canonical string form: normalized, no exponent notation.
    pub fn to_canonical_string(&self) -> String {
        format!("{}", self.0.normalize())
    }

    pub fn inner(&self) -> Decimal {
        self.0
    }

    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn hundred() -> Self {
        Money(Decimal::ONE_HUNDRED)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    /// Round to the stored money scale, half away from zero.
    ///
    /// Applied exactly once per derived value, at the point it is stored.
    pub fn round_money(&self) -> Self {
        Money(
            self.0
                .round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero),
        )
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Money(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl std::ops::Mul for Money {
    type Output = Money;

    fn mul(self, rhs: Money) -> Money {
        Money(self.0 * rhs.0)
    }
}

impl std::ops::Div for Money {
    type Output = Money;

    fn div(self, rhs: Money) -> Money {
        Money(self.0 / rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        for s in ["100", "0.05", "234000", "1.08", "3900", "999999.99"] {
            let m = Money::from_str_canonical(s).expect("parse failed");
            let reparsed = Money::from_str_canonical(&m.to_canonical_string()).unwrap();
            assert_eq!(m, reparsed, "roundtrip failed for {}", s);
        }
    }

    #[test]
    fn test_serializes_as_canonical_string() {
        let m = Money::from_str_canonical("75.00").unwrap();
        let json = serde_json::to_value(m).unwrap();
        assert_eq!(json, serde_json::Value::String("75".to_string()));

        let back: Money = serde_json::from_value(json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_round_money_half_away_from_zero() {
        let m = Money::from_str_canonical("1.005").unwrap();
        assert_eq!(m.round_money().to_canonical_string(), "1.01");
        let n = Money::from_str_canonical("-1.005").unwrap();
        assert_eq!(n.round_money().to_canonical_string(), "-1.01");
    }

    #[test]
    fn test_round_only_changes_scale() {
        let m = Money::from_str_canonical("60").unwrap();
        assert_eq!(m.round_money().to_canonical_string(), "60");
    }

    #[test]
    fn test_from_scaled() {
        assert_eq!(Money::from_scaled(108, 2).to_canonical_string(), "1.08");
        assert_eq!(Money::from_scaled(3900, 0).to_canonical_string(), "3900");
    }

    #[test]
    fn test_is_positive() {
        assert!(Money::from_scaled(1, 2).is_positive());
        assert!(!Money::zero().is_positive());
        assert!(!Money::from_scaled(-5, 0).is_positive());
    }

    #[test]
    fn test_arithmetic_stays_decimal() {
        let raw = Money::from_str_canonical("100").unwrap();
        let fee = Money::from_str_canonical("0.75").unwrap();
        let pct = Money::from_str_canonical("80").unwrap();
        let local = Money::from_str_canonical("3900").unwrap();

        let gross = raw * fee;
        let share = gross * pct / Money::hundred();
        let cop = share * local;

        assert_eq!(gross.to_canonical_string(), "75");
        assert_eq!(share.to_canonical_string(), "60");
        assert_eq!(cop.to_canonical_string(), "234000");
    }
}
