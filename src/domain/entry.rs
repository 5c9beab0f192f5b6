//! Working earnings entries and the archived ledger rows they become.

use crate::domain::{Currency, Money, ModelId, Period, Platform, RateSet, TimeMs};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One raw earnings value reported for a model on a platform during an
/// open period.
///
/// The input path appends a row per update; the current value of a
/// platform is the most recently recorded row (last-write-wins).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingEntry {
    pub model: ModelId,
    pub platform: Platform,
    pub currency: Currency,
    pub raw_value: Money,
    pub period: Period,
    pub recorded_at_ms: TimeMs,
}

/// Immutable historical ledger row, uniquely keyed by
/// `(model, platform, period_start, period_type)`.
///
/// Rates and percentage are the values in force at archival time. Only
/// the rate-correction path ever mutates a record, and then only the
/// rate and derived fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedRecord {
    pub model: ModelId,
    pub platform: Platform,
    pub period: Period,
    pub currency: Currency,
    pub raw_value: Money,
    pub share_pct: Money,
    pub rates: RateSet,
    pub gross_usd: Money,
    pub model_usd: Money,
    pub model_local: Money,
    pub archived_at_ms: TimeMs,
    pub corrected_at_ms: Option<TimeMs>,
}

/// Reduce a period's raw entry rows to the set that closure archives.
///
/// Keeps the most recently recorded entry per platform and drops entries
/// with a non-positive raw value. Input must be ordered oldest-first
/// (recorded_at, then insertion order) so later rows win ties. Output is
/// sorted by platform slug for deterministic processing.
pub fn resolve_survivors(entries: Vec<WorkingEntry>) -> Vec<WorkingEntry> {
    let mut latest: HashMap<Platform, WorkingEntry> = HashMap::new();
    for entry in entries {
        latest.insert(entry.platform.clone(), entry);
    }

    let mut survivors: Vec<WorkingEntry> = latest
        .into_values()
        .filter(|e| e.raw_value.is_positive())
        .collect();
    survivors.sort_by(|a, b| a.platform.slug().cmp(b.platform.slug()));
    survivors
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn period() -> Period {
        Period::containing(NaiveDate::from_ymd_opt(2024, 5, 3).unwrap())
    }

    fn entry(platform: Platform, raw: &str, at_ms: i64) -> WorkingEntry {
        WorkingEntry {
            model: ModelId::new("m-1".to_string()),
            platform,
            currency: Currency::Usd,
            raw_value: Money::from_str_canonical(raw).unwrap(),
            period: period(),
            recorded_at_ms: TimeMs::new(at_ms),
        }
    }

    #[test]
    fn test_last_write_wins_per_platform() {
        let survivors = resolve_survivors(vec![
            entry(Platform::Chaturbate, "100", 1000),
            entry(Platform::Chaturbate, "250", 2000),
            entry(Platform::Stripchat, "40", 1500),
        ]);

        assert_eq!(survivors.len(), 2);
        assert_eq!(survivors[0].platform, Platform::Chaturbate);
        assert_eq!(survivors[0].raw_value.to_canonical_string(), "250");
        assert_eq!(survivors[1].platform, Platform::Stripchat);
    }

    #[test]
    fn test_ties_resolved_by_insertion_order() {
        // Same timestamp: the later row in the ordered input supersedes.
        let survivors = resolve_survivors(vec![
            entry(Platform::CamSoda, "10", 1000),
            entry(Platform::CamSoda, "20", 1000),
        ]);
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].raw_value.to_canonical_string(), "20");
    }

    #[test]
    fn test_non_positive_values_discarded() {
        let survivors = resolve_survivors(vec![
            entry(Platform::Chaturbate, "0", 1000),
            entry(Platform::Stripchat, "-5", 1100),
            entry(Platform::BongaCams, "12", 1200),
        ]);
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].platform, Platform::BongaCams);
    }

    #[test]
    fn test_superseded_positive_then_zero_is_dropped() {
        // A platform zeroed out by its latest update does not archive.
        let survivors = resolve_survivors(vec![
            entry(Platform::Chaturbate, "100", 1000),
            entry(Platform::Chaturbate, "0", 2000),
        ]);
        assert!(survivors.is_empty());
    }

    #[test]
    fn test_output_sorted_by_platform_slug() {
        let survivors = resolve_survivors(vec![
            entry(Platform::Stripchat, "1", 1),
            entry(Platform::BongaCams, "2", 2),
            entry(Platform::Chaturbate, "3", 3),
        ]);
        let slugs: Vec<&str> = survivors.iter().map(|e| e.platform.slug()).collect();
        assert_eq!(slugs, vec!["bongacams", "chaturbate", "stripchat"]);
    }
}
