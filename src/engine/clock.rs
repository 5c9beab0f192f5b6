//! Period clock: maps wall-clock time to billing periods and cutoffs.
//!
//! Every function takes `now` as an explicit parameter and converts it to
//! the agency's fixed civil timezone, so two processes invoked at
//! slightly different instants agree on the period and tests can drive
//! boundary days deterministically. Nothing here reads the system clock
//! or performs I/O.

use crate::domain::Period;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Timelike, Utc};

/// The agency operates on Bogotá civil time, UTC-5 year-round (no DST).
pub const AGENCY_UTC_OFFSET_HOURS: i32 = -5;

/// Local hour at which early freeze becomes due on a cutoff day.
pub const EARLY_FREEZE_HOUR: u32 = 12;

/// Local hour at which full closure becomes due on a cutoff day.
pub const CLOSURE_HOUR: u32 = 22;

fn agency_offset() -> FixedOffset {
    FixedOffset::east_opt(AGENCY_UTC_OFFSET_HOURS * 3600).expect("UTC-5 is a valid offset")
}

/// Convert an instant to agency civil time.
pub fn to_local(now: DateTime<Utc>) -> DateTime<FixedOffset> {
    now.with_timezone(&agency_offset())
}

/// The billing period active at the given instant.
pub fn resolve_period(now: DateTime<Utc>) -> Period {
    Period::containing(to_local(now).date_naive())
}

/// Whether the local calendar day is a cutoff day (the 15th or the last
/// day of the month).
pub fn is_cutoff_day(local_date: NaiveDate) -> bool {
    let day = local_date.day();
    day == 15 || day == days_in_month(local_date)
}

/// Whether early freeze is due: a cutoff day, at or past the early-freeze
/// hour in agency time. Before the hour this reports not-yet-due;
/// exactly-once execution is enforced by closure status, not here.
pub fn is_early_freeze_cutoff(now: DateTime<Utc>) -> bool {
    let local = to_local(now);
    is_cutoff_day(local.date_naive()) && local.hour() >= EARLY_FREEZE_HOUR
}

/// Whether full closure is due: a cutoff day, at or past the closure hour
/// in agency time.
pub fn is_closure_cutoff(now: DateTime<Utc>) -> bool {
    let local = to_local(now);
    is_cutoff_day(local.date_naive()) && local.hour() >= CLOSURE_HOUR
}

fn days_in_month(date: NaiveDate) -> u32 {
    let (year, month) = (date.year(), date.month());
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    first_of_next
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(31)
}
