//! Half-month billing periods.
//!
//! A period is identified by its start date and half-type. The pair
//! `(period_start, period_type)` is part of the archived-record natural
//! key, so both serialize in a fixed form: ISO `YYYY-MM-DD` and the
//! literal strings `first_half` / `second_half`.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which half of the month a period covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodType {
    FirstHalf,
    SecondHalf,
}

impl PeriodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodType::FirstHalf => "first_half",
            PeriodType::SecondHalf => "second_half",
        }
    }

    pub fn parse(s: &str) -> Option<PeriodType> {
        match s {
            "first_half" => Some(PeriodType::FirstHalf),
            "second_half" => Some(PeriodType::SecondHalf),
            _ => None,
        }
    }
}

impl std::fmt::Display for PeriodType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A half-month billing window, immutable once derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    pub start: NaiveDate,
    pub half: PeriodType,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeriodParseError {
    #[error("invalid period start date: {0}")]
    InvalidStart(String),
    #[error("invalid period type: {0}")]
    InvalidType(String),
    #[error("period start day {0} does not match period type")]
    StartTypeMismatch(u32),
}

impl Period {
    /// The period containing the given civil date.
    ///
    /// Days 1-15 belong to the first half starting on day 1; days 16 to
    /// end-of-month belong to the second half starting on day 16.
    pub fn containing(date: NaiveDate) -> Period {
        if date.day() <= 15 {
            Period {
                start: with_day(date, 1),
                half: PeriodType::FirstHalf,
            }
        } else {
            Period {
                start: with_day(date, 16),
                half: PeriodType::SecondHalf,
            }
        }
    }

    /// Parse the persisted `(period_start, period_type)` pair.
    ///
    /// # Errors
    /// Rejects malformed dates, unknown period types, and start days that
    /// contradict the half-type (the stored key must stay self-consistent).
    pub fn parse(start: &str, half: &str) -> Result<Period, PeriodParseError> {
        let start_date = NaiveDate::parse_from_str(start, "%Y-%m-%d")
            .map_err(|_| PeriodParseError::InvalidStart(start.to_string()))?;
        let half =
            PeriodType::parse(half).ok_or_else(|| PeriodParseError::InvalidType(half.to_string()))?;

        let expected_day = match half {
            PeriodType::FirstHalf => 1,
            PeriodType::SecondHalf => 16,
        };
        if start_date.day() != expected_day {
            return Err(PeriodParseError::StartTypeMismatch(start_date.day()));
        }

        Ok(Period {
            start: start_date,
            half,
        })
    }

    /// ISO date the period starts on, as stored in the database key.
    pub fn start_str(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.start_str(), self.half)
    }
}

fn with_day(date: NaiveDate, day: u32) -> NaiveDate {
    // Day 1 and day 16 exist in every month.
    date.with_day(day).unwrap_or(date)
}
