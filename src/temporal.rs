// ⏰ Temporal Model - inclusive day spans over calendar years
//
// A record is active from `date_from` to `date_to`, both days included.
// Two derived figures hang off that range:
// 1. Total days: (date_to - date_from) + 1
// 2. Days per year: how many of those days fall in each calendar year

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// DAY SPAN
// ============================================================================

/// DaySpan - derived temporal statistics of a date range
///
/// Only ever built from two present bounds. Records with a missing bound
/// carry no DaySpan at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySpan {
    /// Inclusive number of days in the range
    #[serde(rename = "totalDays")]
    pub total_days: i64,

    /// Calendar year -> number of days of the range inside that year
    ///
    /// The first and last year are clipped to the actual bounds, every year
    /// in between counts in full (365 or 366 days).
    #[serde(rename = "totalDaysPerYear")]
    pub days_per_year: BTreeMap<i32, i64>,
}

impl DaySpan {
    /// Compute the span between two bounds (both inclusive)
    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        DaySpan {
            total_days: inclusive_days(from, to),
            days_per_year: days_per_year(from, to),
        }
    }

    /// Years touched by the range, in ascending order
    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.days_per_year.keys().copied()
    }

    /// Days of the range that fall in `year` (0 when untouched)
    pub fn days_in(&self, year: i32) -> i64 {
        self.days_per_year.get(&year).copied().unwrap_or(0)
    }
}

/// Inclusive day count between two dates
///
/// A reversed range yields a non-positive count rather than an error.
pub fn inclusive_days(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days() + 1
}

/// Per-year split: the first year starts at `from`, the last ends at `to`
///
/// A range reversed inside one year keeps its single (negative) entry,
/// one reversed across years touches no year at all.
fn days_per_year(from: NaiveDate, to: NaiveDate) -> BTreeMap<i32, i64> {
    let mut per_year = BTreeMap::new();

    for year in from.year()..=to.year() {
        let start = if year == from.year() {
            from
        } else {
            NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(from)
        };
        let end = if year == to.year() {
            to
        } else {
            NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(to)
        };
        per_year.insert(year, inclusive_days(start, end));
    }

    per_year
}

// ============================================================================
// TESTS
// ============================================================================
