//! Period resolution.
//!
//! Turns a [`PeriodSelector`] into a concrete [`Period`]: a half-open range of
//! local calendar days `[start, end)` plus the UTC instants of local midnight
//! at both bounds. Adjacent periods therefore never double-count an instant.

use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, Datelike, Duration, LocalResult, Month, NaiveDate, NaiveDateTime, NaiveTime,
    Offset, TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::EngineConfig;

/// Errors raised while resolving a period.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidPeriodError {
    /// A custom range date is not `YYYY-MM-DD`.
    #[error("invalid {field} date: {value:?} (expected YYYY-MM-DD)")]
    MalformedDate { field: &'static str, value: String },
    /// A custom range ends before it starts.
    #[error("period starts after it ends: {start} > {end}")]
    Inverted { start: NaiveDate, end: NaiveDate },
    /// Month numbers run from 1 to 12.
    #[error("invalid month number: {0}")]
    InvalidMonth(u32),
    /// The selector string names no known period.
    #[error("unknown period: {0:?}")]
    UnknownSelector(String),
    /// The resolved range falls outside the supported calendar.
    #[error("period out of supported date range (year {year})")]
    OutOfRange { year: i32 },
}

/// A user period selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeriodSelector {
    /// The calendar month before today's month.
    LastMonth,
    /// Today's calendar month.
    CurrentMonth,
    /// January 1 through December 31 of today's year.
    CurrentYear,
    /// The year before today's year.
    LastYear,
    /// A month (1-12) of the current year.
    Month(u32),
    /// Explicit `YYYY-MM-DD` dates; both days are included.
    Custom { start: String, end: String },
}

impl PeriodSelector {
    /// Builds a custom range selector from raw user input.
    pub fn custom(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self::Custom {
            start: start.into(),
            end: end.into(),
        }
    }
}

impl fmt::Display for PeriodSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LastMonth => write!(f, "last-month"),
            Self::CurrentMonth => write!(f, "current-month"),
            Self::CurrentYear => write!(f, "current-year"),
            Self::LastYear => write!(f, "last-year"),
            Self::Month(month) => write!(f, "month-{month}"),
            Self::Custom { start, end } => write!(f, "{start}..{end}"),
        }
    }
}

impl FromStr for PeriodSelector {
    type Err = InvalidPeriodError;

    /// Parses named selectors: `last-month`, `current-month`, `current-year`,
    /// `last-year`, `month-N`, or a month name (`march`, `mar`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "last-month" => return Ok(Self::LastMonth),
            "current-month" | "this-month" => return Ok(Self::CurrentMonth),
            "current-year" | "this-year" => return Ok(Self::CurrentYear),
            "last-year" => return Ok(Self::LastYear),
            _ => {}
        }

        if let Some(number) = normalized.strip_prefix("month-") {
            let month: u32 = number
                .parse()
                .map_err(|_| InvalidPeriodError::UnknownSelector(s.to_string()))?;
            if !(1..=12).contains(&month) {
                return Err(InvalidPeriodError::InvalidMonth(month));
            }
            return Ok(Self::Month(month));
        }

        normalized
            .parse::<Month>()
            .map(|month| Self::Month(month.number_from_month()))
            .map_err(|_| InvalidPeriodError::UnknownSelector(s.to_string()))
    }
}

/// Stable identity of a period: its first day and the day after its last day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeriodKey {
    /// First day of the period.
    pub start: NaiveDate,
    /// First day after the period (exclusive).
    pub end: NaiveDate,
}

impl PeriodKey {
    /// Last day included in the period.
    pub fn last_day(&self) -> NaiveDate {
        self.end.pred_opt().unwrap_or(self.end)
    }

    /// Number of calendar days in the period.
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Iterates the calendar days of the period.
    pub fn days(self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day < end)
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.last_day())
    }
}

/// A resolved, concrete reporting period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    /// Lookup and persistence identity.
    pub key: PeriodKey,
    /// Human-readable label, e.g. `"last month (2024-02)"` or `"2024-03"`.
    pub label: String,
    /// Local midnight of the first day, in UTC (inclusive).
    pub start: DateTime<Utc>,
    /// Local midnight of the day after the last day, in UTC (exclusive).
    pub end: DateTime<Utc>,
}

impl Period {
    /// Builds a period from its day range, resolving bounds in `tz`.
    ///
    /// Fails when a bound cannot be represented as a UTC instant.
    pub fn new(
        key: PeriodKey,
        label: impl Into<String>,
        tz: Tz,
    ) -> Result<Self, InvalidPeriodError> {
        let bound = |date: NaiveDate| {
            local_midnight_to_utc(date, tz)
                .ok_or(InvalidPeriodError::OutOfRange { year: date.year() })
        };
        Ok(Self {
            key,
            label: label.into(),
            start: bound(key.start)?,
            end: bound(key.end)?,
        })
    }

    /// Returns true if the instant lies inside the period.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }

    /// Returns true if an interval belongs to the period.
    ///
    /// Zero-length intervals belong when their instant is inside.
    pub fn includes(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        if end <= start {
            self.contains(start)
        } else {
            start < self.end && end > self.start
        }
    }

    /// Portion of an interval that falls inside the period.
    pub fn clip(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Duration {
        let clipped_start = start.max(self.start);
        let clipped_end = end.min(self.end);
        if clipped_end > clipped_start {
            clipped_end - clipped_start
        } else {
            Duration::zero()
        }
    }
}

// ========== Local Time Conversion ==========

/// Converts a local wall-clock time in `tz` to UTC.
///
/// Ambiguous times (DST fall-back) pick the earlier instant. Times inside a
/// spring-forward gap are read with the offset in force before the gap, which
/// lands on the first valid instant after it. Returns `None` when the result
/// falls outside the representable range.
pub fn local_to_utc(local: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => Some(dt.with_timezone(&Utc)),
        LocalResult::None => {
            let day_before = local.checked_sub_signed(Duration::days(1))?;
            let before_gap = tz.offset_from_utc_datetime(&day_before).fix();
            let utc = local.checked_sub_signed(Duration::seconds(i64::from(
                before_gap.local_minus_utc(),
            )))?;
            Some(Utc.from_utc_datetime(&utc))
        }
    }
}

/// Converts local midnight of `date` in `tz` to UTC.
pub fn local_midnight_to_utc(date: NaiveDate, tz: Tz) -> Option<DateTime<Utc>> {
    local_to_utc(date.and_time(NaiveTime::MIN), tz)
}

// ========== Period Resolution ==========

fn first_of_month(year: i32, month: u32) -> Result<NaiveDate, InvalidPeriodError> {
    NaiveDate::from_ymd_opt(year, month, 1).ok_or(InvalidPeriodError::OutOfRange { year })
}

/// Calendar month boundaries as a half-open day range.
fn month_key(year: i32, month: u32) -> Result<PeriodKey, InvalidPeriodError> {
    if !(1..=12).contains(&month) {
        return Err(InvalidPeriodError::InvalidMonth(month));
    }
    let start = first_of_month(year, month)?;
    let end = if month == 12 {
        first_of_month(year + 1, 1)?
    } else {
        first_of_month(year, month + 1)?
    };
    Ok(PeriodKey { start, end })
}

/// Calendar year boundaries as a half-open day range.
fn year_key(year: i32) -> Result<PeriodKey, InvalidPeriodError> {
    Ok(PeriodKey {
        start: first_of_month(year, 1)?,
        end: first_of_month(year + 1, 1)?,
    })
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, InvalidPeriodError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        InvalidPeriodError::MalformedDate {
            field,
            value: value.to_string(),
        }
    })
}

/// Custom range with both days included.
fn custom_key(start: &str, end: &str) -> Result<PeriodKey, InvalidPeriodError> {
    let start = parse_date("start", start)?;
    let last_day = parse_date("end", end)?;
    if start > last_day {
        return Err(InvalidPeriodError::Inverted {
            start,
            end: last_day,
        });
    }
    let end = last_day
        .succ_opt()
        .ok_or(InvalidPeriodError::OutOfRange {
            year: last_day.year(),
        })?;
    Ok(PeriodKey { start, end })
}

/// Resolves a selector against `today` into a concrete period.
pub fn resolve_period(
    selector: &PeriodSelector,
    today: NaiveDate,
    config: &EngineConfig,
) -> Result<Period, InvalidPeriodError> {
    let year = today.year();
    let (key, label) = match selector {
        PeriodSelector::LastMonth => {
            let (year, month) = if today.month() == 1 {
                (year - 1, 12)
            } else {
                (year, today.month() - 1)
            };
            let key = month_key(year, month)?;
            (key, format!("last month ({})", key.start.format("%Y-%m")))
        }
        PeriodSelector::CurrentMonth => {
            let key = month_key(year, today.month())?;
            (key, format!("current month ({})", key.start.format("%Y-%m")))
        }
        PeriodSelector::CurrentYear => (year_key(year)?, year.to_string()),
        PeriodSelector::LastYear => (year_key(year - 1)?, (year - 1).to_string()),
        PeriodSelector::Month(month) => {
            let key = month_key(year, *month)?;
            (key, key.start.format("%Y-%m").to_string())
        }
        PeriodSelector::Custom { start, end } => {
            let key = custom_key(start, end)?;
            (key, key.to_string())
        }
    };

    tracing::debug!(%selector, start = %key.start, end = %key.end, "resolved period");
    Period::new(key, label, config.timezone)
}
