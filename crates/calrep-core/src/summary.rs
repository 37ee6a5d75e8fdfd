//! Period aggregation.
//!
//! Durations are accumulated as integer milliseconds and converted to
//! fractional hours only at the end, which keeps repeated runs bit-identical
//! and `total == categories + uncategorized` exact up to the final conversion.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::category::Categorizer;
use crate::config::{EngineConfig, WorkingWeek};
use crate::event::{Event, MalformedEventError, RawEvent, normalize_events};
use crate::period::{Period, PeriodKey};
use crate::recurring::{RecurringGroup, group_recurring};

/// Converts milliseconds to fractional hours.
#[allow(clippy::cast_precision_loss)]
pub fn ms_to_hours(ms: i64) -> f64 {
    ms as f64 / 3_600_000.0
}

/// The persisted view of an event: title and bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSpan {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
}

impl From<&Event> for EventSpan {
    fn from(event: &Event) -> Self {
        Self {
            title: event.title.clone(),
            start: event.start,
            end: event.end,
            all_day: event.all_day,
        }
    }
}

/// Aggregates for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    /// Sum of all event durations inside the period.
    pub total_hours: f64,
    /// Hours per category code, for categorized events only.
    pub hours_by_category: BTreeMap<String, f64>,
    /// Hours of events without a tag.
    pub uncategorized_hours: f64,
    /// Calendar days in the period.
    pub calendar_days: u32,
    /// Calendar days falling on a configured working weekday.
    pub working_days: u32,
    /// `total_hours / working_days`, or 0 when there are no working days.
    pub average_hours_per_working_day: f64,
    pub recurring: Vec<RecurringGroup>,
    /// Events inside the period, chronological.
    pub events: Vec<EventSpan>,
}

impl PeriodSummary {
    /// Sum of per-category hours.
    pub fn categorized_hours(&self) -> f64 {
        self.hours_by_category.values().sum()
    }
}

/// Output of [`generate_summary`].
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSummary {
    pub summary: PeriodSummary,
    /// Raw records that needed safe defaults.
    pub issues: Vec<MalformedEventError>,
}

/// Counts days in the period that fall on a working weekday.
pub fn count_working_days(key: PeriodKey, week: WorkingWeek) -> u32 {
    let count = key.days().filter(|day| week.contains(day.weekday())).count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Aggregates already-normalized events over a period.
///
/// `events` must be sorted by start; events outside the period are ignored.
pub fn summarize(
    events: &[Event],
    period: &Period,
    config: &EngineConfig,
    categorizer: &Categorizer,
) -> PeriodSummary {
    let mut total_ms: i64 = 0;
    let mut uncategorized_ms: i64 = 0;
    let mut category_ms: BTreeMap<String, i64> = BTreeMap::new();
    let mut spans = Vec::new();

    for event in events {
        if !period.includes(event.start, event.end) {
            continue;
        }
        let ms = period.clip(event.start, event.end).num_milliseconds();
        total_ms += ms;
        match categorizer.categorize(&event.title) {
            Some(category) => *category_ms.entry(category.code).or_default() += ms,
            None => uncategorized_ms += ms,
        }
        spans.push(EventSpan::from(event));
    }

    let recurring = group_recurring(events, period).groups;
    let total_hours = ms_to_hours(total_ms);
    let working_days = count_working_days(period.key, config.working_week);
    let average_hours_per_working_day = if working_days == 0 {
        0.0
    } else {
        total_hours / f64::from(working_days)
    };

    PeriodSummary {
        total_hours,
        hours_by_category: category_ms
            .into_iter()
            .map(|(code, ms)| (code, ms_to_hours(ms)))
            .collect(),
        uncategorized_hours: ms_to_hours(uncategorized_ms),
        calendar_days: u32::try_from(period.key.num_days()).unwrap_or(u32::MAX),
        working_days,
        average_hours_per_working_day,
        recurring,
        events: spans,
    }
}

/// Normalizes raw provider records and aggregates them over a period.
pub fn generate_summary(
    period: &Period,
    raw_events: &[RawEvent],
    config: &EngineConfig,
    categorizer: &Categorizer,
) -> GeneratedSummary {
    let normalized = normalize_events(raw_events, config);
    let summary = summarize(&normalized.events, period, config, categorizer);
    tracing::debug!(
        period = %period.key,
        events = summary.events.len(),
        total_hours = summary.total_hours,
        "generated period summary"
    );
    GeneratedSummary {
        summary,
        issues: normalized.issues,
    }
}
