//! Raw provider records and their normalization into [`Event`]s.
//!
//! Raw records follow the shape of a Google Calendar `events.list` item, plus a
//! `calendarId` tag added by the API client so multi-calendar exports keep their
//! source.
//!
//! # Safe Defaults
//!
//! One bad record never fails a batch. Problems are reported as
//! [`MalformedEventError`]s alongside the normalized events:
//!
//! | Problem                 | Outcome                              |
//! |-------------------------|--------------------------------------|
//! | missing title           | empty title, not reported            |
//! | missing ID              | synthetic `calendar#index` ID        |
//! | missing/invalid start   | record dropped                       |
//! | missing/invalid end     | zero-length event at start           |
//! | end before start        | end clamped to start                 |

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::EngineConfig;
use crate::period::{local_midnight_to_utc, local_to_utc};
use crate::types::{CalendarId, EventId, SeriesId};

/// Start or end of a raw event: `date` for all-day events, `dateTime` otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEventTime {
    /// `YYYY-MM-DD` for all-day events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// RFC 3339 timestamp for timed events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    /// Provider timezone hint. Not used for conversion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl RawEventTime {
    /// An all-day boundary.
    pub fn date(date: impl Into<String>) -> Self {
        Self {
            date: Some(date.into()),
            ..Self::default()
        }
    }

    /// A timed boundary.
    pub fn date_time(date_time: impl Into<String>) -> Self {
        Self {
            date_time: Some(date_time.into()),
            ..Self::default()
        }
    }
}

/// An event record as supplied by the calendar API client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Event title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// `confirmed`, `tentative` or `cancelled`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<RawEventTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<RawEventTime>,
    /// Series identifier shared by all occurrences of a recurring event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_event_id: Option<String>,
    /// Calendar the record was fetched from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_id: Option<String>,
}

/// A normalized calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    /// Event title; empty when the provider sent none.
    pub title: String,
    pub start: DateTime<Utc>,
    /// Never before `start`.
    pub end: DateTime<Utc>,
    /// All-day events last exactly the configured number of hours.
    pub all_day: bool,
    pub series: Option<SeriesId>,
    pub calendar: CalendarId,
}

impl Event {
    /// Wall-clock duration of the event.
    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }
}

/// What was wrong with a raw record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventProblem {
    #[error("missing id")]
    MissingId,
    #[error("missing start time (record skipped)")]
    MissingStart,
    #[error("unparseable start time {0:?} (record skipped)")]
    InvalidStart(String),
    #[error("missing end time (treated as zero length)")]
    MissingEnd,
    #[error("unparseable end time {0:?} (treated as zero length)")]
    InvalidEnd(String),
    #[error("end before start (clamped to start)")]
    EndBeforeStart,
}

impl EventProblem {
    /// Returns true if the record could not be kept.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::MissingStart | Self::InvalidStart(_))
    }
}

/// A raw record that needed a safe default during normalization.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("malformed event {event_id}: {problem}")]
pub struct MalformedEventError {
    /// Provider ID, or the synthetic ID assigned during normalization.
    pub event_id: String,
    pub problem: EventProblem,
}

/// Output of [`normalize_events`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedEvents {
    /// Events sorted by start, then ID.
    pub events: Vec<Event>,
    /// Problems found in the batch, in input order.
    pub issues: Vec<MalformedEventError>,
}

/// A parsed boundary: the instant it denotes and whether it was a bare date.
///
/// `Err` carries the offending value, or an empty string when neither field
/// was present.
fn parse_boundary(
    raw: &RawEventTime,
    config: &EngineConfig,
) -> Result<(DateTime<Utc>, bool), String> {
    if let Some(value) = raw.date_time.as_deref() {
        let value = value.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Ok((dt.with_timezone(&Utc), false));
        }
        // Offset-less values are local to the configured timezone.
        return NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .and_then(|local| local_to_utc(local, config.timezone))
            .map(|instant| (instant, false))
            .ok_or_else(|| value.to_string());
    }
    if let Some(value) = raw.date.as_deref() {
        return NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
            .ok()
            .and_then(|date| local_midnight_to_utc(date, config.timezone))
            .map(|instant| (instant, true))
            .ok_or_else(|| value.to_string());
    }
    Err(String::new())
}

fn report(issues: &mut Vec<MalformedEventError>, event_id: &str, problem: EventProblem) {
    tracing::warn!(event_id, %problem, "malformed calendar event");
    issues.push(MalformedEventError {
        event_id: event_id.to_string(),
        problem,
    });
}

fn normalize_record(
    index: usize,
    record: &RawEvent,
    config: &EngineConfig,
    issues: &mut Vec<MalformedEventError>,
) -> Option<Event> {
    let calendar = record
        .calendar_id
        .clone()
        .and_then(|id| CalendarId::new(id).ok())
        .unwrap_or_else(CalendarId::primary);

    let id = match record.id.clone().map(EventId::new) {
        Some(Ok(id)) => id,
        _ => {
            let id = EventId::new(format!("{calendar}#{index}")).ok()?;
            report(issues, id.as_str(), EventProblem::MissingId);
            id
        }
    };

    let (start, all_day) = match record.start.as_ref().map(|raw| parse_boundary(raw, config)) {
        Some(Ok(start)) => start,
        Some(Err(value)) if !value.is_empty() => {
            report(issues, id.as_str(), EventProblem::InvalidStart(value));
            return None;
        }
        _ => {
            report(issues, id.as_str(), EventProblem::MissingStart);
            return None;
        }
    };

    let end = if all_day {
        if let Some(end) = start.checked_add_signed(config.all_day_duration()) {
            end
        } else {
            let value = record
                .start
                .as_ref()
                .and_then(|raw| raw.date.clone())
                .unwrap_or_default();
            report(issues, id.as_str(), EventProblem::InvalidEnd(value));
            start
        }
    } else {
        match record.end.as_ref().map(|raw| parse_boundary(raw, config)) {
            Some(Ok((end, _))) => {
                if end < start {
                    report(issues, id.as_str(), EventProblem::EndBeforeStart);
                    start
                } else {
                    end
                }
            }
            Some(Err(value)) if !value.is_empty() => {
                report(issues, id.as_str(), EventProblem::InvalidEnd(value));
                start
            }
            _ => {
                report(issues, id.as_str(), EventProblem::MissingEnd);
                start
            }
        }
    };

    Some(Event {
        id,
        title: record.summary.clone().unwrap_or_default(),
        start,
        end,
        all_day,
        series: record
            .recurring_event_id
            .clone()
            .and_then(|id| SeriesId::new(id).ok()),
        calendar,
    })
}

/// Normalizes raw provider records into events sorted by start time.
pub fn normalize_events(raw: &[RawEvent], config: &EngineConfig) -> NormalizedEvents {
    let mut events = Vec::with_capacity(raw.len());
    let mut issues = Vec::new();

    for (index, record) in raw.iter().enumerate() {
        if record.status.as_deref() == Some("cancelled") {
            tracing::debug!(id = ?record.id, "skipping cancelled event");
            continue;
        }
        if let Some(event) = normalize_record(index, record, config, &mut issues) {
            events.push(event);
        }
    }

    events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
    tracing::debug!(
        records = raw.len(),
        events = events.len(),
        issues = issues.len(),
        "normalized calendar events"
    );

    NormalizedEvents { events, issues }
}
