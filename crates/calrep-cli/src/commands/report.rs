//! Report rendering.
//!
//! Implements `calrep report`: a chronological event list, category boards,
//! uncategorized events, recurring series and period totals, as text or JSON.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;

use anyhow::Result;
use calrep_core::{
    BoardEvent, Boards, CategoryBoard, EventSpan, GeneratedSummary, Period, PeriodSummary,
    RecurringGroup, ReportEngine,
};
use calrep_db::StoredPeriodSummary;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use super::input;

/// Where a report's numbers came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportSource {
    /// Computed from an events export just now.
    Events,
    /// Loaded from the period store.
    Stored { stored_at: DateTime<Utc> },
}

/// Everything needed to render a report.
#[derive(Debug)]
pub struct ReportData {
    pub period: Period,
    pub summary: PeriodSummary,
    pub boards: Boards,
    pub timezone: Tz,
    pub tag_marker: char,
    pub source: ReportSource,
    /// Unreadable and malformed record messages, empty for stored snapshots.
    pub issues: Vec<String>,
}

impl ReportData {
    /// Builds report data from a freshly generated summary.
    pub fn fresh(engine: &ReportEngine, period: Period, generated: GeneratedSummary) -> Self {
        let boards = engine.boards(&generated.summary, &period);
        Self {
            boards,
            timezone: engine.config().timezone,
            tag_marker: engine.config().tag.marker,
            source: ReportSource::Events,
            issues: generated.issues.iter().map(ToString::to_string).collect(),
            period,
            summary: generated.summary,
        }
    }

    /// Adds messages for export records that could not be read at all.
    #[must_use]
    pub fn with_rejected(mut self, mut rejected: Vec<String>) -> Self {
        rejected.append(&mut self.issues);
        self.issues = rejected;
        self
    }

    /// Builds report data from a stored snapshot.
    pub fn stored(engine: &ReportEngine, stored: StoredPeriodSummary) -> Self {
        let boards = engine.boards(&stored.summary, &stored.period);
        Self {
            boards,
            timezone: engine.config().timezone,
            tag_marker: engine.config().tag.marker,
            source: ReportSource::Stored {
                stored_at: stored.stored_at,
            },
            issues: Vec::new(),
            period: stored.period,
            summary: stored.summary,
        }
    }
}

// ========== Duration Formatting ==========

/// Converts fractional hours to whole milliseconds.
#[allow(clippy::cast_possible_truncation)]
pub fn hours_to_ms(hours: f64) -> i64 {
    (hours * 3_600_000.0).round() as i64
}

/// Formats milliseconds as `"Xh Ym"`, or `"Ym"` under an hour.
/// Negative durations render as `0m`.
pub fn format_duration(ms: i64) -> String {
    if ms < 0 {
        return "0m".to_string();
    }
    let total_minutes = ms / 60_000;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Formats fractional hours like [`format_duration`].
pub fn format_hours(hours: f64) -> String {
    format_duration(hours_to_ms(hours))
}

/// Generates a 10-character progress bar.
/// Values under 5% of max still get a single block.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn progress_bar(value: i64, max: i64) -> String {
    if max <= 0 {
        return "░░░░░░░░░░".to_string();
    }

    let ratio = value as f64 / max as f64;
    let filled = if ratio < 0.05 && value > 0 {
        1
    } else {
        (ratio * 10.0).round().clamp(0.0, 10.0) as usize
    };

    let empty = 10 - filled;
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}

// ========== Text Output ==========

fn event_when(event: &BoardEvent, tz: Tz) -> String {
    let local = event.start.with_timezone(&tz);
    if event.all_day {
        local.format("%Y-%m-%d").to_string()
    } else {
        local.format("%Y-%m-%d %H:%M").to_string()
    }
}

fn write_header<W: Write>(w: &mut W, data: &ReportData) -> io::Result<()> {
    writeln!(w, "CALENDAR REPORT: {}", data.period.label)?;
    writeln!(
        w,
        "{} to {} ({})",
        data.period.key.start,
        data.period.key.last_day(),
        data.timezone.name()
    )?;
    if let ReportSource::Stored { stored_at } = data.source {
        writeln!(
            w,
            "Stored snapshot from {}",
            stored_at.format("%Y-%m-%d %H:%M UTC")
        )?;
    }
    Ok(())
}

/// Every event in start order, with its duration inside the period.
fn write_events<W: Write>(
    w: &mut W,
    events: &[EventSpan],
    period: &Period,
    tz: Tz,
) -> io::Result<()> {
    writeln!(w)?;
    writeln!(w, "EVENTS")?;
    writeln!(w, "──────")?;
    writeln!(w, "  {:<10}  {:<12}  {:>8}  TITLE", "DATE", "START  END", "DURATION")?;
    for event in events {
        let start = event.start.with_timezone(&tz);
        let times = if event.all_day {
            "all day".to_string()
        } else {
            format!(
                "{}  {}",
                start.format("%H:%M"),
                event.end.with_timezone(&tz).format("%H:%M")
            )
        };
        let ms = period.clip(event.start, event.end).num_milliseconds();
        writeln!(
            w,
            "  {}  {times:<12}  {:>8}  {}",
            start.format("%Y-%m-%d"),
            format_duration(ms),
            event.title
        )?;
    }
    Ok(())
}

fn write_categories<W: Write>(
    w: &mut W,
    categories: &[CategoryBoard],
    tag_marker: char,
    tz: Tz,
) -> io::Result<()> {
    writeln!(w)?;
    writeln!(w, "BY CATEGORY")?;
    writeln!(w, "───────────")?;
    if categories.is_empty() {
        writeln!(w, "(no categorized events)")?;
        return Ok(());
    }

    let max_ms = categories
        .iter()
        .map(|c| hours_to_ms(c.hours))
        .max()
        .unwrap_or(0);
    for (index, board) in categories.iter().enumerate() {
        if index > 0 {
            writeln!(w)?;
        }
        let ms = hours_to_ms(board.hours);
        let tag = format!("{tag_marker}{}", board.code);
        writeln!(
            w,
            "{tag:<32}{:>8}  {}",
            format_duration(ms),
            progress_bar(ms, max_ms)
        )?;
        for group in &board.groups {
            writeln!(w, "  {:<30}{:>8}", group.name, format_hours(group.hours))?;
            for event in &group.events {
                writeln!(w, "    {:<16}  {}", event_when(event, tz), event.title)?;
            }
        }
    }
    Ok(())
}

fn write_uncategorized<W: Write>(w: &mut W, events: &[BoardEvent], tz: Tz) -> io::Result<()> {
    writeln!(w)?;
    writeln!(w, "UNCATEGORIZED")?;
    writeln!(w, "─────────────")?;
    if events.is_empty() {
        writeln!(w, "(none)")?;
        return Ok(());
    }
    for event in events {
        writeln!(
            w,
            "  {:<16}  {:<40}{:>8}",
            event_when(event, tz),
            event.title,
            format_hours(event.hours)
        )?;
    }
    Ok(())
}

fn write_recurring<W: Write>(w: &mut W, groups: &[RecurringGroup]) -> io::Result<()> {
    writeln!(w)?;
    writeln!(w, "RECURRING")?;
    writeln!(w, "─────────")?;
    if groups.is_empty() {
        writeln!(w, "(no recurring events)")?;
        return Ok(());
    }
    for group in groups {
        writeln!(
            w,
            "  {:<36}{:>4}x{:>9}",
            group.series_title,
            group.occurrences,
            format_hours(group.total_hours)
        )?;
    }
    Ok(())
}

fn write_totals<W: Write>(w: &mut W, summary: &PeriodSummary) -> io::Result<()> {
    writeln!(w)?;
    writeln!(w, "SUMMARY")?;
    writeln!(w, "───────")?;
    writeln!(w, "Total time:        {}", format_hours(summary.total_hours))?;
    writeln!(
        w,
        "Categorized:       {}",
        format_hours(summary.categorized_hours())
    )?;
    writeln!(
        w,
        "Uncategorized:     {}",
        format_hours(summary.uncategorized_hours)
    )?;
    writeln!(w, "Calendar days:     {}", summary.calendar_days)?;
    writeln!(w, "Working days:      {}", summary.working_days)?;
    writeln!(
        w,
        "Avg per work day:  {}",
        format_hours(summary.average_hours_per_working_day)
    )?;
    Ok(())
}

/// Writes the human-readable report.
pub fn write_report<W: Write>(w: &mut W, data: &ReportData) -> io::Result<()> {
    write_header(w, data)?;

    if data.summary.events.is_empty() {
        writeln!(w)?;
        writeln!(w, "No events in this period.")?;
    } else {
        write_events(w, &data.summary.events, &data.period, data.timezone)?;
        write_categories(w, &data.boards.categories, data.tag_marker, data.timezone)?;
        write_uncategorized(w, &data.boards.uncategorized, data.timezone)?;
        write_recurring(w, &data.summary.recurring)?;
    }
    write_totals(w, &data.summary)?;

    if !data.issues.is_empty() {
        writeln!(w)?;
        writeln!(
            w,
            "{} malformed record(s) were adjusted or skipped. Run with --verbose for details.",
            data.issues.len()
        )?;
    }
    Ok(())
}

// ========== JSON Output ==========

/// JSON report structure.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub period: JsonPeriod,
    pub timezone: &'static str,
    /// `"events"` or `"stored"`.
    pub source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored_at: Option<String>,
    pub total_hours: f64,
    pub categorized_hours: f64,
    pub uncategorized_hours: f64,
    pub hours_by_category: &'a BTreeMap<String, f64>,
    pub calendar_days: u32,
    pub working_days: u32,
    pub average_hours_per_working_day: f64,
    pub categories: &'a [CategoryBoard],
    pub uncategorized: &'a [BoardEvent],
    pub recurring: &'a [RecurringGroup],
    pub issues: &'a [String],
}

#[derive(Debug, Serialize)]
pub struct JsonPeriod {
    pub label: String,
    pub start: String,
    /// Last day, inclusive.
    pub end: String,
    pub start_at: String,
    pub end_at: String,
}

impl JsonPeriod {
    pub fn new(period: &Period) -> Self {
        Self {
            label: period.label.clone(),
            start: period.key.start.format("%Y-%m-%d").to_string(),
            end: period.key.last_day().format("%Y-%m-%d").to_string(),
            start_at: period.start.to_rfc3339(),
            end_at: period.end.to_rfc3339(),
        }
    }
}

/// Formats report data as JSON.
pub fn format_report_json(data: &ReportData) -> Result<String> {
    let (source, stored_at) = match data.source {
        ReportSource::Events => ("events", None),
        ReportSource::Stored { stored_at } => ("stored", Some(stored_at.to_rfc3339())),
    };
    let summary = &data.summary;
    let report = JsonReport {
        period: JsonPeriod::new(&data.period),
        timezone: data.timezone.name(),
        source,
        stored_at,
        total_hours: summary.total_hours,
        categorized_hours: summary.categorized_hours(),
        uncategorized_hours: summary.uncategorized_hours,
        hours_by_category: &summary.hours_by_category,
        calendar_days: summary.calendar_days,
        working_days: summary.working_days,
        average_hours_per_working_day: summary.average_hours_per_working_day,
        categories: &data.boards.categories,
        uncategorized: &data.boards.uncategorized,
        recurring: &summary.recurring,
        issues: &data.issues,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Writes report data in the requested format.
pub fn render<W: Write>(writer: &mut W, data: &ReportData, json: bool) -> Result<()> {
    if json {
        writeln!(writer, "{}", format_report_json(data)?)?;
    } else {
        write_report(writer, data)?;
    }
    Ok(())
}

// ========== Public Interface ==========

/// Runs the report command against an events export.
pub fn run<W: Write>(
    writer: &mut W,
    engine: &ReportEngine,
    period: Period,
    events: &Path,
    calendars: &[String],
    json: bool,
) -> Result<()> {
    let input = input::load_events(events, calendars)?;
    let generated = engine.generate_summary(&period, &input.events);
    let data = ReportData::fresh(engine, period, generated).with_rejected(input.rejected);
    render(writer, &data, json)
}
