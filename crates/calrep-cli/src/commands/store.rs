//! Store command: computes a period summary and saves it as a snapshot.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use calrep_core::{Period, RawEvent, ReportEngine};
use calrep_db::PeriodStore;

use super::input;
use super::report::format_hours;

/// Summarizes `raw` over `period` and replaces the stored snapshot.
///
/// `rejected` holds messages for export records that could not be read.
pub fn store_events<W: Write>(
    writer: &mut W,
    engine: &ReportEngine,
    store: &mut PeriodStore,
    period: &Period,
    raw: &[RawEvent],
    rejected: &[String],
) -> Result<()> {
    let generated = engine.generate_summary(period, raw);
    store
        .store_period(period, &generated.summary)
        .context("failed to store period summary")?;

    writeln!(
        writer,
        "Stored {}: {} across {} event(s).",
        period.label,
        format_hours(generated.summary.total_hours),
        generated.summary.events.len()
    )?;
    let issues = rejected.len() + generated.issues.len();
    if issues > 0 {
        writeln!(
            writer,
            "{issues} malformed record(s) were adjusted or skipped. Run with --verbose for details."
        )?;
    }
    Ok(())
}

/// Runs the store command.
pub fn run<W: Write>(
    writer: &mut W,
    engine: &ReportEngine,
    store: &mut PeriodStore,
    period: &Period,
    events: &Path,
    calendars: &[String],
) -> Result<()> {
    let input = input::load_events(events, calendars)?;
    store_events(writer, engine, store, period, &input.events, &input.rejected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calrep_core::{EngineConfig, PeriodSelector, RawEventTime};
    use chrono::NaiveDate;

    #[test]
    fn stores_snapshot_and_reports_totals() {
        let engine = ReportEngine::new(EngineConfig::default()).unwrap();
        let mut store = PeriodStore::open_in_memory().unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let period = engine
            .resolve_period(&PeriodSelector::Month(3), today)
            .unwrap();
        let raw = vec![
            RawEvent {
                id: Some("1".to_string()),
                summary: Some("@MKT Launch".to_string()),
                start: Some(RawEventTime::date_time("2024-03-04T09:00:00Z")),
                end: Some(RawEventTime::date_time("2024-03-04T10:30:00Z")),
                ..RawEvent::default()
            },
            RawEvent {
                id: Some("2".to_string()),
                summary: Some("No end".to_string()),
                start: Some(RawEventTime::date_time("2024-03-05T09:00:00Z")),
                ..RawEvent::default()
            },
        ];

        let mut out = Vec::new();
        let rejected = vec!["unreadable event record 2 (id 42)".to_string()];
        store_events(&mut out, &engine, &mut store, &period, &raw, &rejected).unwrap();
        let output = String::from_utf8(out).unwrap();
        assert!(output.starts_with("Stored 2024-03: 1h 30m across 2 event(s).\n"));
        assert!(output.contains("2 malformed record(s)"));

        let stored = store.retrieve_stored(&period.key).unwrap();
        assert_eq!(stored.summary.hours_by_category.get("MKT"), Some(&1.5));
    }
}
