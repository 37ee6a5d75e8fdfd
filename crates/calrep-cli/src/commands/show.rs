//! Show command: renders a stored period snapshot.

use std::io::Write;

use anyhow::{Context, Result};
use calrep_core::{Period, ReportEngine};
use calrep_db::{PeriodStore, StoreError, StoredPeriodSummary};

use super::report::{ReportData, render};

/// Loads the snapshot for a period, turning a miss into a hint.
pub fn load(store: &PeriodStore, period: &Period) -> Result<StoredPeriodSummary> {
    match store.retrieve_stored(&period.key) {
        Ok(stored) => Ok(stored),
        Err(err @ StoreError::NotFound { .. }) => Err(anyhow::Error::new(err).context(format!(
            "period {} has not been stored\n\
             Hint: run 'calrep report --events FILE' for a fresh report, \
             or 'calrep store --events FILE' to save one",
            period.label
        ))),
        Err(err) => Err(err).context("failed to load stored summary"),
    }
}

/// Runs the show command.
pub fn run<W: Write>(
    writer: &mut W,
    engine: &ReportEngine,
    store: &PeriodStore,
    period: &Period,
    json: bool,
) -> Result<()> {
    let stored = load(store, period)?;
    let data = ReportData::stored(engine, stored);
    render(writer, &data, json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calrep_core::{EngineConfig, PeriodSelector, RawEvent, RawEventTime};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn setup() -> (ReportEngine, PeriodStore, Period) {
        let engine = ReportEngine::new(EngineConfig::default()).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let period = engine
            .resolve_period(&PeriodSelector::Month(3), today)
            .unwrap();
        (engine, PeriodStore::open_in_memory().unwrap(), period)
    }

    #[test]
    fn missing_snapshot_carries_hint() {
        let (engine, store, period) = setup();
        let mut out = Vec::new();

        let err = run(&mut out, &engine, &store, &period, false).unwrap_err();
        assert!(err.to_string().contains("Hint:"), "{err}");
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::NotFound { .. })
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn stored_snapshot_is_rendered() {
        let (engine, mut store, period) = setup();
        let raw = vec![RawEvent {
            id: Some("1".to_string()),
            summary: Some("@OPS Deploy".to_string()),
            start: Some(RawEventTime::date_time("2024-03-20T10:00:00Z")),
            end: Some(RawEventTime::date_time("2024-03-20T12:00:00Z")),
            ..RawEvent::default()
        }];
        let summary = engine.generate_summary(&period, &raw).summary;
        let stored_at = Utc.with_ymd_and_hms(2024, 4, 2, 7, 30, 0).unwrap();
        store.store_period_at(&period, &summary, stored_at).unwrap();

        let mut out = Vec::new();
        run(&mut out, &engine, &store, &period, false).unwrap();
        let output = String::from_utf8(out).unwrap();
        assert!(output.contains("Stored snapshot from 2024-04-02 07:30 UTC"));
        assert!(output.contains("@OPS"));
        assert!(output.contains("Total time:        2h 0m"));
    }
}
