//! Periods command: lists stored snapshots.

use std::io::Write;

use anyhow::{Context, Result};
use calrep_core::Period;
use calrep_db::PeriodStore;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct JsonStoredPeriod<'a> {
    label: &'a str,
    start: String,
    /// Last day, inclusive.
    end: String,
}

/// Writes the stored period list.
pub fn write_periods<W: Write>(writer: &mut W, periods: &[Period], json: bool) -> Result<()> {
    if json {
        let entries: Vec<_> = periods
            .iter()
            .map(|p| JsonStoredPeriod {
                label: &p.label,
                start: p.key.start.to_string(),
                end: p.key.last_day().to_string(),
            })
            .collect();
        writeln!(writer, "{}", serde_json::to_string_pretty(&entries)?)?;
        return Ok(());
    }

    if periods.is_empty() {
        writeln!(writer, "No stored periods.")?;
        writeln!(
            writer,
            "Hint: Run 'calrep store [PERIOD] --events FILE' to save one."
        )?;
        return Ok(());
    }

    writeln!(writer, "{:<12}{:<12}LABEL", "START", "END")?;
    for period in periods {
        writeln!(
            writer,
            "{:<12}{:<12}{}",
            period.key.start.to_string(),
            period.key.last_day().to_string(),
            period.label
        )?;
    }
    Ok(())
}

/// Runs the periods command.
pub fn run<W: Write>(writer: &mut W, store: &PeriodStore, json: bool) -> Result<()> {
    let periods = store
        .list_stored_periods()
        .context("failed to list stored periods")?;
    write_periods(writer, &periods, json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calrep_core::{EngineConfig, PeriodSelector, resolve_period};
    use chrono::NaiveDate;
    use insta::assert_snapshot;

    fn periods() -> Vec<Period> {
        let config = EngineConfig::default();
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        [
            PeriodSelector::CurrentYear,
            PeriodSelector::Month(3),
            PeriodSelector::custom("2024-04-02", "2024-04-02"),
        ]
        .iter()
        .map(|s| resolve_period(s, today, &config).unwrap())
        .collect()
    }

    fn render(periods: &[Period], json: bool) -> String {
        let mut out = Vec::new();
        write_periods(&mut out, periods, json).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn table_output() {
        assert_snapshot!(render(&periods(), false), @r"
        START       END         LABEL
        2024-01-01  2024-12-31  2024
        2024-03-01  2024-03-31  2024-03
        2024-04-02  2024-04-02  2024-04-02 to 2024-04-02
        ");
    }

    #[test]
    fn empty_list_prints_hint() {
        let output = render(&[], false);
        assert!(output.starts_with("No stored periods.\nHint:"));
    }

    #[test]
    fn json_output_uses_inclusive_end() {
        let json: serde_json::Value = serde_json::from_str(&render(&periods(), true)).unwrap();
        assert_eq!(json[1]["label"], "2024-03");
        assert_eq!(json[1]["start"], "2024-03-01");
        assert_eq!(json[1]["end"], "2024-03-31");
    }
}
