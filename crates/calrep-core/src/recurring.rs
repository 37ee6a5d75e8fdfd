//! Grouping of recurring-series occurrences.

use std::cmp::Reverse;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::period::Period;
use crate::summary::ms_to_hours;
use crate::types::SeriesId;

/// Occurrences of one recurring series inside a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringGroup {
    pub series_id: SeriesId,
    /// Title of the earliest occurrence in the period.
    pub series_title: String,
    pub occurrences: u32,
    /// Sum of occurrence durations, clipped to the period.
    pub total_hours: f64,
}

/// Output of [`group_recurring`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecurringGrouping<'a> {
    /// Groups ordered by total time descending, then title, then series ID.
    pub groups: Vec<RecurringGroup>,
    /// Events without a series, in input order.
    pub standalone: Vec<&'a Event>,
}

#[derive(Debug)]
struct SeriesTotals<'a> {
    series_id: &'a SeriesId,
    title: &'a str,
    occurrences: u32,
    total_ms: i64,
}

/// Partitions events into recurring groups and standalone events.
///
/// Events outside the period are ignored. Occurrences straddling a boundary
/// are clipped rather than dropped, so group totals agree with the period
/// totals.
pub fn group_recurring<'a>(events: &'a [Event], period: &Period) -> RecurringGrouping<'a> {
    let mut by_series: HashMap<&SeriesId, SeriesTotals<'a>> = HashMap::new();
    let mut standalone = Vec::new();

    for event in events {
        if !period.includes(event.start, event.end) {
            continue;
        }
        let Some(series_id) = event.series.as_ref() else {
            standalone.push(event);
            continue;
        };

        let clipped_ms = period.clip(event.start, event.end).num_milliseconds();
        let totals = by_series.entry(series_id).or_insert_with(|| SeriesTotals {
            series_id,
            title: &event.title,
            occurrences: 0,
            total_ms: 0,
        });
        totals.occurrences = totals.occurrences.saturating_add(1);
        totals.total_ms += clipped_ms;
    }

    let mut totals: Vec<_> = by_series.into_values().collect();
    totals.sort_by(|a, b| {
        Reverse(a.total_ms)
            .cmp(&Reverse(b.total_ms))
            .then_with(|| a.title.cmp(b.title))
            .then_with(|| a.series_id.cmp(b.series_id))
    });

    let groups = totals
        .into_iter()
        .map(|t| RecurringGroup {
            series_id: t.series_id.clone(),
            series_title: t.title.to_string(),
            occurrences: t.occurrences,
            total_hours: ms_to_hours(t.total_ms),
        })
        .collect();

    RecurringGrouping { groups, standalone }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    use crate::period::PeriodKey;
    use crate::types::{CalendarId, EventId};

    fn march_2024() -> Period {
        Period::new(
            PeriodKey {
                start: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            },
            "2024-03",
            chrono_tz::Tz::UTC,
        )
        .unwrap()
    }

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, minute, 0).unwrap()
    }

    fn event(
        id: &str,
        title: &str,
        series: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Event {
        Event {
            id: EventId::new(id).unwrap(),
            title: title.to_string(),
            start,
            end,
            all_day: false,
            series: series.map(|s| SeriesId::new(s).unwrap()),
            calendar: CalendarId::primary(),
        }
    }

    #[test]
    fn two_occurrences_form_one_group() {
        let events = vec![
            event("s1-a", "Standup", Some("S1"), at(4, 9, 0), at(4, 10, 0)),
            event("s1-b", "Standup", Some("S1"), at(5, 9, 0), at(5, 10, 30)),
        ];

        let grouping = group_recurring(&events, &march_2024());
        assert_eq!(
            grouping.groups,
            vec![RecurringGroup {
                series_id: SeriesId::new("S1").unwrap(),
                series_title: "Standup".to_string(),
                occurrences: 2,
                total_hours: 2.5,
            }]
        );
        assert!(grouping.standalone.is_empty());
    }

    #[test]
    fn events_without_series_are_standalone() {
        let events = vec![
            event("one-off", "Dentist", None, at(4, 9, 0), at(4, 10, 0)),
            event("s1-a", "Standup", Some("S1"), at(4, 11, 0), at(4, 11, 15)),
        ];

        let grouping = group_recurring(&events, &march_2024());
        assert_eq!(grouping.groups.len(), 1);
        assert_eq!(grouping.standalone.len(), 1);
        assert_eq!(grouping.standalone[0].title, "Dentist");
    }

    #[test]
    fn occurrences_straddling_boundary_are_clipped() {
        let period = march_2024();
        let events = vec![
            event(
                "s2-a",
                "Night shift",
                Some("S2"),
                Utc.with_ymd_and_hms(2024, 2, 29, 22, 0, 0).unwrap(),
                at(1, 2, 0),
            ),
            event(
                "s2-outside",
                "Night shift",
                Some("S2"),
                Utc.with_ymd_and_hms(2024, 2, 28, 22, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 2, 29, 2, 0, 0).unwrap(),
            ),
        ];

        let grouping = group_recurring(&events, &period);
        assert_eq!(grouping.groups[0].occurrences, 1);
        assert!((grouping.groups[0].total_hours - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn groups_sorted_by_total_then_title() {
        let events = vec![
            event("b1", "Beta", Some("B"), at(4, 9, 0), at(4, 10, 0)),
            event("a1", "Alpha", Some("A"), at(4, 11, 0), at(4, 12, 0)),
            event("c1", "Gamma", Some("C"), at(4, 13, 0), at(4, 16, 0)),
        ];

        let grouping = group_recurring(&events, &march_2024());
        let titles: Vec<_> = grouping
            .groups
            .iter()
            .map(|g| g.series_title.as_str())
            .collect();
        assert_eq!(titles, vec!["Gamma", "Alpha", "Beta"]);
    }

    #[test]
    fn series_title_comes_from_earliest_occurrence() {
        let events = vec![
            event("r1", "Retro", Some("R"), at(4, 9, 0), at(4, 10, 0)),
            event("r2", "Retro (moved)", Some("R"), at(11, 9, 0), at(11, 10, 0)),
        ];

        let grouping = group_recurring(&events, &march_2024());
        assert_eq!(grouping.groups[0].series_title, "Retro");
        assert_eq!(grouping.groups[0].occurrences, 2);
    }
}
