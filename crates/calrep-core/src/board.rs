//! Category boards for display.
//!
//! Boards regroup a summary's events by category and, inside a category, by
//! subcategory. Events tagged without a subcategory are grouped by the rest of
//! their title (`@ADV Client Call` lands in group `Client Call`). Group names
//! match case-insensitively and display the earliest event's spelling. Boards
//! are derived from the stored event list, so they can be rebuilt from a
//! snapshot.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::category::Categorizer;
use crate::period::Period;
use crate::summary::{EventSpan, PeriodSummary, ms_to_hours};

const UNTITLED: &str = "(untitled)";

/// An event line on a board.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardEvent {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    /// Duration clipped to the period.
    pub hours: f64,
}

/// Events of one subcategory within a category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubcategoryGroup {
    pub name: String,
    pub hours: f64,
    /// Chronological.
    pub events: Vec<BoardEvent>,
}

/// All events of one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBoard {
    pub code: String,
    pub hours: f64,
    /// Ordered by hours descending, then name.
    pub groups: Vec<SubcategoryGroup>,
}

impl CategoryBoard {
    pub fn event_count(&self) -> usize {
        self.groups.iter().map(|g| g.events.len()).sum()
    }
}

/// Boards for every category plus the uncategorized remainder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Boards {
    /// Ordered by hours descending, then code.
    pub categories: Vec<CategoryBoard>,
    /// Ordered by hours descending, then start.
    pub uncategorized: Vec<BoardEvent>,
    pub uncategorized_hours: f64,
}

struct GroupAcc {
    /// Spelling of the first event seen.
    name: String,
    ms: i64,
    events: Vec<(i64, BoardEvent)>,
}

fn board_event(span: &EventSpan, ms: i64) -> BoardEvent {
    BoardEvent {
        title: span.title.clone(),
        start: span.start,
        end: span.end,
        all_day: span.all_day,
        hours: ms_to_hours(ms),
    }
}

/// Builds category boards from a summary's event list.
pub fn build_boards(summary: &PeriodSummary, period: &Period, categorizer: &Categorizer) -> Boards {
    let mut categories: BTreeMap<String, BTreeMap<String, GroupAcc>> = BTreeMap::new();
    let mut uncategorized: Vec<(i64, BoardEvent)> = Vec::new();

    for span in &summary.events {
        let ms = period.clip(span.start, span.end).num_milliseconds();
        let Some(category) = categorizer.categorize(&span.title) else {
            uncategorized.push((ms, board_event(span, ms)));
            continue;
        };

        let name = category.subcategory.unwrap_or_else(|| {
            let rest = categorizer.strip_tag(&span.title);
            if rest.is_empty() {
                UNTITLED.to_string()
            } else {
                rest
            }
        });
        let group = categories
            .entry(category.code)
            .or_default()
            .entry(name.to_lowercase())
            .or_insert_with(|| GroupAcc {
                name,
                ms: 0,
                events: Vec::new(),
            });
        group.ms += ms;
        group.events.push((ms, board_event(span, ms)));
    }

    let mut boards: Vec<(i64, CategoryBoard)> = categories
        .into_iter()
        .map(|(code, groups)| {
            let mut groups: Vec<GroupAcc> = groups.into_values().collect();
            groups.sort_by(|a, b| {
                Reverse(a.ms).cmp(&Reverse(b.ms)).then_with(|| a.name.cmp(&b.name))
            });
            let total_ms: i64 = groups.iter().map(|g| g.ms).sum();
            let groups = groups
                .into_iter()
                .map(|acc| SubcategoryGroup {
                    name: acc.name,
                    hours: ms_to_hours(acc.ms),
                    events: acc.events.into_iter().map(|(_, e)| e).collect(),
                })
                .collect();
            (
                total_ms,
                CategoryBoard {
                    code,
                    hours: ms_to_hours(total_ms),
                    groups,
                },
            )
        })
        .collect();
    boards.sort_by(|(a_ms, a), (b_ms, b)| {
        Reverse(*a_ms)
            .cmp(&Reverse(*b_ms))
            .then_with(|| a.code.cmp(&b.code))
    });

    let uncategorized_ms: i64 = uncategorized.iter().map(|(ms, _)| ms).sum();
    uncategorized.sort_by(|(a_ms, a), (b_ms, b)| {
        Reverse(*a_ms)
            .cmp(&Reverse(*b_ms))
            .then_with(|| a.start.cmp(&b.start))
    });

    Boards {
        categories: boards.into_iter().map(|(_, board)| board).collect(),
        uncategorized: uncategorized.into_iter().map(|(_, e)| e).collect(),
        uncategorized_hours: ms_to_hours(uncategorized_ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::config::EngineConfig;
    use crate::event::{RawEvent, RawEventTime};
    use crate::period::{PeriodSelector, resolve_period};
    use crate::summary::generate_summary;

    fn timed(id: &str, title: &str, start: &str, end: &str) -> RawEvent {
        RawEvent {
            id: Some(id.to_string()),
            summary: Some(title.to_string()),
            start: Some(RawEventTime::date_time(start)),
            end: Some(RawEventTime::date_time(end)),
            ..RawEvent::default()
        }
    }

    fn boards_for(raw: &[RawEvent]) -> (PeriodSummary, Boards) {
        let config = EngineConfig::default();
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let period = resolve_period(&PeriodSelector::Month(3), today, &config).unwrap();
        let categorizer = Categorizer::default();
        let summary = generate_summary(&period, raw, &config, &categorizer).summary;
        let boards = build_boards(&summary, &period, &categorizer);
        (summary, boards)
    }

    #[test]
    fn groups_by_subcategory_or_title_remainder() {
        let raw = vec![
            timed("1", "@ADV Client Call", "2024-03-04T10:00:00Z", "2024-03-04T11:00:00Z"),
            timed("2", "@ADV Client Call", "2024-03-05T10:00:00Z", "2024-03-05T11:00:00Z"),
            timed("3", "@ADV/legal Contract", "2024-03-06T10:00:00Z", "2024-03-06T13:00:00Z"),
            timed("4", "@MKT/social Review", "2024-03-07T10:00:00Z", "2024-03-07T10:30:00Z"),
            timed("5", "@ADV", "2024-03-08T10:00:00Z", "2024-03-08T10:15:00Z"),
        ];

        let (summary, boards) = boards_for(&raw);
        assert_eq!(boards.categories.len(), 2);

        let adv = &boards.categories[0];
        assert_eq!(adv.code, "ADV");
        assert_eq!(adv.hours, 5.25);
        assert_eq!(adv.event_count(), 4);
        assert_eq!(Some(&adv.hours), summary.hours_by_category.get("ADV"));
        let names: Vec<_> = adv.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["legal", "Client Call", "(untitled)"]);
        assert_eq!(adv.groups[1].events.len(), 2);
        assert!(adv.groups[1].events[0].start < adv.groups[1].events[1].start);

        assert_eq!(boards.categories[1].code, "MKT");
        assert_eq!(boards.categories[1].groups[0].name, "social");
    }

    #[test]
    fn subcategory_case_does_not_split_groups() {
        let raw = vec![
            timed("1", "@MKT/social Post", "2024-03-04T09:00:00Z", "2024-03-04T10:00:00Z"),
            timed("2", "@MKT/Social Reel", "2024-03-05T09:00:00Z", "2024-03-05T09:30:00Z"),
            timed("3", "@MKT/SOCIAL Recap", "2024-03-06T09:00:00Z", "2024-03-06T09:30:00Z"),
        ];

        let (_, boards) = boards_for(&raw);
        let mkt = &boards.categories[0];
        assert_eq!(mkt.groups.len(), 1);
        assert_eq!(mkt.groups[0].name, "social");
        assert_eq!(mkt.groups[0].hours, 2.0);
        assert_eq!(mkt.groups[0].events.len(), 3);
    }

    #[test]
    fn uncategorized_sorted_by_duration() {
        let raw = vec![
            timed("1", "Lunch", "2024-03-04T12:00:00Z", "2024-03-04T12:30:00Z"),
            timed("2", "Dentist", "2024-03-05T15:00:00Z", "2024-03-05T17:00:00Z"),
            timed("3", "Coffee", "2024-03-06T09:00:00Z", "2024-03-06T09:30:00Z"),
        ];

        let (summary, boards) = boards_for(&raw);
        assert!(boards.categories.is_empty());
        let titles: Vec<_> = boards.uncategorized.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Dentist", "Lunch", "Coffee"]);
        assert_eq!(boards.uncategorized_hours, summary.uncategorized_hours);
    }
}
