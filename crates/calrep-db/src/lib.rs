//! Storage layer for period summaries.
//!
//! Persists computed [`PeriodSummary`] snapshots using `rusqlite`, keyed by
//! the period's day range.
//!
//! # Thread Safety
//!
//! [`PeriodStore`] wraps a `rusqlite::Connection`, which is `Send` but not
//! `Sync`. Wrap it in a `Mutex` to share it across threads.
//!
//! # Schema
//!
//! One header row per period in `periods`, keyed by `(start_date, end_date)`
//! where `end_date` is exclusive. Category totals, recurring groups and event
//! spans live in child tables that cascade on delete. Hours are stored as
//! REAL, which round-trips `f64` exactly.
//!
//! Timestamps are stored as RFC 3339 TEXT in UTC with sub-second digits kept
//! when present (e.g. `2024-03-04T09:00:00Z`).

use std::collections::BTreeMap;
use std::path::Path;

use calrep_core::{EventSpan, Period, PeriodKey, PeriodSummary, RecurringGroup, SeriesId};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use tracing::{debug, info};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// No snapshot exists for the requested period.
    #[error("no stored summary for {start} to {end}")]
    NotFound { start: NaiveDate, end: NaiveDate },
    /// A stored timestamp could not be parsed.
    #[error("invalid stored timestamp: {value}")]
    TimestampParse {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored date could not be parsed.
    #[error("invalid stored date: {value}")]
    InvalidDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored row violates a domain constraint.
    #[error("invalid stored record: {message}")]
    InvalidRecord { message: String },
}

impl StoreError {
    fn not_found(key: &PeriodKey) -> Self {
        Self::NotFound {
            start: key.start,
            end: key.last_day(),
        }
    }
}

/// A stored snapshot with its write time.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPeriodSummary {
    pub period: Period,
    pub summary: PeriodSummary,
    pub stored_at: DateTime<Utc>,
}

/// Period snapshot storage backed by `SQLite`.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct PeriodStore {
    conn: Connection,
}

struct HeaderRow {
    label: String,
    start_at: String,
    end_at: String,
    total_hours: f64,
    uncategorized_hours: f64,
    calendar_days: u32,
    working_days: u32,
    average_hours_per_working_day: f64,
    stored_at: String,
}

struct RecurringRow {
    series_id: String,
    series_title: String,
    occurrences: u32,
    total_hours: f64,
}

struct EventRow {
    title: String,
    start_at: String,
    end_at: String,
    all_day: bool,
}

impl PeriodStore {
    /// Opens a store at the given path, creating it if necessary.
    ///
    /// The schema is initialized on first open.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init()?;
        debug!(path = %path.display(), "opened period store");
        Ok(store)
    }

    /// Opens an in-memory store. Contents vanish when it is dropped.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    /// Initializes the schema. Idempotent.
    fn init(&self) -> Result<(), StoreError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            -- start_date inclusive, end_date exclusive, both YYYY-MM-DD
            CREATE TABLE IF NOT EXISTS periods (
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                label TEXT NOT NULL,
                start_at TEXT NOT NULL,
                end_at TEXT NOT NULL,
                total_hours REAL NOT NULL,
                uncategorized_hours REAL NOT NULL,
                calendar_days INTEGER NOT NULL,
                working_days INTEGER NOT NULL,
                average_hours_per_working_day REAL NOT NULL,
                stored_at TEXT NOT NULL,
                PRIMARY KEY (start_date, end_date)
            );

            CREATE TABLE IF NOT EXISTS period_categories (
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                category TEXT NOT NULL,
                hours REAL NOT NULL,
                PRIMARY KEY (start_date, end_date, category),
                FOREIGN KEY (start_date, end_date)
                    REFERENCES periods(start_date, end_date) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS period_recurring (
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                position INTEGER NOT NULL,
                series_id TEXT NOT NULL,
                series_title TEXT NOT NULL,
                occurrences INTEGER NOT NULL,
                total_hours REAL NOT NULL,
                PRIMARY KEY (start_date, end_date, position),
                FOREIGN KEY (start_date, end_date)
                    REFERENCES periods(start_date, end_date) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS period_events (
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                position INTEGER NOT NULL,
                title TEXT NOT NULL,
                start_at TEXT NOT NULL,
                end_at TEXT NOT NULL,
                all_day INTEGER NOT NULL,
                PRIMARY KEY (start_date, end_date, position),
                FOREIGN KEY (start_date, end_date)
                    REFERENCES periods(start_date, end_date) ON DELETE CASCADE
            );
            ",
        )?;
        Ok(())
    }

    /// Stores a snapshot, replacing any previous one for the same period.
    pub fn store_period(
        &mut self,
        period: &Period,
        summary: &PeriodSummary,
    ) -> Result<(), StoreError> {
        self.store_period_at(period, summary, Utc::now())
    }

    /// Stores a snapshot with an explicit write time.
    ///
    /// The old snapshot and its child rows are removed and the new one is
    /// written in a single transaction.
    pub fn store_period_at(
        &mut self,
        period: &Period,
        summary: &PeriodSummary,
        stored_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let (start_date, end_date) = key_columns(&period.key);
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM periods WHERE start_date = ? AND end_date = ?",
            params![start_date, end_date],
        )?;
        tx.execute(
            "
            INSERT INTO periods
            (start_date, end_date, label, start_at, end_at, total_hours, uncategorized_hours,
             calendar_days, working_days, average_hours_per_working_day, stored_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                start_date,
                end_date,
                period.label,
                format_timestamp(period.start),
                format_timestamp(period.end),
                summary.total_hours,
                summary.uncategorized_hours,
                summary.calendar_days,
                summary.working_days,
                summary.average_hours_per_working_day,
                format_timestamp(stored_at),
            ],
        )?;
        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO period_categories (start_date, end_date, category, hours)
                VALUES (?, ?, ?, ?)
                ",
            )?;
            for (category, hours) in &summary.hours_by_category {
                stmt.execute(params![start_date, end_date, category, hours])?;
            }

            let mut stmt = tx.prepare(
                "
                INSERT INTO period_recurring
                (start_date, end_date, position, series_id, series_title, occurrences, total_hours)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ",
            )?;
            for (position, group) in summary.recurring.iter().enumerate() {
                stmt.execute(params![
                    start_date,
                    end_date,
                    position,
                    group.series_id.as_str(),
                    group.series_title,
                    group.occurrences,
                    group.total_hours,
                ])?;
            }

            let mut stmt = tx.prepare(
                "
                INSERT INTO period_events
                (start_date, end_date, position, title, start_at, end_at, all_day)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ",
            )?;
            for (position, event) in summary.events.iter().enumerate() {
                stmt.execute(params![
                    start_date,
                    end_date,
                    position,
                    event.title,
                    format_timestamp(event.start),
                    format_timestamp(event.end),
                    event.all_day,
                ])?;
            }
        }
        tx.commit()?;

        info!(
            period = %period.key,
            categories = summary.hours_by_category.len(),
            events = summary.events.len(),
            "stored period summary"
        );
        Ok(())
    }

    /// Loads the snapshot stored for a period.
    ///
    /// Returns [`StoreError::NotFound`] when nothing was stored for the key.
    pub fn retrieve_stored(&self, key: &PeriodKey) -> Result<StoredPeriodSummary, StoreError> {
        let (start_date, end_date) = key_columns(key);
        let header = self
            .conn
            .query_row(
                "
                SELECT label, start_at, end_at, total_hours, uncategorized_hours,
                       calendar_days, working_days, average_hours_per_working_day, stored_at
                FROM periods
                WHERE start_date = ? AND end_date = ?
                ",
                params![start_date, end_date],
                |row| {
                    Ok(HeaderRow {
                        label: row.get(0)?,
                        start_at: row.get(1)?,
                        end_at: row.get(2)?,
                        total_hours: row.get(3)?,
                        uncategorized_hours: row.get(4)?,
                        calendar_days: row.get(5)?,
                        working_days: row.get(6)?,
                        average_hours_per_working_day: row.get(7)?,
                        stored_at: row.get(8)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found(key))?;

        let mut stmt = self.conn.prepare(
            "
            SELECT category, hours FROM period_categories
            WHERE start_date = ? AND end_date = ?
            ",
        )?;
        let rows = stmt.query_map(params![start_date, end_date], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;
        let mut hours_by_category = BTreeMap::new();
        for row in rows {
            let (category, hours) = row?;
            hours_by_category.insert(category, hours);
        }

        let mut stmt = self.conn.prepare(
            "
            SELECT series_id, series_title, occurrences, total_hours FROM period_recurring
            WHERE start_date = ? AND end_date = ?
            ORDER BY position ASC
            ",
        )?;
        let rows = stmt.query_map(params![start_date, end_date], |row| {
            Ok(RecurringRow {
                series_id: row.get(0)?,
                series_title: row.get(1)?,
                occurrences: row.get(2)?,
                total_hours: row.get(3)?,
            })
        })?;
        let mut recurring = Vec::new();
        for row in rows {
            let row = row?;
            let series_id =
                SeriesId::new(row.series_id).map_err(|err| StoreError::InvalidRecord {
                    message: err.to_string(),
                })?;
            recurring.push(RecurringGroup {
                series_id,
                series_title: row.series_title,
                occurrences: row.occurrences,
                total_hours: row.total_hours,
            });
        }

        let mut stmt = self.conn.prepare(
            "
            SELECT title, start_at, end_at, all_day FROM period_events
            WHERE start_date = ? AND end_date = ?
            ORDER BY position ASC
            ",
        )?;
        let rows = stmt.query_map(params![start_date, end_date], |row| {
            Ok(EventRow {
                title: row.get(0)?,
                start_at: row.get(1)?,
                end_at: row.get(2)?,
                all_day: row.get(3)?,
            })
        })?;
        let mut events = Vec::new();
        for row in rows {
            let row = row?;
            events.push(EventSpan {
                title: row.title,
                start: parse_timestamp(&row.start_at)?,
                end: parse_timestamp(&row.end_at)?,
                all_day: row.all_day,
            });
        }

        let period = Period {
            key: *key,
            label: header.label,
            start: parse_timestamp(&header.start_at)?,
            end: parse_timestamp(&header.end_at)?,
        };
        let summary = PeriodSummary {
            total_hours: header.total_hours,
            hours_by_category,
            uncategorized_hours: header.uncategorized_hours,
            calendar_days: header.calendar_days,
            working_days: header.working_days,
            average_hours_per_working_day: header.average_hours_per_working_day,
            recurring,
            events,
        };
        debug!(period = %key, "loaded stored period summary");

        Ok(StoredPeriodSummary {
            period,
            summary,
            stored_at: parse_timestamp(&header.stored_at)?,
        })
    }

    /// Lists stored periods ordered by start date, then end date.
    pub fn list_stored_periods(&self) -> Result<Vec<Period>, StoreError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT start_date, end_date, label, start_at, end_at
            FROM periods
            ORDER BY start_date ASC, end_date ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut periods = Vec::new();
        for row in rows {
            let (start_date, end_date, label, start_at, end_at) = row?;
            periods.push(Period {
                key: PeriodKey {
                    start: parse_date(&start_date)?,
                    end: parse_date(&end_date)?,
                },
                label,
                start: parse_timestamp(&start_at)?,
                end: parse_timestamp(&end_at)?,
            });
        }
        Ok(periods)
    }

    /// Removes a stored snapshot. Returns true if one existed.
    pub fn delete_period(&mut self, key: &PeriodKey) -> Result<bool, StoreError> {
        let (start_date, end_date) = key_columns(key);
        let deleted = self.conn.execute(
            "DELETE FROM periods WHERE start_date = ? AND end_date = ?",
            params![start_date, end_date],
        )?;
        if deleted > 0 {
            info!(period = %key, "deleted stored period summary");
        }
        Ok(deleted > 0)
    }
}

fn key_columns(key: &PeriodKey) -> (String, String) {
    (
        key.start.format(DATE_FORMAT).to_string(),
        key.end.format(DATE_FORMAT).to_string(),
    )
}

fn parse_date(value: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|source| StoreError::InvalidDate {
        value: value.to_string(),
        source,
    })
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| StoreError::TimestampParse {
            value: value.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
