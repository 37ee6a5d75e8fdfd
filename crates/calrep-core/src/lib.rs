//! Event aggregation and categorization engine for calendar reports.
//!
//! This crate contains the fundamental types and logic for:
//! - Period resolution: named or custom ranges to concrete bounds
//! - Normalization: raw provider records to uniform events
//! - Categorization: title tags such as `@MKT/social`
//! - Aggregation: recurring-series groups, per-category totals, working-day averages

pub mod board;
pub mod category;
pub mod config;
mod engine;
pub mod event;
pub mod period;
pub mod recurring;
pub mod summary;
pub mod types;

pub use board::{BoardEvent, Boards, CategoryBoard, SubcategoryGroup, build_boards};
pub use category::{Categorizer, Category};
pub use config::{ConfigError, EngineConfig, TagPattern, WorkingWeek};
pub use engine::ReportEngine;
pub use event::{
    Event, EventProblem, MalformedEventError, NormalizedEvents, RawEvent, RawEventTime,
    normalize_events,
};
pub use period::{InvalidPeriodError, Period, PeriodKey, PeriodSelector, resolve_period};
pub use recurring::{RecurringGroup, RecurringGrouping, group_recurring};
pub use summary::{
    EventSpan, GeneratedSummary, PeriodSummary, count_working_days, generate_summary, summarize,
};
pub use types::{CalendarId, EventId, SeriesId, ValidationError};
