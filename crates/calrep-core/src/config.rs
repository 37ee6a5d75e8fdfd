//! Engine configuration values.
//!
//! Every component takes its settings from an explicit [`EngineConfig`] rather
//! than process-wide state, so reports are deterministic across timezones and
//! working-week policies.

use std::fmt;

use chrono::{Duration, Weekday};
use chrono_tz::Tz;
use thiserror::Error;

/// Configuration errors raised while building an [`EngineConfig`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// The timezone name is not in the IANA database.
    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),
    /// A working day name could not be parsed.
    #[error("unknown weekday: {0}")]
    UnknownWeekday(String),
    /// Working days per week must be between 0 and 7.
    #[error("working days per week must be between 0 and 7, got {0}")]
    InvalidWorkingDays(u8),
    /// All-day event hours must be a positive, finite number of at most 24.
    #[error("all-day event hours must be in (0, 24], got {0}")]
    InvalidAllDayHours(f64),
    /// Tag marker and separator must be distinct, non-alphanumeric, non-space characters.
    #[error("invalid tag character: {0:?}")]
    InvalidTagCharacter(char),
}

/// The set of weekdays that count as working days.
///
/// Stored as a bitmask indexed by days from Monday.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkingWeek(u8);

impl WorkingWeek {
    /// A week with no working days.
    pub const NONE: Self = Self(0);

    /// Monday through Friday.
    pub const MONDAY_TO_FRIDAY: Self = Self(0b001_1111);

    /// The first `days` weekdays starting from Monday.
    ///
    /// `5` yields Monday–Friday, `6` adds Saturday.
    pub fn first_days(days: u8) -> Result<Self, ConfigError> {
        if days > 7 {
            return Err(ConfigError::InvalidWorkingDays(days));
        }
        let mask = u8::try_from((1u16 << days) - 1)
            .map_err(|_| ConfigError::InvalidWorkingDays(days))?;
        Ok(Self(mask))
    }

    /// Builds a working week from an explicit set of weekdays.
    pub fn from_weekdays(days: impl IntoIterator<Item = Weekday>) -> Self {
        let mask = days
            .into_iter()
            .fold(0u8, |mask, day| mask | (1 << day.num_days_from_monday()));
        Self(mask)
    }

    /// Parses weekday names such as `"mon"` or `"Friday"`.
    pub fn parse_names<S: AsRef<str>>(names: &[S]) -> Result<Self, ConfigError> {
        let days = names
            .iter()
            .map(|name| {
                let name = name.as_ref().trim();
                name.parse::<Weekday>()
                    .map_err(|_| ConfigError::UnknownWeekday(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_weekdays(days))
    }

    /// Returns true if the weekday is a working day.
    pub fn contains(self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    /// Number of working days per week.
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// Returns true if no weekday is a working day.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Working weekdays in Monday-first order.
    pub fn days(self) -> impl Iterator<Item = Weekday> {
        [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ]
        .into_iter()
        .filter(move |day| self.contains(*day))
    }
}

impl Default for WorkingWeek {
    fn default() -> Self {
        Self::MONDAY_TO_FRIDAY
    }
}

impl fmt::Debug for WorkingWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.days()).finish()
    }
}

/// Characters that make up the title tag pattern, e.g. `@MKT/social`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagPattern {
    /// Character introducing a category code. Default: `@`.
    pub marker: char,
    /// Character separating the category code from a subcategory. Default: `/`.
    pub separator: char,
}

impl TagPattern {
    /// Creates a validated tag pattern.
    pub fn new(marker: char, separator: char) -> Result<Self, ConfigError> {
        for c in [marker, separator] {
            if c.is_alphanumeric() || c.is_whitespace() || c == '_' {
                return Err(ConfigError::InvalidTagCharacter(c));
            }
        }
        if marker == separator {
            return Err(ConfigError::InvalidTagCharacter(separator));
        }
        Ok(Self { marker, separator })
    }
}

impl Default for TagPattern {
    fn default() -> Self {
        Self {
            marker: '@',
            separator: '/',
        }
    }
}

/// Configuration for report generation.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Timezone used for period boundaries and all-day events.
    /// Default: UTC.
    pub timezone: Tz,

    /// Hours an all-day event contributes, regardless of its nominal span.
    /// Default: 8.
    pub all_day_hours: f64,

    /// Weekdays counted as working days.
    /// Default: Monday–Friday.
    pub working_week: WorkingWeek,

    /// Title tag characters.
    pub tag: TagPattern,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            all_day_hours: 8.0,
            working_week: WorkingWeek::default(),
            tag: TagPattern::default(),
        }
    }
}

impl EngineConfig {
    /// Parses an IANA timezone name.
    pub fn parse_timezone(name: &str) -> Result<Tz, ConfigError> {
        name.trim()
            .parse::<Tz>()
            .map_err(|_| ConfigError::UnknownTimezone(name.to_string()))
    }

    /// Validates an all-day hours value.
    pub fn validate_all_day_hours(hours: f64) -> Result<f64, ConfigError> {
        if hours.is_finite() && hours > 0.0 && hours <= 24.0 {
            Ok(hours)
        } else {
            Err(ConfigError::InvalidAllDayHours(hours))
        }
    }

    /// Fixed duration of an all-day event.
    #[allow(clippy::cast_possible_truncation)]
    pub fn all_day_duration(&self) -> Duration {
        Duration::milliseconds((self.all_day_hours * 3_600_000.0).round() as i64)
    }
}
