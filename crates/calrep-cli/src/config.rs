//! Configuration loading and management.

use std::path::{Path, PathBuf};

use calrep_core::{ConfigError, EngineConfig, TagPattern, WorkingWeek};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Path to the period store.
    pub database_path: PathBuf,

    /// IANA timezone for period boundaries and all-day events.
    pub timezone: String,

    /// Hours counted for each all-day event.
    pub all_day_event_hours: f64,

    /// Calendar IDs whose events are included. Others are ignored.
    pub calendars: Vec<String>,

    /// Working days per week, counted from Monday.
    pub working_days_per_week: u8,

    /// Explicit working weekdays (e.g. `["mon", "tue", "thu"]`).
    /// Overrides `working_days_per_week` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_days: Option<Vec<String>>,

    /// Character introducing a category tag.
    pub tag_marker: char,

    /// Character between a category code and its subcategory.
    pub subcategory_separator: char,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("calrep.db"),
            timezone: system_timezone(),
            all_day_event_hours: 8.0,
            calendars: vec!["primary".to_string()],
            working_days_per_week: 5,
            working_days: None,
            tag_marker: '@',
            subcategory_separator: '/',
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // CALREP_TIMEZONE, CALREP_DATABASE_PATH, ...
        figment = figment.merge(Env::prefixed("CALREP_"));

        figment.extract()
    }

    /// Validates the report settings and builds the engine configuration.
    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let working_week = match &self.working_days {
            Some(names) => WorkingWeek::parse_names(names)?,
            None => WorkingWeek::first_days(self.working_days_per_week)?,
        };
        Ok(EngineConfig {
            timezone: EngineConfig::parse_timezone(&self.timezone)?,
            all_day_hours: EngineConfig::validate_all_day_hours(self.all_day_event_hours)?,
            working_week,
            tag: TagPattern::new(self.tag_marker, self.subcategory_separator)?,
        })
    }
}

fn system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Returns the platform-specific config directory for calrep.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("calrep"))
}

/// Returns the platform-specific data directory for calrep.
///
/// On Linux: `~/.local/share/calrep`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("calrep"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    #[test]
    fn default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("calrep.db"));
        assert_eq!(config.calendars, vec!["primary"]);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r##"
            timezone = "Europe/Berlin"
            all_day_event_hours = 6.5
            calendars = ["primary", "team@example.com"]
            working_days = ["mon", "tue", "wed", "thu"]
            tag_marker = "#"
            "##,
        )
        .unwrap();

        let config = Config::load_from(Some(&path)).unwrap();
        assert_eq!(config.timezone, "Europe/Berlin");
        assert_eq!(config.calendars.len(), 2);
        assert_eq!(config.tag_marker, '#');
        assert_eq!(config.subcategory_separator, '/');

        let engine = config.engine_config().unwrap();
        assert_eq!(engine.timezone, chrono_tz::Europe::Berlin);
        assert!((engine.all_day_hours - 6.5).abs() < f64::EPSILON);
        assert_eq!(engine.working_week.len(), 4);
        assert!(!engine.working_week.contains(Weekday::Fri));
        assert_eq!(engine.tag.marker, '#');
    }

    #[test]
    fn working_days_per_week_counts_from_monday() {
        let config = Config {
            timezone: "UTC".to_string(),
            working_days_per_week: 6,
            ..Config::default()
        };
        let engine = config.engine_config().unwrap();
        assert!(engine.working_week.contains(Weekday::Sat));
        assert!(!engine.working_week.contains(Weekday::Sun));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let base = Config {
            timezone: "UTC".to_string(),
            ..Config::default()
        };

        let bad_tz = Config {
            timezone: "Mars/Olympus".to_string(),
            ..base.clone()
        };
        assert!(matches!(
            bad_tz.engine_config(),
            Err(ConfigError::UnknownTimezone(_))
        ));

        let bad_hours = Config {
            all_day_event_hours: 0.0,
            ..base.clone()
        };
        assert!(matches!(
            bad_hours.engine_config(),
            Err(ConfigError::InvalidAllDayHours(_))
        ));

        let bad_day = Config {
            working_days: Some(vec!["funday".to_string()]),
            ..base
        };
        assert!(matches!(
            bad_day.engine_config(),
            Err(ConfigError::UnknownWeekday(_))
        ));
    }
}
