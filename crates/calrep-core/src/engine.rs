//! Report engine facade.

use chrono::NaiveDate;

use crate::board::{Boards, build_boards};
use crate::category::Categorizer;
use crate::config::{ConfigError, EngineConfig};
use crate::event::RawEvent;
use crate::period::{InvalidPeriodError, Period, PeriodSelector, resolve_period};
use crate::summary::{GeneratedSummary, PeriodSummary, generate_summary};

/// Validated configuration plus the compiled tag matcher.
#[derive(Debug, Clone)]
pub struct ReportEngine {
    config: EngineConfig,
    categorizer: Categorizer,
}

impl ReportEngine {
    /// Builds an engine, compiling the tag matcher.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        let categorizer = Categorizer::new(config.tag)?;
        Ok(Self {
            config,
            categorizer,
        })
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub const fn categorizer(&self) -> &Categorizer {
        &self.categorizer
    }

    /// See [`resolve_period`].
    pub fn resolve_period(
        &self,
        selector: &PeriodSelector,
        today: NaiveDate,
    ) -> Result<Period, InvalidPeriodError> {
        resolve_period(selector, today, &self.config)
    }

    /// See [`generate_summary`].
    pub fn generate_summary(&self, period: &Period, raw_events: &[RawEvent]) -> GeneratedSummary {
        generate_summary(period, raw_events, &self.config, &self.categorizer)
    }

    /// See [`build_boards`].
    pub fn boards(&self, summary: &PeriodSummary, period: &Period) -> Boards {
        build_boards(summary, period, &self.categorizer)
    }
}
