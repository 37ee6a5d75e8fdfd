//! Command-line argument definitions.

use std::path::PathBuf;

use calrep_core::{InvalidPeriodError, PeriodSelector};
use clap::{Args, Parser, Subcommand};

/// Calendar time reports.
///
/// Summarizes calendar events over a period: time per `@CATEGORY` tag,
/// recurring meetings, and averages per working day.
#[derive(Debug, Parser)]
#[command(name = "calrep", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print a report for a period.
    ///
    /// Without --events the stored snapshot for the period is shown.
    Report {
        #[command(flatten)]
        period: PeriodArgs,

        /// Calendar events export (JSON array, list response or JSONL). Use - for stdin.
        #[arg(long)]
        events: Option<PathBuf>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Compute a period summary and store it, replacing any previous snapshot.
    Store {
        #[command(flatten)]
        period: PeriodArgs,

        /// Calendar events export. Use - for stdin.
        #[arg(long)]
        events: PathBuf,
    },

    /// Print the stored snapshot for a period.
    Show {
        #[command(flatten)]
        period: PeriodArgs,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List stored periods.
    Periods {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Period selection shared by report commands.
#[derive(Debug, Clone, Default, Args)]
pub struct PeriodArgs {
    /// Named period: last-month, current-month, current-year, last-year,
    /// month-N or a month name. Defaults to the current month.
    #[arg(conflicts_with_all = ["from", "to"])]
    pub period: Option<String>,

    /// First day of a custom period (YYYY-MM-DD).
    #[arg(long, requires = "to")]
    pub from: Option<String>,

    /// Last day of a custom period, inclusive (YYYY-MM-DD).
    #[arg(long, requires = "from")]
    pub to: Option<String>,
}

impl PeriodArgs {
    /// Converts the arguments into a selector.
    pub fn selector(&self) -> Result<PeriodSelector, InvalidPeriodError> {
        if let (Some(from), Some(to)) = (&self.from, &self.to) {
            return Ok(PeriodSelector::custom(from.as_str(), to.as_str()));
        }
        match &self.period {
            Some(name) => name.parse(),
            None => Ok(PeriodSelector::CurrentMonth),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn named_period_is_parsed() {
        let cli = Cli::parse_from(["calrep", "report", "last-month", "--json"]);
        let Some(Commands::Report { period, json, events }) = cli.command else {
            panic!("expected report command");
        };
        assert!(json);
        assert!(events.is_none());
        assert_eq!(period.selector().unwrap(), PeriodSelector::LastMonth);
    }

    #[test]
    fn custom_range_is_parsed() {
        let cli = Cli::parse_from(["calrep", "show", "--from", "2024-03-01", "--to", "2024-03-15"]);
        let Some(Commands::Show { period, .. }) = cli.command else {
            panic!("expected show command");
        };
        assert_eq!(
            period.selector().unwrap(),
            PeriodSelector::custom("2024-03-01", "2024-03-15")
        );
    }

    #[test]
    fn missing_period_defaults_to_current_month() {
        assert_eq!(
            PeriodArgs::default().selector().unwrap(),
            PeriodSelector::CurrentMonth
        );
    }

    #[test]
    fn from_without_to_is_rejected() {
        let result = Cli::try_parse_from(["calrep", "report", "--from", "2024-03-01"]);
        assert!(result.is_err());
    }

    #[test]
    fn named_period_conflicts_with_range() {
        let result = Cli::try_parse_from([
            "calrep", "report", "march", "--from", "2024-03-01", "--to", "2024-03-02",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn store_requires_events() {
        assert!(Cli::try_parse_from(["calrep", "store", "march"]).is_err());
    }
}
