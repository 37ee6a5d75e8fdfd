use std::io::{self, Write};

use anyhow::{Context, Result};
use calrep_cli::commands::{periods, report, show, store};
use calrep_cli::{Cli, Commands, Config, PeriodArgs};
use calrep_core::{Period, ReportEngine};
use calrep_db::PeriodStore;
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Opens the period store, ensuring the parent directory exists.
fn open_store(config: &Config) -> Result<PeriodStore> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    PeriodStore::open(&config.database_path).context("failed to open period store")
}

/// Resolves the requested period against today's date in the configured timezone.
fn resolve(engine: &ReportEngine, args: &PeriodArgs) -> Result<Period> {
    let today = Utc::now()
        .with_timezone(&engine.config().timezone)
        .date_naive();
    let selector = args.selector().context("invalid period")?;
    let period = engine
        .resolve_period(&selector, today)
        .context("invalid period")?;
    tracing::debug!(period = %period.key, label = %period.label, "resolved period");
    Ok(period)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // try_init: tests may have installed a subscriber already
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    let engine_config = config
        .engine_config()
        .context("invalid configuration")?;
    let engine = ReportEngine::new(engine_config).context("invalid configuration")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::Report {
            period,
            events,
            json,
        } => {
            let period = resolve(&engine, period)?;
            match events {
                Some(path) => {
                    report::run(&mut out, &engine, period, path, &config.calendars, *json)?;
                }
                None => {
                    let store = open_store(&config)?;
                    show::run(&mut out, &engine, &store, &period, *json)?;
                }
            }
        }
        Commands::Store { period, events } => {
            let period = resolve(&engine, period)?;
            let mut store = open_store(&config)?;
            store::run(
                &mut out,
                &engine,
                &mut store,
                &period,
                events,
                &config.calendars,
            )?;
        }
        Commands::Show { period, json } => {
            let period = resolve(&engine, period)?;
            let store = open_store(&config)?;
            show::run(&mut out, &engine, &store, &period, *json)?;
        }
        Commands::Periods { json } => {
            let store = open_store(&config)?;
            periods::run(&mut out, &store, *json)?;
        }
    }

    out.flush()?;
    Ok(())
}
