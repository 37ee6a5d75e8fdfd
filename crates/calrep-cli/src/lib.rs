//! Calendar report CLI library.
//!
//! This crate provides the CLI interface for calendar reports.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, PeriodArgs};
pub use config::Config;
