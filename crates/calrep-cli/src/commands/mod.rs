//! CLI subcommand implementations.

pub mod input;
pub mod periods;
pub mod report;
pub mod show;
pub mod store;
