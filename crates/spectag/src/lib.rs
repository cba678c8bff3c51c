//! spectag library - Keep spec excerpts in source comments up to date
//!
//! This library exposes the commands behind the `spectag` binary for testing
//! and embedding purposes. The engine itself lives in `spectag-core`.

pub mod commands;
pub mod config;
pub mod output;

pub use commands::{HistoryListing, ProcessOptions, ProcessOutcome, Project};
pub use config::Config;
pub use output::OutputFormat;
