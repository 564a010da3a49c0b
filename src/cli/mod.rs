//! Command-line interface for pipeforge.
//!
//! Provides commands for running a pipeline over text or a PDF document and
//! for listing the task registry.

mod commands;

pub use commands::{parse_cli, run_with_cli, Cli};
