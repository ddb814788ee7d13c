//! Command-line interface for deckready.
//!
//! This module provides the `resolve` workflow plus a few inspection
//! commands for tracklists, tools, logs and configuration.

mod commands;

pub use commands::{Cli, Commands, run_command};
