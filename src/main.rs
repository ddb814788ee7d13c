//! deckready - resolve "Title - Artist" tracklists into a DJ-ready library.
//!
//! Each line is normalised into search candidates, fetched with an external
//! downloader across quality tiers, validated against the file's own tags and
//! filed into an organised AIFF library. Wrong downloads are removed and
//! recorded in `not-matched.log`; lines nothing was found for go to
//! `not-found.log`.

pub mod cleanup;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod library;
pub mod metadata;
pub mod normalize;
pub mod query;
pub mod report;
pub mod resolver;
#[cfg(test)]
pub mod test_utils;
pub mod tracklist;
pub mod validate;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Log targets used across the crate besides the crate path itself
const LOG_TARGETS: [&str; 6] = ["deckready", "resolver", "download", "validate", "library", "cleanup"];

fn default_filter(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging; RUST_LOG wins when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(args.verbose)));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();

    cli::run_command(&args)
}
