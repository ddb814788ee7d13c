//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `resolve`: resolve a tracklist into the organised library
//! - `inspect`: candidate queries and tool availability
//! - `report`: follow-up lists from `not-matched.log`
//! - `settings`: show or initialise the config file

mod inspect;
mod report;
mod resolve;
mod settings;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tokio::runtime::Runtime;

use crate::download::QualityTier;
use crate::library::LibraryLayout;
use crate::normalize::InputOrder;

pub use inspect::{cmd_check_tools, cmd_queries};
pub use report::cmd_not_matched;
pub use resolve::cmd_resolve;
pub use settings::cmd_config;

/// Resolve "Title - Artist" tracklists into a DJ-ready AIFF library
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Resolve every line of a tracklist
    Resolve(ResolveArgs),
    /// Show how a line is parsed and which queries would be tried
    Queries {
        /// One "Title - Artist" line
        line: String,
        #[arg(long)]
        order: Option<InputOrder>,
    },
    /// Check that the downloader and converter are installed
    CheckTools,
    /// List expected tracks from not-matched.log with search links
    NotMatched {
        /// Download directory holding not-matched.log
        #[arg(long, conflicts_with = "log")]
        dir: Option<PathBuf>,
        /// Explicit log file
        #[arg(long)]
        log: Option<PathBuf>,
        /// Also write <PREFIX>.txt and <PREFIX>.urls.txt
        #[arg(long, value_name = "PREFIX")]
        out: Option<PathBuf>,
    },
    /// Show the effective configuration
    Config {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct ResolveArgs {
    /// Tracklist file (stdin when omitted or `-`)
    pub file: Option<PathBuf>,
    /// Download directory
    #[arg(long, env = "DECKREADY_DOWNLOAD_DIR")]
    pub dir: Option<PathBuf>,
    /// Organised library root
    #[arg(long, env = "DECKREADY_LIBRARY_DIR")]
    pub library: Option<PathBuf>,
    /// flat, by-artist or by-genre
    #[arg(long)]
    pub layout: Option<LibraryLayout>,
    /// Pin one quality tier (disables fallback)
    #[arg(long)]
    pub quality: Option<QualityTier>,
    /// auto, title-first or artist-first
    #[arg(long)]
    pub order: Option<InputOrder>,
    /// Print the first command per track without running anything
    #[arg(long)]
    pub dry_run: bool,
    /// Leave accepted downloads in the download directory
    #[arg(long)]
    pub skip_organise: bool,
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let rt = Runtime::new()?;

    match &cli.command {
        Commands::Resolve(args) => cmd_resolve(&rt, args),
        Commands::Queries { line, order } => cmd_queries(line, order.unwrap_or_default()),
        Commands::CheckTools => cmd_check_tools(&rt),
        Commands::NotMatched { dir, log, out } => {
            cmd_not_matched(dir.as_ref(), log.as_ref(), out.as_ref())
        }
        Commands::Config { init } => cmd_config(*init),
    }
}
