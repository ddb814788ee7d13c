//! Inspection commands: candidate queries and external tool availability.

use tokio::runtime::Runtime;

use crate::config;
use crate::download::{CommandDownloader, Downloader};
use crate::library::{AudioConverter, FfmpegConverter};
use crate::normalize::{InputOrder, TrackReference};
use crate::query::build_queries;

/// Show how a line is parsed and which queries would be tried
pub fn cmd_queries(line: &str, order: InputOrder) -> anyhow::Result<()> {
    let track = TrackReference::parse(line, order);

    println!("Title:          {}", track.title);
    println!("Artists:        {}", track.artists);
    println!("Primary artist: {}", track.primary_artist);
    println!();
    println!("Candidates:");
    for (i, query) in build_queries(&track).iter().enumerate() {
        println!("  {:>2}. {}", i + 1, query);
    }

    Ok(())
}

/// Check that the downloader and converter are installed
pub fn cmd_check_tools(rt: &Runtime) -> anyhow::Result<()> {
    let config = config::load();
    let downloader = CommandDownloader::new(config.downloader.template());
    let converter = FfmpegConverter::new(&config.library.converter);

    println!("Checking external tools...\n");

    let missing = rt.block_on(async {
        let mut missing = 0;
        match downloader.ensure_available().await {
            Ok(()) => println!("✓ downloader: {}", downloader.program()),
            Err(e) => {
                missing += 1;
                println!("✗ downloader: {e}");
            }
        }
        match converter.ensure_available().await {
            Ok(()) => println!("✓ converter: {}", config.library.converter),
            Err(e) => {
                missing += 1;
                println!("✗ converter: {e}");
            }
        }
        missing
    });

    println!();
    if missing == 0 {
        println!("All tools available.");
    } else {
        println!("{missing} tool(s) missing; `resolve --dry-run` still works.");
    }

    Ok(())
}
