//! The `not-matched` command: turn `not-matched.log` into a follow-up list.

use anyhow::Context;
use std::path::PathBuf;

use crate::config;
use crate::report::logs::{NOT_MATCHED_LOG, parse_not_matched, write_not_matched_outputs};

/// List expected tracks from not-matched.log with search links
pub fn cmd_not_matched(
    dir: Option<&PathBuf>,
    log: Option<&PathBuf>,
    out: Option<&PathBuf>,
) -> anyhow::Result<()> {
    let log_path = match (log, dir) {
        (Some(log), _) => log.clone(),
        (None, Some(dir)) => dir.join(NOT_MATCHED_LOG),
        (None, None) => config::load().downloader.dir.join(NOT_MATCHED_LOG),
    };

    let content = std::fs::read_to_string(&log_path)
        .with_context(|| format!("failed to read {}", log_path.display()))?;
    let items = parse_not_matched(&content);

    if items.is_empty() {
        println!("No mismatches recorded in {}", log_path.display());
        return Ok(());
    }

    println!("{} expected track(s) from {}:\n", items.len(), log_path.display());
    for item in &items {
        println!("{} - {}", item.artist, item.title);
        println!("  {}", item.spotify_search_url());
    }

    if let Some(prefix) = out {
        let (txt, urls) = write_not_matched_outputs(&items, prefix)
            .with_context(|| format!("failed to write outputs for {}", prefix.display()))?;
        println!();
        println!("Wrote {}", txt.display());
        println!("Wrote {}", urls.display());
    }

    Ok(())
}
