//! The `resolve` command: tracklist in, organised library out.

use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Runtime;

use crate::config::{self, Config};
use crate::download::{CommandDownloader, Downloader, QualityTier};
use crate::library::{FfmpegConverter, Library, Organiser};
use crate::metadata::{LoftyTagReader, TagReader};
use crate::report::RunReporter;
use crate::report::logs::persist_last_run;
use crate::resolver::{ResolveSettings, Resolver, TrackOutcome};
use crate::tracklist;

use super::ResolveArgs;

/// Where the last run's logs are copied, relative to the working directory
const LAST_RUN_DIR: &str = "logs/last-run";

/// Merge file config and flags; flags win.
pub(crate) fn build_settings(config: &Config, args: &ResolveArgs) -> (ResolveSettings, Library) {
    let settings = ResolveSettings {
        download_dir: args.dir.clone().unwrap_or_else(|| config.downloader.dir.clone()),
        pinned_tier: args.quality.or(config.resolve.quality),
        order: args.order.unwrap_or(config.resolve.order),
        dry_run: args.dry_run,
        organise: config.library.organise && !args.skip_organise,
    };
    let library = Library::new(
        args.library.clone().unwrap_or_else(|| config.library.root.clone()),
        args.layout.unwrap_or(config.library.layout),
    );
    (settings, library)
}

/// Resolve every line of a tracklist
pub fn cmd_resolve(rt: &Runtime, args: &ResolveArgs) -> anyhow::Result<()> {
    let config = config::load();
    let (settings, library) = build_settings(&config, args);

    let lines = tracklist::load(args.file.as_deref()).with_context(|| match &args.file {
        Some(path) => format!("failed to read tracklist {}", path.display()),
        None => "failed to read tracklist from stdin".to_string(),
    })?;

    let tags: Arc<dyn TagReader> = Arc::new(LoftyTagReader);
    let downloader: Arc<dyn Downloader> =
        Arc::new(CommandDownloader::new(config.downloader.template()));
    let converter = Arc::new(FfmpegConverter::new(&config.library.converter));
    let organiser = Organiser::new(library, tags.clone(), converter);

    rt.block_on(async {
        // Missing tools abort before the first track
        if !settings.dry_run {
            require_tool(downloader.ensure_available().await)?;
            if settings.organise {
                require_tool(organiser.ensure_available().await)?;
            }
            std::fs::create_dir_all(&settings.download_dir).with_context(|| {
                format!(
                    "failed to create download directory {}",
                    settings.download_dir.display()
                )
            })?;
        }

        if !args.json {
            println!(
                "Resolving {} track(s) into {} ({} layout)",
                lines.len(),
                organiser.library().root().display(),
                organiser.library().layout()
            );
            println!("Quality: {}", describe_ladder(settings.pinned_tier));
            println!();
        }

        let resolver = Resolver::new(settings, downloader, tags, organiser);
        let mut reporter = RunReporter::new();

        for (i, line) in lines.iter().enumerate() {
            let (track, outcome) = resolver.resolve_line(line).await;
            if !args.json {
                println!("[{}/{}] {}", i + 1, lines.len(), line);
                println!("  {}", describe_outcome(&outcome));
            }
            reporter.record(&track, outcome);
        }

        if args.json {
            println!("{}", reporter.to_json()?);
        } else {
            println!();
            println!("Summary: {}", reporter.summary());
        }

        if !resolver.settings().dry_run {
            let dest = Path::new(LAST_RUN_DIR);
            match persist_last_run(resolver.logs().dir(), dest) {
                Ok(()) => {
                    if !args.json {
                        println!("Logs copied to {}", dest.display());
                    }
                }
                Err(e) => tracing::warn!("Could not copy run logs to {}: {}", dest.display(), e),
            }
        }

        anyhow::Ok(())
    })
}

/// Abort on fatal tool errors; anything else is only logged.
fn require_tool(result: crate::error::Result<()>) -> anyhow::Result<()> {
    match result {
        Err(e) if e.is_fatal() => Err(e.into()),
        Err(e) => {
            tracing::warn!("{}", e);
            Ok(())
        }
        Ok(()) => Ok(()),
    }
}

fn describe_ladder(pinned: Option<QualityTier>) -> String {
    let names: Vec<&str> = QualityTier::ladder(pinned).into_iter().map(|t| t.name()).collect();
    match pinned {
        Some(_) => format!("{} (pinned)", names.join(" -> ")),
        None => names.join(" -> "),
    }
}

fn describe_outcome(outcome: &TrackOutcome) -> String {
    match outcome {
        TrackOutcome::Matched { files } => {
            let names: Vec<String> = files.iter().map(|f| f.display().to_string()).collect();
            format!("✓ matched: {}", names.join(", "))
        }
        TrackOutcome::AlreadyOrganised { path } => {
            format!("✓ already in library: {}", path.display())
        }
        TrackOutcome::Mismatched { key } => {
            format!("✗ mismatch: got {} - {}", key.artist, key.title)
        }
        TrackOutcome::NotFound => "✗ not found".to_string(),
        TrackOutcome::Planned { command, .. } => format!("would run: {command}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::LibraryLayout;
    use crate::normalize::InputOrder;
    use crate::validate::MismatchKey;
    use std::path::PathBuf;

    #[test]
    fn test_flags_override_config() {
        let mut config = Config::default();
        config.downloader.dir = PathBuf::from("/cfg/dl");
        config.library.root = PathBuf::from("/cfg/lib");
        config.resolve.quality = Some(QualityTier::High);

        let args = ResolveArgs {
            dir: Some(PathBuf::from("/flag/dl")),
            layout: Some(LibraryLayout::Flat),
            quality: Some(QualityTier::Lossless),
            order: Some(InputOrder::TitleFirst),
            skip_organise: true,
            ..Default::default()
        };
        let (settings, library) = build_settings(&config, &args);

        assert_eq!(settings.download_dir, PathBuf::from("/flag/dl"));
        assert_eq!(settings.pinned_tier, Some(QualityTier::Lossless));
        assert_eq!(settings.order, InputOrder::TitleFirst);
        assert!(!settings.organise);
        assert_eq!(library.root(), Path::new("/cfg/lib"));
        assert_eq!(library.layout(), LibraryLayout::Flat);
    }

    #[test]
    fn test_config_fills_missing_flags() {
        let mut config = Config::default();
        config.resolve.quality = Some(QualityTier::HiResLossless);
        config.library.organise = false;

        let (settings, library) = build_settings(&config, &ResolveArgs::default());
        assert_eq!(settings.download_dir, config.downloader.dir);
        assert_eq!(settings.pinned_tier, Some(QualityTier::HiResLossless));
        assert!(!settings.organise);
        assert!(!settings.dry_run);
        assert_eq!(library.layout(), LibraryLayout::ByGenre);
    }

    #[test]
    fn test_missing_tool_aborts() {
        let missing = Err(crate::error::Error::tool_unavailable("qobuz-dl", "pip install qobuz-dl"));
        assert!(require_tool(missing).is_err());
        assert!(require_tool(Err(crate::error::Error::organisation("odd probe"))).is_ok());
        assert!(require_tool(Ok(())).is_ok());
    }

    #[test]
    fn test_describe_ladder() {
        assert_eq!(describe_ladder(None), "lossless -> high");
        assert_eq!(describe_ladder(Some(QualityTier::High)), "high (pinned)");
    }

    #[test]
    fn test_describe_mismatch() {
        let outcome = TrackOutcome::Mismatched {
            key: MismatchKey::from_raw("Rikas", "It's a Beautiful World"),
        };
        let text = describe_outcome(&outcome);
        assert!(text.starts_with("✗ mismatch"));
    }
}
