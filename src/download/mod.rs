//! Download adapter: one downloader run for one (query, tier) pair.
//!
//! The adapter owns the filesystem side of a run. It snapshots the download
//! directory, invokes the [`Downloader`], diffs the tree, tags new audio with
//! a `.search.txt` sidecar, tidies up after runs that produced nothing and
//! keeps a per-run log of the tool's output.

pub mod cache;
pub mod progress;
pub mod snapshot;
pub mod tool;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cleanup;
use snapshot::DirSnapshot;
pub use tool::{CommandDownloader, CommandTemplate, Downloader, ToolOutput};

/// Directory (inside the download root) holding per-run tool logs.
pub const RUN_LOG_DIR: &str = ".deckready-logs";

/// Suffix of the file recording which query produced a download.
pub const SIDECAR_SUFFIX: &str = ".search.txt";

/// Errors from driving the downloader process.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("downloader {0} pipe was not captured")]
    MissingPipe(&'static str),

    #[error("IO error while running downloader: {0}")]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    /// Whether the program itself is missing (as opposed to failing).
    pub fn is_tool_missing(&self) -> bool {
        matches!(self, Self::Spawn { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Quality level requested from the downloader.
///
/// Declared lowest first so the derived ordering matches audio quality.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum QualityTier {
    Low,
    High,
    Lossless,
    HiResLossless,
}

impl QualityTier {
    /// Tiers tried when none is pinned, best first.
    pub const DEFAULT_LADDER: [QualityTier; 2] = [QualityTier::Lossless, QualityTier::High];

    /// The tiers to try: the pinned tier alone, or the default ladder.
    pub fn ladder(pinned: Option<QualityTier>) -> Vec<QualityTier> {
        match pinned {
            Some(tier) => vec![tier],
            None => Self::DEFAULT_LADDER.to_vec(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::High => "high",
            Self::Lossless => "lossless",
            Self::HiResLossless => "hi-res-lossless",
        }
    }

    /// Numeric quality code understood by qobuz-dl's `-q` flag.
    ///
    /// qobuz-dl has no code below 5; `Low` maps to 4 for downloaders that do.
    pub fn code(self) -> u8 {
        match self {
            Self::Low => 4,
            Self::High => 5,
            Self::Lossless => 6,
            Self::HiResLossless => 7,
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for QualityTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" | "4" => Ok(Self::Low),
            "high" | "mp3" | "320" | "5" => Ok(Self::High),
            "lossless" | "cd" | "6" => Ok(Self::Lossless),
            "hi-res-lossless" | "hi-res" | "hires" | "7" | "27" => Ok(Self::HiResLossless),
            other => Err(format!(
                "unknown quality '{other}' (expected low, high, lossless or hi-res-lossless)"
            )),
        }
    }
}

/// Everything observed during one downloader run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadAttempt {
    pub candidate: String,
    pub tier: QualityTier,
    /// New audio files, sorted
    pub added_files: Vec<PathBuf>,
    pub created_dirs: Vec<PathBuf>,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Tool succeeded without producing anything new
    pub already_downloaded: bool,
    pub command: String,
    pub log_path: Option<PathBuf>,
}

impl DownloadAttempt {
    pub fn has_audio(&self) -> bool {
        !self.added_files.is_empty()
    }

    /// Neither new audio nor an already-downloaded report.
    pub fn failed(&self) -> bool {
        !self.has_audio() && !self.already_downloaded
    }
}

/// Path of the sidecar recording the query that produced `audio`.
pub fn sidecar_path(audio: &Path) -> PathBuf {
    let mut name = audio.as_os_str().to_os_string();
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

/// Runs the downloader against one download directory.
#[derive(Clone)]
pub struct DownloadAdapter {
    downloader: Arc<dyn Downloader>,
    dir: PathBuf,
}

impl DownloadAdapter {
    pub fn new(downloader: Arc<dyn Downloader>, dir: impl Into<PathBuf>) -> Self {
        Self {
            downloader,
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The command a run would execute, without running it.
    pub fn describe(&self, candidate: &str, tier: QualityTier) -> String {
        self.downloader.command_line(candidate, tier, &self.dir)
    }

    /// Run the downloader once and report what landed.
    ///
    /// Never fails: a tool that cannot be started is reported as a failed
    /// attempt with exit code -1 and the error text as stderr.
    pub async fn attempt(&self, candidate: &str, tier: QualityTier) -> DownloadAttempt {
        let command = self.describe(candidate, tier);
        tracing::info!(target: "download", query = candidate, %tier, "running downloader");

        let before = DirSnapshot::take(&self.dir);
        let output = match self.downloader.download(candidate, tier, &self.dir).await {
            Ok(output) => output,
            Err(e) => {
                if e.is_tool_missing() {
                    tracing::error!(target: "download", error = %e, "downloader program is missing");
                } else {
                    tracing::warn!(target: "download", query = candidate, error = %e, "downloader did not run");
                }
                ToolOutput {
                    exit_code: -1,
                    stdout: String::new(),
                    stderr: e.to_string(),
                }
            }
        };
        let after = DirSnapshot::take(&self.dir);

        let added_files = before.added_audio(&after);
        let created_dirs = before.added_dirs(&after);

        for file in &added_files {
            if let Err(e) = std::fs::write(sidecar_path(file), candidate) {
                tracing::warn!(target: "download", path = %file.display(), error = %e, "failed to write search sidecar");
            }
        }

        if added_files.is_empty() {
            cleanup::remove_tmp_files(&before.added_files(&after));
            cleanup::remove_empty_dirs(&created_dirs);
            cleanup::prune_empty_dirs(&self.dir);
        }

        let already_downloaded = output.exit_code == 0 && added_files.is_empty();
        let log_path = if !added_files.is_empty() || output.exit_code != 0 {
            self.write_run_log(candidate, tier, &command, &output)
        } else {
            None
        };

        tracing::debug!(
            target: "download",
            query = candidate,
            %tier,
            exit_code = output.exit_code,
            added = added_files.len(),
            already_downloaded,
            "downloader finished"
        );

        DownloadAttempt {
            candidate: candidate.to_string(),
            tier,
            added_files,
            created_dirs,
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
            already_downloaded,
            command,
            log_path,
        }
    }

    fn write_run_log(
        &self,
        candidate: &str,
        tier: QualityTier,
        command: &str,
        output: &ToolOutput,
    ) -> Option<PathBuf> {
        let log_dir = self.dir.join(RUN_LOG_DIR);
        let name = format!(
            "{}_{}_{}.log",
            chrono::Utc::now().format("%Y%m%dT%H%M%S%.3f"),
            tier.name(),
            safe_file_stem(candidate)
        );
        let path = log_dir.join(name);
        let content = format!(
            "CMD: {command}\nEXIT: {}\n\nSTDOUT:\n{}\n\nSTDERR:\n{}\n",
            output.exit_code, output.stdout, output.stderr
        );

        let written = std::fs::create_dir_all(&log_dir).and_then(|_| std::fs::write(&path, content));
        match written {
            Ok(()) => Some(path),
            Err(e) => {
                tracing::warn!(target: "download", error = %e, "failed to write run log");
                None
            }
        }
    }
}

/// Reduce a query to a short filesystem-safe stem.
fn safe_file_stem(query: &str) -> String {
    query
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .take(120)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeDownloader, Script};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_ladder() {
        assert_eq!(
            QualityTier::ladder(None),
            vec![QualityTier::Lossless, QualityTier::High]
        );
        assert_eq!(
            QualityTier::ladder(Some(QualityTier::HiResLossless)),
            vec![QualityTier::HiResLossless]
        );
    }

    #[test]
    fn test_tier_ordering_and_parsing() {
        assert!(QualityTier::HiResLossless > QualityTier::Lossless);
        assert!(QualityTier::Lossless > QualityTier::High);
        assert!(QualityTier::High > QualityTier::Low);
        assert_eq!("6".parse::<QualityTier>().unwrap(), QualityTier::Lossless);
        assert_eq!("Hi-Res".parse::<QualityTier>().unwrap(), QualityTier::HiResLossless);
        assert!("ultra".parse::<QualityTier>().is_err());
        assert_eq!(QualityTier::High.to_string(), "high");
    }

    #[test]
    fn test_sidecar_path_appends_suffix() {
        assert_eq!(
            sidecar_path(Path::new("/dl/Illuminate.flac")),
            PathBuf::from("/dl/Illuminate.flac.search.txt")
        );
    }

    #[test]
    fn test_safe_file_stem() {
        assert_eq!(safe_file_stem("Cesco \"Big Fi Dem\""), "Cesco__Big_Fi_Dem_");
        assert_eq!(safe_file_stem(&"x".repeat(300)).len(), 120);
    }

    #[tokio::test]
    async fn test_attempt_with_new_audio_writes_sidecar_and_log() {
        let dir = tempdir().unwrap();
        let downloader = Arc::new(FakeDownloader::new(vec![Script::audio(
            "Sub Focus - Torus/Illuminate.flac",
            "Sub Focus",
            "Illuminate",
        )]));
        let adapter = DownloadAdapter::new(downloader.clone(), dir.path());

        let attempt = adapter.attempt("Sub Focus \"Illuminate\"", QualityTier::Lossless).await;

        let file = dir.path().join("Sub Focus - Torus/Illuminate.flac");
        assert_eq!(attempt.added_files, vec![file.clone()]);
        assert_eq!(attempt.created_dirs, vec![dir.path().join("Sub Focus - Torus")]);
        assert!(!attempt.already_downloaded);
        assert!(!attempt.failed());
        assert_eq!(
            fs::read_to_string(sidecar_path(&file)).unwrap(),
            "Sub Focus \"Illuminate\""
        );
        let log = attempt.log_path.expect("run log written");
        assert!(log.starts_with(dir.path().join(RUN_LOG_DIR)));
        assert!(fs::read_to_string(log).unwrap().starts_with("CMD: fake-dl"));
        assert_eq!(downloader.calls(), 1);
    }

    #[tokio::test]
    async fn test_attempt_without_audio_and_exit_zero_is_already_downloaded() {
        let dir = tempdir().unwrap();
        let adapter = DownloadAdapter::new(
            Arc::new(FakeDownloader::new(vec![Script::nothing(0)])),
            dir.path(),
        );

        let attempt = adapter.attempt("q", QualityTier::Lossless).await;
        assert!(attempt.already_downloaded);
        assert!(!attempt.failed());
        assert!(attempt.log_path.is_none());
    }

    #[tokio::test]
    async fn test_failed_attempt_cleans_tmp_files_and_empty_dirs() {
        let dir = tempdir().unwrap();
        let adapter = DownloadAdapter::new(
            Arc::new(FakeDownloader::new(vec![Script::partial("Album/part.flac.tmp", 1)])),
            dir.path(),
        );

        let attempt = adapter.attempt("q", QualityTier::High).await;
        assert!(attempt.failed());
        assert!(!dir.path().join("Album/part.flac.tmp").exists());
        assert!(!dir.path().join("Album").exists());
        assert!(attempt.log_path.is_some());
    }

    #[tokio::test]
    async fn test_spawn_error_becomes_failed_attempt() {
        let dir = tempdir().unwrap();
        let template = CommandTemplate {
            program: "deckready-no-such-tool".to_string(),
            args: vec!["{query}".to_string()],
        };
        let adapter = DownloadAdapter::new(Arc::new(CommandDownloader::new(template)), dir.path());

        let attempt = adapter.attempt("q", QualityTier::High).await;
        assert_eq!(attempt.exit_code, -1);
        assert!(attempt.failed());
        assert!(attempt.stderr.contains("deckready-no-such-tool"));
    }
}
