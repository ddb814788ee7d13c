//! Per-track resolution: library check, then candidates times quality tiers.
//!
//! ```text
//! CheckingLibrary --hit--> AlreadyOrganised
//!       |
//!       v
//! TryingCandidate(c) --> TryingTier(c, t) --matched--------------> Matched
//!                              |  |  |
//!                              |  |  +--already downloaded------> reuse cache / library
//!                              |  |                               or next candidate
//!                              |  +--mismatch, primary tier-----> Mismatched
//!                              |  +--mismatch, fallback tier----> next candidate
//!                              |                                  (repeat key: Mismatched)
//!                              +--failed--> next tier, else next candidate
//! candidates exhausted --> Mismatched if any mismatch was seen, else NotFound
//! ```
//!
//! Nothing here returns an error: every problem with one track ends up as
//! its [`TrackOutcome`] so the run carries on with the next line.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::download::cache::SidecarIndex;
use crate::download::{DownloadAdapter, DownloadAttempt, Downloader, QualityTier};
use crate::library::Organiser;
use crate::metadata::TagReader;
use crate::normalize::{InputOrder, TrackReference};
use crate::query::build_queries;
use crate::report::logs::RunLogs;
use crate::validate::{MismatchKey, ValidationOutcome, Validator};

/// Effective settings for one run, merged from config file and flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveSettings {
    pub download_dir: PathBuf,
    /// Disables tier fallback when set
    pub pinned_tier: Option<QualityTier>,
    pub order: InputOrder,
    pub dry_run: bool,
    /// File accepted downloads into the library
    pub organise: bool,
}

/// Final state of one track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TrackOutcome {
    Matched { files: Vec<PathBuf> },
    AlreadyOrganised { path: PathBuf },
    Mismatched { key: MismatchKey },
    NotFound,
    /// Dry run: what would have been executed first
    Planned { candidate: String, command: String },
}

/// How a single downloader run turned out.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Verdict {
    Accepted(Vec<PathBuf>),
    AlreadyDownloaded,
    Mismatch(MismatchKey),
    /// Non-zero exit or no audio
    ToolFailure,
}

/// What to do after an attempt.
enum Step {
    Finish(TrackOutcome),
    NextTier,
    NextCandidate,
}

/// Mismatch bookkeeping for one track.
#[derive(Default)]
struct MismatchLedger {
    seen: HashSet<MismatchKey>,
    last: Option<MismatchKey>,
}

impl MismatchLedger {
    /// Record `key`; false when it had already been seen.
    fn record(&mut self, key: MismatchKey) -> bool {
        self.last = Some(key.clone());
        self.seen.insert(key)
    }
}

pub struct Resolver {
    settings: ResolveSettings,
    adapter: DownloadAdapter,
    validator: Validator,
    organiser: Organiser,
    logs: RunLogs,
}

impl Resolver {
    pub fn new(
        settings: ResolveSettings,
        downloader: Arc<dyn Downloader>,
        tags: Arc<dyn TagReader>,
        organiser: Organiser,
    ) -> Self {
        let logs = RunLogs::new(&settings.download_dir);
        Self {
            adapter: DownloadAdapter::new(downloader, &settings.download_dir),
            validator: Validator::new(tags, logs.clone(), &settings.download_dir),
            organiser,
            logs,
            settings,
        }
    }

    pub fn settings(&self) -> &ResolveSettings {
        &self.settings
    }

    pub fn logs(&self) -> &RunLogs {
        &self.logs
    }

    /// Parse `line` with the configured order hint and resolve it.
    pub async fn resolve_line(&self, line: &str) -> (TrackReference, TrackOutcome) {
        let track = TrackReference::parse(line, self.settings.order);
        let outcome = self.resolve(&track).await;
        (track, outcome)
    }

    pub async fn resolve(&self, track: &TrackReference) -> TrackOutcome {
        if let Some(path) = self.find_in_library(track) {
            tracing::info!(target: "resolver", path = %path.display(), "already organised");
            return TrackOutcome::AlreadyOrganised { path };
        }

        let candidates = build_queries(track);
        let ladder = QualityTier::ladder(self.settings.pinned_tier);

        if self.settings.dry_run {
            return match candidates.first() {
                Some(candidate) => TrackOutcome::Planned {
                    command: self.adapter.describe(candidate, ladder[0]),
                    candidate: candidate.clone(),
                },
                None => TrackOutcome::NotFound,
            };
        }

        let mut mismatches = MismatchLedger::default();

        'candidates: for candidate in &candidates {
            for (index, &tier) in ladder.iter().enumerate() {
                let attempt = self.adapter.attempt(candidate, tier).await;
                let verdict = self.judge(&attempt, track);
                let is_primary_tier = index == 0;

                match self.next_step(verdict, candidate, tier, is_primary_tier, track, &mut mismatches).await {
                    Step::Finish(outcome) => return outcome,
                    Step::NextTier => continue,
                    Step::NextCandidate => continue 'candidates,
                }
            }
        }

        match mismatches.last {
            Some(key) => TrackOutcome::Mismatched { key },
            None => {
                tracing::info!(target: "resolver", line = %track.raw_line, "no candidate matched");
                self.logs.append_not_found(&track.raw_line);
                TrackOutcome::NotFound
            }
        }
    }

    fn find_in_library(&self, track: &TrackReference) -> Option<PathBuf> {
        self.organiser
            .library()
            .find_organised(&track.primary_artist, &track.title)
    }

    fn judge(&self, attempt: &DownloadAttempt, track: &TrackReference) -> Verdict {
        if attempt.already_downloaded {
            return Verdict::AlreadyDownloaded;
        }
        if attempt.failed() {
            tracing::info!(
                target: "resolver",
                query = %attempt.candidate,
                tier = %attempt.tier,
                exit_code = attempt.exit_code,
                log = ?attempt.log_path,
                "downloader produced no audio"
            );
            return Verdict::ToolFailure;
        }
        match self.validator.validate(
            attempt,
            &track.primary_artist,
            &track.title,
            &attempt.candidate,
        ) {
            ValidationOutcome::Matched => Verdict::Accepted(attempt.added_files.clone()),
            ValidationOutcome::Mismatched { key, .. } => Verdict::Mismatch(key),
            ValidationOutcome::NoAudio => Verdict::ToolFailure,
        }
    }

    async fn next_step(
        &self,
        verdict: Verdict,
        candidate: &str,
        tier: QualityTier,
        is_primary_tier: bool,
        track: &TrackReference,
        mismatches: &mut MismatchLedger,
    ) -> Step {
        match verdict {
            Verdict::Accepted(files) => {
                tracing::info!(target: "resolver", query = candidate, %tier, "matched");
                Step::Finish(TrackOutcome::Matched {
                    files: self.file_into_library(&files).await,
                })
            }
            Verdict::AlreadyDownloaded => match self.reuse_cached(candidate, track).await {
                Some(path) => Step::Finish(TrackOutcome::AlreadyOrganised { path }),
                None => {
                    tracing::info!(
                        target: "resolver",
                        query = candidate,
                        %tier,
                        "downloader reported already downloaded but no cached file was found"
                    );
                    Step::NextCandidate
                }
            },
            Verdict::Mismatch(key) => {
                let first_time = mismatches.record(key.clone());
                if is_primary_tier || !first_time {
                    Step::Finish(TrackOutcome::Mismatched { key })
                } else {
                    Step::NextCandidate
                }
            }
            Verdict::ToolFailure => Step::NextTier,
        }
    }

    /// Organise accepted files, keeping the download path of any file that
    /// could not be filed.
    async fn file_into_library(&self, files: &[PathBuf]) -> Vec<PathBuf> {
        if !self.settings.organise {
            return files.to_vec();
        }
        let mut placed = Vec::with_capacity(files.len());
        for file in files {
            match self.organiser.organise(file).await {
                Ok(dest) => placed.push(dest),
                Err(e) => {
                    tracing::warn!(target: "resolver", path = %file.display(), error = %e, "could not organise download");
                    placed.push(file.clone());
                }
            }
        }
        placed
    }

    /// After an already-downloaded report: file cached downloads made by the
    /// same query, then look in the library.
    async fn reuse_cached(&self, candidate: &str, track: &TrackReference) -> Option<PathBuf> {
        let cached = SidecarIndex::load(&self.settings.download_dir).take(candidate);
        for stale in &cached.stale {
            tracing::debug!(target: "resolver", path = %stale.display(), "cached search without audio");
        }

        if !cached.available.is_empty() {
            tracing::info!(target: "resolver", query = candidate, count = cached.available.len(), "reusing cached download");
            let placed = self.file_into_library(&cached.available).await;
            return self.find_in_library(track).or_else(|| placed.into_iter().next());
        }

        self.find_in_library(track)
    }
}
