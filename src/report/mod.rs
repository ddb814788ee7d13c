//! Run summary and per-track report.

pub mod logs;

use std::fmt;

use serde::Serialize;

use crate::normalize::TrackReference;
use crate::resolver::TrackOutcome;

/// Outcome counters for a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub matched: usize,
    pub already: usize,
    pub mismatched: usize,
    pub not_found: usize,
    /// Dry runs only
    pub planned: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &TrackOutcome) {
        match outcome {
            TrackOutcome::Matched { .. } => self.matched += 1,
            TrackOutcome::AlreadyOrganised { .. } => self.already += 1,
            TrackOutcome::Mismatched { .. } => self.mismatched += 1,
            TrackOutcome::NotFound => self.not_found += 1,
            TrackOutcome::Planned { .. } => self.planned += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.matched + self.already + self.mismatched + self.not_found + self.planned
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "matched: {}, already: {}, mismatched: {}, not found: {}",
            self.matched, self.already, self.mismatched, self.not_found
        )?;
        if self.planned > 0 {
            write!(f, ", planned: {}", self.planned)?;
        }
        Ok(())
    }
}

/// One resolved line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackRecord {
    pub line: String,
    pub title: String,
    pub artist: String,
    #[serde(flatten)]
    pub outcome: TrackOutcome,
}

/// Collects outcomes as a run progresses.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReporter {
    summary: RunSummary,
    tracks: Vec<TrackRecord>,
}

impl RunReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, track: &TrackReference, outcome: TrackOutcome) {
        self.summary.record(&outcome);
        self.tracks.push(TrackRecord {
            line: track.raw_line.clone(),
            title: track.title.clone(),
            artist: track.primary_artist.clone(),
            outcome,
        });
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    pub fn tracks(&self) -> &[TrackRecord] {
        &self.tracks
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::InputOrder;
    use crate::validate::MismatchKey;
    use std::path::PathBuf;

    fn track(line: &str) -> TrackReference {
        TrackReference::parse(line, InputOrder::Auto)
    }

    #[test]
    fn test_summary_counts_each_outcome() {
        let mut reporter = RunReporter::new();
        reporter.record(
            &track("Big Fi Dem - Cesco, Sparkz"),
            TrackOutcome::AlreadyOrganised {
                path: PathBuf::from("/lib/Cesco/Big Fi Dem.aiff"),
            },
        );
        reporter.record(
            &track("When I'm On - Virus Syndicate"),
            TrackOutcome::Mismatched {
                key: MismatchKey::from_raw("Rikas", "It's a Beautiful World..."),
            },
        );
        reporter.record(&track("Journey - DJ Hype"), TrackOutcome::NotFound);
        reporter.record(
            &track("Illuminate - Sub Focus"),
            TrackOutcome::Matched {
                files: vec![PathBuf::from("/lib/Sub Focus/Illuminate.aiff")],
            },
        );

        let summary = reporter.summary();
        assert_eq!(
            summary,
            RunSummary {
                matched: 1,
                already: 1,
                mismatched: 1,
                not_found: 1,
                planned: 0,
            }
        );
        assert_eq!(summary.total(), 4);
        assert_eq!(
            summary.to_string(),
            "matched: 1, already: 1, mismatched: 1, not found: 1"
        );
    }

    #[test]
    fn test_json_report_flattens_outcome() {
        let mut reporter = RunReporter::new();
        reporter.record(&track("Journey - DJ Hype"), TrackOutcome::NotFound);

        let json: serde_json::Value = serde_json::from_str(&reporter.to_json().unwrap()).unwrap();
        assert_eq!(json["summary"]["not_found"], 1);
        assert_eq!(json["tracks"][0]["outcome"], "not_found");
        assert_eq!(json["tracks"][0]["artist"], "DJ Hype");
    }
}
