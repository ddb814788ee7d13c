//! Tag-based acceptance of downloaded files.
//!
//! The downloader's "lucky" search regularly returns the wrong song. Every
//! new file is checked against the requested artist and title with a few
//! fuzzy rules; the first file that fails condemns the whole attempt, which
//! is then logged to `not-matched.log` and removed from disk.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;

use crate::cleanup;
use crate::download::DownloadAttempt;
use crate::metadata::{TagMap, TagReader, normalise_tag, normalise_title_base};
use crate::normalize::rules::QUALIFIER_WORD;
use crate::normalize::split_artists;
use crate::report::logs::{NotMatchedEntry, RunLogs};

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[(\[]([^()\[\]]*)[)\]]").expect("bracket pattern is valid"));

/// Normalised identity of a wrong download, used to spot the downloader
/// returning the same wrong song for different queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MismatchKey {
    pub artist: String,
    pub title: String,
}

impl MismatchKey {
    pub fn from_raw(artist: &str, title: &str) -> Self {
        Self {
            artist: normalise_tag(artist),
            title: normalise_tag(title),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Matched,
    Mismatched {
        expected_artist: String,
        expected_title: String,
        found_artist_raw: String,
        found_title_raw: String,
        key: MismatchKey,
    },
    /// The attempt added no audio files
    NoAudio,
}

/// Does `found_artist` (or a remix credit in `found_title`) name the
/// expected artist?
pub fn artist_matches(expected: &str, found_artist: &str, found_title: &str) -> bool {
    let expected_norm = normalise_tag(expected);
    if expected_norm.is_empty() {
        return true;
    }
    if normalise_tag(found_artist) == expected_norm {
        return true;
    }
    if split_artists(found_artist)
        .iter()
        .any(|a| normalise_tag(a) == expected_norm)
    {
        return true;
    }

    let expected_core = normalise_tag(&QUALIFIER_WORD.replace_all(expected, ""));
    BRACKETED
        .captures_iter(found_title)
        .map(|c| c[1].to_string())
        .filter(|group| QUALIFIER_WORD.is_match(group))
        .any(|group| {
            let group = normalise_tag(&group);
            group.contains(&expected_norm)
                || (!expected_core.is_empty() && group.contains(&expected_core))
        })
}

/// Exact or base-title equality after normalisation.
pub fn title_matches(expected: &str, found_title: &str) -> bool {
    let expected_norm = normalise_tag(expected);
    if expected_norm.is_empty() {
        return true;
    }
    if normalise_tag(found_title) == expected_norm {
        return true;
    }
    let expected_base = normalise_title_base(expected);
    let found_base = normalise_title_base(found_title);
    !expected_base.is_empty() && expected_base == found_base
}

/// Checks attempts against the requested track and cleans up rejects.
#[derive(Clone)]
pub struct Validator {
    tags: Arc<dyn TagReader>,
    logs: RunLogs,
    download_dir: PathBuf,
}

impl Validator {
    pub fn new(tags: Arc<dyn TagReader>, logs: RunLogs, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            tags,
            logs,
            download_dir: download_dir.into(),
        }
    }

    pub fn validate(
        &self,
        attempt: &DownloadAttempt,
        expected_artist: &str,
        expected_title: &str,
        query: &str,
    ) -> ValidationOutcome {
        if attempt.added_files.is_empty() {
            return ValidationOutcome::NoAudio;
        }

        for file in &attempt.added_files {
            let tags = self.read_tags(file);
            let (found_artist, found_title) = (tags.artist(), tags.title());

            let ok = artist_matches(expected_artist, found_artist, found_title)
                && title_matches(expected_title, found_title);
            if ok {
                continue;
            }

            tracing::info!(
                target: "validate",
                path = %file.display(),
                expected = %format!("{expected_artist} - {expected_title}"),
                found = %format!("{found_artist} - {found_title}"),
                "download does not match request"
            );

            self.logs.append_not_matched(&NotMatchedEntry::new(
                query,
                expected_artist,
                expected_title,
                found_artist,
                found_title,
            ));
            self.discard(attempt);

            return ValidationOutcome::Mismatched {
                expected_artist: expected_artist.to_string(),
                expected_title: expected_title.to_string(),
                found_artist_raw: found_artist.to_string(),
                found_title_raw: found_title.to_string(),
                key: MismatchKey::from_raw(found_artist, found_title),
            };
        }

        ValidationOutcome::Matched
    }

    /// Unreadable tags count as empty tags.
    fn read_tags(&self, path: &Path) -> TagMap {
        self.tags.read_tags(path).unwrap_or_else(|e| {
            tracing::warn!(target: "validate", path = %path.display(), error = %e, "could not read tags");
            TagMap::new()
        })
    }

    fn discard(&self, attempt: &DownloadAttempt) {
        cleanup::remove_files_with_sidecars(&attempt.added_files);
        cleanup::remove_dirs(&attempt.created_dirs);
        cleanup::prune_empty_dirs(&self.download_dir);
    }
}
