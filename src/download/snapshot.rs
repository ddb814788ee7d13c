//! Before/after directory snapshots.
//!
//! The downloader names its output however it likes, so the only reliable way
//! to find what a run produced is to walk the tree right before and right
//! after it and diff the two listings.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Extensions the downloader can produce that count as audio.
pub const AUDIO_EXTENSIONS: &[&str] = &["flac", "mp3", "m4a", "wav", "aiff", "aif"];

/// Check if a path has an audio extension.
pub fn is_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.iter().any(|a| e.eq_ignore_ascii_case(a)))
        .unwrap_or(false)
}

/// Every file and directory below a root at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirSnapshot {
    pub files: BTreeSet<PathBuf>,
    pub dirs: BTreeSet<PathBuf>,
}

impl DirSnapshot {
    /// Walk `root`. A missing root is an empty snapshot; unreadable entries
    /// are skipped.
    pub fn take(root: &Path) -> Self {
        let mut snapshot = Self::default();
        for entry in WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_dir() {
                snapshot.dirs.insert(entry.into_path());
            } else {
                snapshot.files.insert(entry.into_path());
            }
        }
        snapshot
    }

    /// Files present in `after` but not in `self`.
    pub fn added_files(&self, after: &DirSnapshot) -> Vec<PathBuf> {
        after.files.difference(&self.files).cloned().collect()
    }

    /// Added files with an audio extension.
    pub fn added_audio(&self, after: &DirSnapshot) -> Vec<PathBuf> {
        self.added_files(after)
            .into_iter()
            .filter(|p| is_audio(p))
            .collect()
    }

    /// Directories present in `after` but not in `self`.
    pub fn added_dirs(&self, after: &DirSnapshot) -> Vec<PathBuf> {
        after.dirs.difference(&self.dirs).cloned().collect()
    }
}
