//! Earlier downloads located through their `.search.txt` sidecars.
//!
//! When the downloader says a track is already downloaded it writes nothing
//! new, so the snapshot diff is empty. The sidecars written next to every
//! earlier download are the only link from a query back to its file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::SIDECAR_SUFFIX;

/// Files recorded for one query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachedDownloads {
    /// Audio files still present
    pub available: Vec<PathBuf>,
    /// Sidecars whose audio file is gone
    pub stale: Vec<PathBuf>,
}

/// Query to cached downloads, built from every sidecar under a directory.
#[derive(Debug, Clone, Default)]
pub struct SidecarIndex {
    entries: HashMap<String, CachedDownloads>,
}

impl SidecarIndex {
    pub fn load(dir: &Path) -> Self {
        let mut entries: HashMap<String, CachedDownloads> = HashMap::new();
        let sidecars = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.file_name().to_string_lossy().ends_with(SIDECAR_SUFFIX));

        for entry in sidecars {
            let Ok(query) = fs::read_to_string(entry.path()) else {
                continue;
            };
            let query = query.trim();
            if query.is_empty() {
                continue;
            }
            let sidecar = entry.path().to_string_lossy();
            let audio = PathBuf::from(&sidecar[..sidecar.len() - SIDECAR_SUFFIX.len()]);

            let cached = entries.entry(query.to_string()).or_default();
            if audio.is_file() {
                cached.available.push(audio);
            } else {
                cached.stale.push(audio);
            }
        }
        Self { entries }
    }

    /// Remove and return what is recorded for exactly this query.
    pub fn take(&mut self, query: &str) -> CachedDownloads {
        self.entries.remove(query.trim()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
