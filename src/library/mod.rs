//! The organised AIFF library: where accepted downloads end up, and the
//! lookup that lets a re-run skip tracks it already has.
//!
//! Three layouts are supported:
//!
//! ```text
//! flat       <root>/<Artist> - <Title>.aiff
//! by-artist  <root>/<Artist>/<Title>.aiff
//! by-genre   <root>/<Genre>/<Artist>/<Title>.aiff
//! ```
//!
//! Name collisions get a `" (N)"` suffix starting at 1.

pub mod convert;
pub mod names;
pub mod organise;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::normalize::rules::QUALIFIER_WORD;
use crate::normalize::split_artists;
use names::sanitize_name;

pub use convert::{AudioConverter, FfmpegConverter};
pub use organise::Organiser;

pub const LIBRARY_EXTENSION: &str = "aiff";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LibraryLayout {
    Flat,
    ByArtist,
    #[default]
    ByGenre,
}

impl fmt::Display for LibraryLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Flat => "flat",
            Self::ByArtist => "by-artist",
            Self::ByGenre => "by-genre",
        })
    }
}

impl FromStr for LibraryLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flat" => Ok(Self::Flat),
            "by-artist" | "artist" => Ok(Self::ByArtist),
            "by-genre" | "genre" => Ok(Self::ByGenre),
            other => Err(format!(
                "unknown layout '{other}' (expected flat, by-artist or by-genre)"
            )),
        }
    }
}

/// An organised library root with its layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library {
    root: PathBuf,
    layout: LibraryLayout,
}

impl Library {
    pub fn new(root: impl Into<PathBuf>, layout: LibraryLayout) -> Self {
        Self {
            root: root.into(),
            layout,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layout(&self) -> LibraryLayout {
        self.layout
    }

    /// Find an already-organised file for `artist` / `title`.
    ///
    /// Looks at `"<Artists> - <Title>.aiff"` in the root, plain
    /// `"<Title>.aiff"` in the root when the layout is flat or no artist is
    /// known, and inside matching artist directories for the nested layouts.
    pub fn find_organised(&self, artist: &str, title: &str) -> Option<PathBuf> {
        if title.trim().is_empty() {
            return None;
        }
        let title = sanitize_name(title);
        let artist = artist.trim();
        let artist = (!artist.is_empty()).then(|| sanitize_name(artist));

        let allow_bare_title = self.layout == LibraryLayout::Flat || artist.is_none();
        if let Some(hit) = find_in_dir(&self.root, artist.as_deref(), &title, allow_bare_title) {
            return Some(hit);
        }

        let artist = artist?;
        let artist_dirs: Vec<PathBuf> = match self.layout {
            LibraryLayout::Flat => Vec::new(),
            LibraryLayout::ByArtist => matching_artist_dirs(&self.root, &artist),
            LibraryLayout::ByGenre => sorted_dirs(&self.root)
                .iter()
                .flat_map(|genre| matching_artist_dirs(genre, &artist))
                .collect(),
        };

        artist_dirs
            .iter()
            .find_map(|dir| find_in_dir(dir, Some(&artist), &title, true))
    }
}

fn sorted_entries(dir: &Path) -> Vec<fs::DirEntry> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut entries: Vec<_> = entries.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.file_name());
    entries
}

fn sorted_dirs(dir: &Path) -> Vec<PathBuf> {
    sorted_entries(dir)
        .into_iter()
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|e| e.path())
        .collect()
}

fn matching_artist_dirs(parent: &Path, artist: &str) -> Vec<PathBuf> {
    sorted_dirs(parent)
        .into_iter()
        .filter(|d| {
            d.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| artist_prefix_matches(name, artist))
        })
        .collect()
}

fn find_in_dir(dir: &Path, artist: Option<&str>, title: &str, allow_bare_title: bool) -> Option<PathBuf> {
    sorted_entries(dir)
        .into_iter()
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.path())
        .find(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| file_name_matches(name, artist, title, allow_bare_title))
        })
}

/// Does a library file name stand for this artist and title?
fn file_name_matches(name: &str, artist: Option<&str>, title: &str, allow_bare_title: bool) -> bool {
    let Some(stem) = strip_extension(name) else {
        return false;
    };
    let stem = strip_copy_suffix(stem);

    if let Some(artist) = artist
        && let Some((artists_part, title_part)) = stem.split_once(" - ")
        && artist_prefix_matches(artists_part, artist)
        && title_part_matches(title_part, title)
    {
        return true;
    }
    allow_bare_title && title_part_matches(stem, title)
}

fn strip_extension(name: &str) -> Option<&str> {
    let (stem, ext) = name.rsplit_once('.')?;
    ext.eq_ignore_ascii_case(LIBRARY_EXTENSION).then_some(stem)
}

/// Remove a trailing `" (N)"` collision suffix.
fn strip_copy_suffix(stem: &str) -> &str {
    static COPY_SUFFIX: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r" \(\d+\)$").expect("copy suffix pattern is valid"));
    match COPY_SUFFIX.find(stem) {
        Some(m) => &stem[..m.start()],
        None => stem,
    }
}

/// The first artist of a possibly multi-artist name equals `artist`.
fn artist_prefix_matches(name: &str, artist: &str) -> bool {
    let artist = artist.to_lowercase();
    name.to_lowercase() == artist
        || split_artists(name)
            .first()
            .is_some_and(|first| first.to_lowercase() == artist)
}

/// Exact title, or the title followed by a remix/version qualifier.
fn title_part_matches(candidate: &str, title: &str) -> bool {
    static LEADING_QUALIFIER: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^\s*[(\[]([^()\[\]]*)[)\]]").expect("qualifier pattern is valid"));

    let candidate = candidate.to_lowercase();
    let title = title.to_lowercase();
    if candidate == title {
        return true;
    }
    let Some(rest) = candidate.strip_prefix(&title) else {
        return false;
    };
    LEADING_QUALIFIER
        .captures(rest)
        .is_some_and(|c| QUALIFIER_WORD.is_match(&c[1]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"aiff").unwrap();
    }

    #[test]
    fn test_layout_parsing() {
        assert_eq!("by-genre".parse::<LibraryLayout>().unwrap(), LibraryLayout::ByGenre);
        assert_eq!("Flat".parse::<LibraryLayout>().unwrap(), LibraryLayout::Flat);
        assert!("tree".parse::<LibraryLayout>().is_err());
        assert_eq!(LibraryLayout::ByArtist.to_string(), "by-artist");
    }

    #[test]
    fn test_flat_artist_title() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("Sub Focus - Illuminate.aiff"));
        let library = Library::new(dir.path(), LibraryLayout::Flat);

        assert_eq!(
            library.find_organised("sub focus", "ILLUMINATE"),
            Some(dir.path().join("Sub Focus - Illuminate.aiff"))
        );
        assert_eq!(library.find_organised("Wilkinson", "Illuminate"), None);
    }

    #[test]
    fn test_prefix_artist_rule() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("Cesco, Sparkz - Big Fi Dem.aiff"));
        let library = Library::new(dir.path(), LibraryLayout::Flat);

        assert!(library.find_organised("Cesco", "Big Fi Dem").is_some());
        assert!(library.find_organised("Sparkz", "Big Fi Dem").is_none());
    }

    #[test]
    fn test_qualifiers_and_copy_suffix() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("Sub Focus - Illuminate (VIP Mix) (1).aiff"));
        touch(&dir.path().join("Shy FX - Original Nuttah (Original Mix).aiff"));
        let library = Library::new(dir.path(), LibraryLayout::Flat);

        assert!(library.find_organised("Sub Focus", "Illuminate").is_some());
        assert!(library.find_organised("Shy FX", "Original Nuttah").is_some());
        // A longer title is a different track
        assert!(library.find_organised("Sub Focus", "Illumin").is_none());
    }

    #[test]
    fn test_bare_title_only_when_flat_or_no_artist() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("Journey.aiff"));

        let flat = Library::new(dir.path(), LibraryLayout::Flat);
        assert!(flat.find_organised("DJ Hype", "Journey").is_some());

        let nested = Library::new(dir.path(), LibraryLayout::ByArtist);
        assert!(nested.find_organised("DJ Hype", "Journey").is_none());
        assert!(nested.find_organised("", "Journey").is_some());
    }

    #[test]
    fn test_by_artist_layout() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("Cesco/Big Fi Dem.aiff"));
        let library = Library::new(dir.path(), LibraryLayout::ByArtist);

        assert_eq!(
            library.find_organised("Cesco", "Big Fi Dem"),
            Some(dir.path().join("Cesco/Big Fi Dem.aiff"))
        );
        assert!(library.find_organised("cesco", "big fi dem").is_some());
        assert!(library.find_organised("Sparkz", "Big Fi Dem").is_none());
    }

    #[test]
    fn test_by_genre_layout_with_multi_artist_dir() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("Drum & Bass/Sub Focus, Wilkinson/Illuminate.aiff"));
        touch(&dir.path().join("Jungle/Shy FX/Shy FX - Original Nuttah.aiff"));
        let library = Library::new(dir.path(), LibraryLayout::ByGenre);

        assert!(library.find_organised("Sub Focus", "Illuminate").is_some());
        assert!(library.find_organised("Wilkinson", "Illuminate").is_none());
        assert!(library.find_organised("Shy FX", "Original Nuttah").is_some());
    }

    #[test]
    fn test_search_values_are_sanitised() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("AC_DC - What_.aiff"));
        let library = Library::new(dir.path(), LibraryLayout::Flat);
        assert!(library.find_organised("AC/DC", "What?").is_some());
    }

    #[test]
    fn test_missing_root_finds_nothing() {
        let library = Library::new("/definitely/not/here", LibraryLayout::ByGenre);
        assert!(library.find_organised("Cesco", "Big Fi Dem").is_none());
    }

    #[test]
    fn test_non_aiff_files_are_ignored() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("Sub Focus - Illuminate.flac"));
        let library = Library::new(dir.path(), LibraryLayout::Flat);
        assert!(library.find_organised("Sub Focus", "Illuminate").is_none());
    }
}
