//! Audio file tag reading.
//!
//! Uses the lofty crate for format-independent metadata access. Tags come
//! back as a [`TagMap`] keyed by lowercase field name so validation and
//! organising never care which container format a download arrived in.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use lofty::file::TaggedFileExt;
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag};
use regex::Regex;

use crate::error::{Error, Result};
use crate::normalize::{collapse_whitespace, fold_diacritics};

/// Lowercase tag name to value.
///
/// Empty values are never stored, so `get` returning `Some` always means a
/// usable value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagMap(BTreeMap<String, String>);

impl TagMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        let value = value.trim();
        if !value.is_empty() {
            self.0.insert(key.to_lowercase(), value.to_string());
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(&key.to_lowercase()).map(String::as_str)
    }

    /// Track artist, falling back to the album artist.
    pub fn artist(&self) -> &str {
        self.get("artist")
            .or_else(|| self.get("album_artist"))
            .unwrap_or("")
    }

    pub fn title(&self) -> &str {
        self.get("title").unwrap_or("")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Reads embedded tags from an audio file.
pub trait TagReader: Send + Sync {
    fn read_tags(&self, path: &Path) -> Result<TagMap>;
}

/// [`TagReader`] backed by lofty.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyTagReader;

impl TagReader for LoftyTagReader {
    fn read_tags(&self, path: &Path) -> Result<TagMap> {
        let tagged_file = Probe::open(path)
            .map_err(|e| Error::metadata(path, format!("failed to open file for probing: {e}")))?
            .read()
            .map_err(|e| Error::metadata(path, format!("failed to read file metadata: {e}")))?;

        // Get the primary tag, or fall back to the first available tag
        let Some(tag) = tagged_file
            .primary_tag()
            .or_else(|| tagged_file.first_tag())
        else {
            return Ok(TagMap::new());
        };

        Ok(tag_map_from(tag))
    }
}

fn tag_map_from(tag: &Tag) -> TagMap {
    let mut map = TagMap::new();

    if let Some(title) = tag.title() {
        map.insert("title", title.as_ref());
    }
    if let Some(artist) = tag.artist() {
        map.insert("artist", artist.as_ref());
    }
    if let Some(album) = tag.album() {
        map.insert("album", album.as_ref());
    }
    if let Some(album_artist) = tag.get_string(&ItemKey::AlbumArtist) {
        map.insert("album_artist", album_artist);
    }

    // Genre is frequently multi-valued; keep every value for genre picking
    let genres: Vec<&str> = tag.get_strings(&ItemKey::Genre).collect();
    if !genres.is_empty() {
        map.insert("genre", genres.join(", "));
    }

    if let Some(date) = tag.get_string(&ItemKey::RecordingDate) {
        map.insert("date", date);
    }
    if let Some(label) = tag.get_string(&ItemKey::Label) {
        map.insert("label", label);
    }

    map
}

/// Comparison form of a tag value: no diacritics, lowercase, single spaces.
pub fn normalise_tag(value: &str) -> String {
    collapse_whitespace(&fold_diacritics(value)).to_lowercase()
}

/// Like [`normalise_tag`], after repeatedly removing trailing bracketed
/// qualifiers such as "(VIP Mix)", "[Remastered]" or "(feat. X)".
pub fn normalise_title_base(title: &str) -> String {
    static TRAILING_QUALIFIER: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"(?i)\s*[\[(][^\[\]()]*\b(?:remix|vip|mix|edit|version|feat|ft|live|remaster(?:ed)?)\b[^\[\]()]*[\])]\s*$",
        )
        .expect("qualifier pattern is valid")
    });

    let mut base = title.trim().to_string();
    loop {
        let stripped = TRAILING_QUALIFIER.replace(&base, "").trim().to_string();
        if stripped == base {
            break;
        }
        base = stripped;
    }
    normalise_tag(&base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_non_audio_file_returns_error() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "This is just some text, not music.").expect("Failed to write to temp file");

        let result = LoftyTagReader.read_tags(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_read_non_existent_file_returns_error() {
        let result = LoftyTagReader.read_tags(Path::new("non_existent_file.flac"));
        assert!(matches!(result, Err(Error::Metadata { .. })));
    }

    #[test]
    fn test_tag_map_artist_falls_back_to_album_artist() {
        let mut tags = TagMap::new();
        tags.insert("Album_Artist", "Sub Focus");
        tags.insert("title", "Illuminate");
        assert_eq!(tags.artist(), "Sub Focus");

        tags.insert("artist", "Sub Focus, Wilkinson");
        assert_eq!(tags.artist(), "Sub Focus, Wilkinson");
    }

    #[test]
    fn test_tag_map_ignores_blank_values() {
        let mut tags = TagMap::new();
        tags.insert("artist", "   ");
        assert!(tags.is_empty());
        assert_eq!(tags.artist(), "");
        assert_eq!(tags.title(), "");
    }

    #[test]
    fn test_normalise_tag() {
        assert_eq!(normalise_tag("  Beyoncé   Knowles "), "beyonce knowles");
        assert_eq!(normalise_tag("RÖYKSOPP"), "royksopp");
        assert_eq!(normalise_tag(""), "");
    }

    #[test]
    fn test_normalise_title_base_strips_stacked_qualifiers() {
        assert_eq!(normalise_title_base("Illuminate (VIP Mix)"), "illuminate");
        assert_eq!(
            normalise_title_base("Illuminate (feat. Kele) [Hedex Remix]"),
            "illuminate"
        );
        assert_eq!(normalise_title_base("Nightmare (Live) (Remastered)"), "nightmare");
    }

    #[test]
    fn test_normalise_title_base_keeps_plain_brackets() {
        assert_eq!(
            normalise_title_base("Journey (Part 2)"),
            "journey (part 2)"
        );
        assert_eq!(normalise_title_base("Mixed Up"), "mixed up");
    }
}
