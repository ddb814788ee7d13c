//! Filing accepted downloads into the library.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cleanup;
use crate::download::sidecar_path;
use crate::error::{Error, Result, ResultExt};
use crate::metadata::{TagMap, TagReader};

use super::convert::AudioConverter;
use super::names::{pick_genre, sanitize_name};
use super::{LIBRARY_EXTENSION, Library, LibraryLayout};

const MAX_NAME_ATTEMPTS: usize = 1000;

/// Moves or converts accepted downloads into a [`Library`].
#[derive(Clone)]
pub struct Organiser {
    library: Library,
    tags: Arc<dyn TagReader>,
    converter: Arc<dyn AudioConverter>,
}

impl Organiser {
    pub fn new(library: Library, tags: Arc<dyn TagReader>, converter: Arc<dyn AudioConverter>) -> Self {
        Self {
            library,
            tags,
            converter,
        }
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub async fn ensure_available(&self) -> Result<()> {
        self.converter.ensure_available().await
    }

    /// First free library path for a file with these tags.
    pub fn destination(&self, tags: &TagMap, source: &Path) -> Result<PathBuf> {
        let genre = sanitize_name(&pick_genre(tags.get("genre").unwrap_or("Unknown Genre")));
        let artist = sanitize_name(non_empty(tags.artist()).unwrap_or("Unknown Artist"));
        let title = sanitize_name(
            non_empty(tags.title())
                .or_else(|| source.file_stem().and_then(|s| s.to_str()))
                .unwrap_or("Unknown Title"),
        );

        let root = self.library.root();
        let (dir, base) = match self.library.layout() {
            LibraryLayout::Flat => (root.to_path_buf(), format!("{artist} - {title}")),
            LibraryLayout::ByArtist => (root.join(&artist), title),
            LibraryLayout::ByGenre => (root.join(&genre).join(&artist), title),
        };

        free_path(&dir, &base)
    }

    /// File `source` into the library and return where it went.
    ///
    /// AIFF sources are moved; anything else is converted and the original
    /// stays in the download directory.
    pub async fn organise(&self, source: &Path) -> Result<PathBuf> {
        if !source.is_file() {
            return Err(Error::organisation(format!("file not found: {}", source.display())));
        }

        let tags = self.tags.read_tags(source).unwrap_or_else(|e| {
            tracing::warn!(target: "library", path = %source.display(), error = %e, "could not read tags, filing as unknown");
            TagMap::new()
        });
        let dest = self.destination(&tags, source)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(format!("failed to create directory {}", parent.display()))?;
        }

        if is_aiff(source) {
            move_file(source, &dest)?;
            cleanup::remove_file(&sidecar_path(source));
            tracing::info!(target: "library", from = %source.display(), to = %dest.display(), "moved AIFF into library");
            return Ok(dest);
        }

        let mut converted = source.as_os_str().to_os_string();
        converted.push(".converted.aiff");
        let converted = PathBuf::from(converted);

        if let Err(e) = self.converter.convert_to_aiff(source, &converted, &tags).await {
            cleanup::remove_file(&converted);
            return Err(e.context(format!("converting {}", source.display())));
        }
        move_file(&converted, &dest)?;
        self.verify_tags(&dest, &tags).await;

        tracing::info!(target: "library", from = %source.display(), to = %dest.display(), "converted into library");
        Ok(dest)
    }

    /// Re-inject tags when the conversion dropped any of the key ones.
    async fn verify_tags(&self, dest: &Path, expected: &TagMap) {
        let found = self.tags.read_tags(dest).unwrap_or_default();
        let lost = ["genre", "artist", "title"]
            .iter()
            .any(|key| expected.get(key).is_some() && found.get(key).is_none());
        if !lost {
            return;
        }
        if let Err(e) = self.converter.inject_tags(dest, expected).await {
            tracing::warn!(target: "library", path = %dest.display(), error = %e, "failed to inject tags");
        }
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

fn is_aiff(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("aiff") || e.eq_ignore_ascii_case("aif"))
}

/// `<base>.aiff`, else `<base> (1).aiff`, `<base> (2).aiff`, ...
fn free_path(dir: &Path, base: &str) -> Result<PathBuf> {
    let first = dir.join(format!("{base}.{LIBRARY_EXTENSION}"));
    if !first.exists() {
        return Ok(first);
    }
    (1..MAX_NAME_ATTEMPTS)
        .map(|n| dir.join(format!("{base} ({n}).{LIBRARY_EXTENSION}")))
        .find(|p| !p.exists())
        .ok_or_else(|| {
            Error::organisation(format!(
                "no free file name for {base} after {MAX_NAME_ATTEMPTS} attempts"
            ))
        })
}

/// Rename, falling back to copy + delete across filesystems.
fn move_file(source: &Path, dest: &Path) -> Result<()> {
    if fs::rename(source, dest).is_err() {
        fs::copy(source, dest).with_context(format!("failed to copy file to {}", dest.display()))?;
        fs::remove_file(source)
            .with_context(format!("failed to remove source file {}", source.display()))?;
    }
    Ok(())
}
