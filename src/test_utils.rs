//! Test doubles for the downloader, tag reader and converter ports.
//!
//! Fake "audio" files are plain text: one `key=value` tag per line, read back
//! by [`FakeTagReader`]. [`FakeDownloader`] plays a script of file drops, one
//! entry per invocation, and records every (query, tier) it was asked for.
//!
//! # Example
//!
//! ```ignore
//! let downloader = Arc::new(FakeDownloader::new(vec![
//!     Script::nothing(1),
//!     Script::audio("Album/Track.flac", "Sub Focus", "Illuminate"),
//! ]));
//! ```

use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::download::{DownloadError, Downloader, QualityTier, ToolOutput};
use crate::error::{Error, Result};
use crate::library::AudioConverter;
use crate::metadata::{TagMap, TagReader};

/// Write a fake audio file carrying the given tags.
pub fn write_tags(path: &Path, tags: &[(&str, &str)]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    let content: String = tags.iter().map(|(k, v)| format!("{k}={v}\n")).collect();
    fs::write(path, content).expect("Failed to write fake audio file");
}

/// Write a fake audio file tagged with artist and title.
pub fn write_tagged(path: &Path, artist: &str, title: &str) {
    write_tags(path, &[("artist", artist), ("title", title)]);
}

/// Reads the `key=value` files written by [`write_tags`].
///
/// Empty or missing files are unreadable, like a truncated download.
#[derive(Debug, Clone, Copy, Default)]
pub struct FakeTagReader;

impl TagReader for FakeTagReader {
    fn read_tags(&self, path: &Path) -> Result<TagMap> {
        let content = fs::read_to_string(path).map_err(|e| Error::metadata(path, e.to_string()))?;
        if content.trim().is_empty() {
            return Err(Error::metadata(path, "no tags"));
        }
        let mut tags = TagMap::new();
        for (key, value) in content.lines().filter_map(|l| l.split_once('=')) {
            tags.insert(key, value);
        }
        Ok(tags)
    }
}

/// One file the fake downloader drops, relative to the download dir.
#[derive(Debug, Clone)]
struct FileDrop {
    relative: String,
    tags: Vec<(String, String)>,
}

/// What the fake downloader does on one invocation.
#[derive(Debug, Clone)]
pub struct Script {
    drops: Vec<FileDrop>,
    exit_code: i32,
}

impl Script {
    /// A tagged audio file and exit code 0.
    pub fn audio(relative: &str, artist: &str, title: &str) -> Self {
        Self {
            drops: vec![FileDrop {
                relative: relative.to_string(),
                tags: vec![
                    ("artist".to_string(), artist.to_string()),
                    ("title".to_string(), title.to_string()),
                ],
            }],
            exit_code: 0,
        }
    }

    /// No output at all.
    pub fn nothing(exit_code: i32) -> Self {
        Self {
            drops: Vec::new(),
            exit_code,
        }
    }

    /// A non-audio leftover such as a partial `.tmp` file.
    pub fn partial(relative: &str, exit_code: i32) -> Self {
        Self {
            drops: vec![FileDrop {
                relative: relative.to_string(),
                tags: vec![("partial".to_string(), "true".to_string())],
            }],
            exit_code,
        }
    }
}

/// Scripted [`Downloader`]. Once the script runs out every call fails with
/// exit code 1 and no output.
#[derive(Debug, Default)]
pub struct FakeDownloader {
    script: Mutex<VecDeque<Script>>,
    invocations: Mutex<Vec<(String, QualityTier)>>,
}

impl FakeDownloader {
    pub fn new(script: Vec<Script>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.invocations.lock().expect("invocations lock").len()
    }

    pub fn invocations(&self) -> Vec<(String, QualityTier)> {
        self.invocations.lock().expect("invocations lock").clone()
    }
}

#[async_trait]
impl Downloader for FakeDownloader {
    fn command_line(&self, query: &str, tier: QualityTier, _dir: &Path) -> String {
        format!("fake-dl {tier} {query}")
    }

    async fn download(
        &self,
        query: &str,
        tier: QualityTier,
        dir: &Path,
    ) -> std::result::Result<ToolOutput, DownloadError> {
        self.invocations
            .lock()
            .expect("invocations lock")
            .push((query.to_string(), tier));

        let step = self
            .script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| Script::nothing(1));

        for file in &step.drops {
            let tags: Vec<(&str, &str)> = file
                .tags
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            write_tags(&dir.join(&file.relative), &tags);
        }

        Ok(ToolOutput {
            exit_code: step.exit_code,
            stdout: format!("fake download for {query}"),
            stderr: String::new(),
        })
    }

    async fn ensure_available(&self) -> Result<()> {
        Ok(())
    }
}

/// [`AudioConverter`] that copies the source instead of transcoding.
#[derive(Debug, Default)]
pub struct CopyConverter {
    drop_tags: bool,
    fail: bool,
    conversions: AtomicUsize,
    injections: AtomicUsize,
}

impl CopyConverter {
    /// Writes an empty output, as if the conversion lost every tag.
    pub fn dropping_tags() -> Self {
        Self {
            drop_tags: true,
            ..Self::default()
        }
    }

    /// Writes a partial output, then reports a failed conversion.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn conversions(&self) -> usize {
        self.conversions.load(Ordering::SeqCst)
    }

    pub fn injections(&self) -> usize {
        self.injections.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioConverter for CopyConverter {
    async fn convert_to_aiff(&self, input: &Path, output: &Path, _tags: &TagMap) -> Result<()> {
        self.conversions.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            fs::write(output, b"partial")?;
            return Err(Error::organisation("converter exited with status 1"));
        }
        if self.drop_tags {
            fs::write(output, b"")?;
        } else {
            fs::copy(input, output)?;
        }
        Ok(())
    }

    async fn inject_tags(&self, path: &Path, tags: &TagMap) -> Result<()> {
        self.injections.fetch_add(1, Ordering::SeqCst);
        let pairs: Vec<(&str, &str)> = tags.iter().collect();
        write_tags(path, &pairs);
        Ok(())
    }

    async fn ensure_available(&self) -> Result<()> {
        Ok(())
    }
}
