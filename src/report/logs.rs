//! Append-only run logs kept in the download directory.
//!
//! `not-matched.log` records every rejected download as
//! `query="<q>" expected="<artist> - <title>" found="<artist> - <title>"`;
//! `not-found.log` records the raw input line of every track that ran out of
//! candidates. Writes are best-effort: a failure is logged and ignored.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

pub const NOT_MATCHED_LOG: &str = "not-matched.log";
pub const NOT_FOUND_LOG: &str = "not-found.log";

/// One rejected download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotMatchedEntry {
    pub query: String,
    pub expected: String,
    pub found: String,
}

impl NotMatchedEntry {
    pub fn new(
        query: &str,
        expected_artist: &str,
        expected_title: &str,
        found_artist: &str,
        found_title: &str,
    ) -> Self {
        Self {
            query: query.to_string(),
            expected: format!("{expected_artist} - {expected_title}").trim().to_string(),
            found: format!("{found_artist} - {found_title}").trim().to_string(),
        }
    }

    pub fn to_line(&self) -> String {
        format!(
            "query=\"{}\" expected=\"{}\" found=\"{}\"",
            self.query, self.expected, self.found
        )
    }
}

/// Writer for the logs of one download directory.
#[derive(Debug, Clone)]
pub struct RunLogs {
    dir: PathBuf,
}

impl RunLogs {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn not_matched_path(&self) -> PathBuf {
        self.dir.join(NOT_MATCHED_LOG)
    }

    pub fn not_found_path(&self) -> PathBuf {
        self.dir.join(NOT_FOUND_LOG)
    }

    pub fn append_not_matched(&self, entry: &NotMatchedEntry) {
        self.append(&self.not_matched_path(), &entry.to_line());
    }

    pub fn append_not_found(&self, raw_line: &str) {
        self.append(&self.not_found_path(), raw_line.trim());
    }

    fn append(&self, path: &Path, line: &str) {
        let result = fs::create_dir_all(&self.dir).and_then(|_| {
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            writeln!(file, "{line}")
        });
        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "failed to append to run log");
        }
    }
}

/// An expected track recovered from `not-matched.log`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ExpectedItem {
    pub artist: String,
    pub title: String,
}

impl ExpectedItem {
    /// Spotify web search for this exact artist and track.
    pub fn spotify_search_url(&self) -> String {
        let query = format!("artist:\"{}\" track:\"{}\"", self.artist, self.title);
        format!("https://open.spotify.com/search/{}", urlencoding::encode(&query))
    }
}

/// Expected item of one log line, if it has a usable `artist - title`.
pub fn parse_not_matched_line(line: &str) -> Option<ExpectedItem> {
    static EXPECTED_BEFORE_FOUND: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"expected="(.*?)"\s+found="#).expect("expected pattern is valid")
    });
    static EXPECTED_SIMPLE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r#"expected="([^"]*)""#).expect("expected pattern is valid"));

    let expected = EXPECTED_BEFORE_FOUND
        .captures(line)
        .or_else(|| EXPECTED_SIMPLE.captures(line))?
        .get(1)?
        .as_str()
        .trim();
    let (artist, title) = expected.split_once(" - ")?;
    let (artist, title) = (artist.trim(), title.trim());
    if artist.is_empty() || title.is_empty() {
        return None;
    }
    Some(ExpectedItem {
        artist: artist.to_string(),
        title: title.to_string(),
    })
}

/// Parse a whole log into expected items, first occurrence wins.
pub fn parse_not_matched(content: &str) -> Vec<ExpectedItem> {
    let mut seen = HashSet::new();
    content
        .lines()
        .filter_map(parse_not_matched_line)
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Write `<prefix>.txt` (artist - title lines) and `<prefix>.urls.txt`
/// (Spotify search URLs), creating the parent directory.
pub fn write_not_matched_outputs(items: &[ExpectedItem], prefix: &Path) -> io::Result<(PathBuf, PathBuf)> {
    if let Some(parent) = prefix.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let txt_path = with_suffix(prefix, ".txt");
    let urls_path = with_suffix(prefix, ".urls.txt");

    let txt: String = items
        .iter()
        .map(|i| format!("{} - {}\n", i.artist, i.title))
        .collect();
    let urls: String = items
        .iter()
        .map(|i| format!("{}\n", i.spotify_search_url()))
        .collect();

    fs::write(&txt_path, txt)?;
    fs::write(&urls_path, urls)?;
    Ok((txt_path, urls_path))
}

fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = prefix.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Copy this run's logs into `dest` (normally `./logs/last-run`) together
/// with a `last-run-dir.txt` naming the download directory.
pub fn persist_last_run(download_dir: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    fs::write(
        dest.join("last-run-dir.txt"),
        download_dir.display().to_string(),
    )?;
    for name in [NOT_MATCHED_LOG, NOT_FOUND_LOG] {
        let src = download_dir.join(name);
        if src.exists() {
            fs::copy(&src, dest.join(name))?;
        }
    }
    Ok(())
}
