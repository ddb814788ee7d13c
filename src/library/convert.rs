//! Audio conversion into the library format.
//!
//! Shells out to `ffmpeg`: 16-bit PCM AIFF with ID3v2.3 tags, carrying the
//! source tags across and attaching a `cover.jpg`/`cover.png` found next to
//! the source.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::cleanup;
use crate::download::tool::is_tool_available;
use crate::error::{Error, Result};
use crate::metadata::TagMap;

/// Tag names copied into converted files.
const COPIED_TAGS: &[&str] = &["title", "artist", "album", "album_artist", "genre", "date", "label"];

const COVER_NAMES: &[&str] = &["cover.jpg", "cover.jpeg", "cover.png"];

#[async_trait]
pub trait AudioConverter: Send + Sync {
    /// Convert `input` to an AIFF file at `output`, writing `tags` into it.
    async fn convert_to_aiff(&self, input: &Path, output: &Path, tags: &TagMap) -> Result<()>;

    /// Rewrite the tags of an existing file in place.
    async fn inject_tags(&self, path: &Path, tags: &TagMap) -> Result<()>;

    async fn ensure_available(&self) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FfmpegConverter {
    program: String,
}

impl Default for FfmpegConverter {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegConverter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, args: Vec<OsString>) -> Result<()> {
        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::tool_unavailable(&self.program, "install ffmpeg or set [library].converter")
                } else {
                    Error::Io(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            return Err(Error::organisation(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                tail.into_iter().rev().collect::<Vec<_>>().join(" | ")
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl AudioConverter for FfmpegConverter {
    async fn convert_to_aiff(&self, input: &Path, output: &Path, tags: &TagMap) -> Result<()> {
        let cover = find_cover(input);
        tracing::debug!(
            target: "library",
            input = %input.display(),
            cover = ?cover,
            "converting to AIFF"
        );
        self.run(conversion_args(input, cover.as_deref(), output, tags)).await
    }

    async fn inject_tags(&self, path: &Path, tags: &TagMap) -> Result<()> {
        let mut tmp = path.as_os_str().to_os_string();
        tmp.push(".meta.aiff");
        let tmp = PathBuf::from(tmp);

        let mut args: Vec<OsString> = vec!["-y".into(), "-i".into(), path.into()];
        args.extend(metadata_args(tags).into_iter().map(OsString::from));
        args.extend(["-c", "copy"].into_iter().map(OsString::from));
        args.push(tmp.clone().into());

        match self.run(args).await {
            Ok(()) => std::fs::rename(&tmp, path).map_err(Error::from),
            Err(e) => {
                cleanup::remove_file(&tmp);
                Err(e)
            }
        }
    }

    async fn ensure_available(&self) -> Result<()> {
        if is_tool_available(&self.program, "-version").await {
            Ok(())
        } else {
            Err(Error::tool_unavailable(
                &self.program,
                "install ffmpeg (https://ffmpeg.org) or run with --skip-organise",
            ))
        }
    }
}

/// `-metadata key=value` pairs for the tags worth carrying over.
pub fn metadata_args(tags: &TagMap) -> Vec<String> {
    COPIED_TAGS
        .iter()
        .filter_map(|key| tags.get(key).map(|value| (key, value)))
        .flat_map(|(key, value)| ["-metadata".to_string(), format!("{key}={value}")])
        .collect()
}

fn find_cover(input: &Path) -> Option<PathBuf> {
    let dir = input.parent()?;
    COVER_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

fn conversion_args(input: &Path, cover: Option<&Path>, output: &Path, tags: &TagMap) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-y".into(), "-i".into(), input.into()];
    match cover {
        Some(cover) => {
            args.push("-i".into());
            args.push(cover.into());
            args.extend(
                [
                    "-map_metadata",
                    "0",
                    "-map",
                    "0:a",
                    "-map",
                    "1:v",
                    "-c:a",
                    "pcm_s16le",
                    "-c:v",
                    "copy",
                    "-disposition:v",
                    "attached_pic",
                ]
                .into_iter()
                .map(OsString::from),
            );
        }
        None => args.extend(
            ["-map", "0:a", "-map_metadata", "0", "-c:a", "pcm_s16le"]
                .into_iter()
                .map(OsString::from),
        ),
    }
    args.extend(metadata_args(tags).into_iter().map(OsString::from));
    args.extend(
        ["-write_id3v2", "1", "-id3v2_version", "3", "-f", "aiff"]
            .into_iter()
            .map(OsString::from),
    );
    args.push(output.into());
    args
}
