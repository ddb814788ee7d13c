//! The external downloader as a subprocess.
//!
//! The downloader is configured as a program plus an argument template. The
//! placeholders `{query}`, `{quality}`, `{quality_code}` and `{dir}` are bound
//! per invocation; anything else (such as qobuz-dl's own `{tracktitle}`
//! naming tokens) passes through untouched.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use super::progress::parse_progress;
use super::{DownloadError, QualityTier};
use crate::error::{Error, Result};

/// Exit status and captured output of one downloader run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Anything that can fetch a track for a query into a directory.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Human-readable command for logs and dry runs.
    fn command_line(&self, query: &str, tier: QualityTier, dir: &Path) -> String;

    /// Run one download and wait for it to finish.
    async fn download(
        &self,
        query: &str,
        tier: QualityTier,
        dir: &Path,
    ) -> std::result::Result<ToolOutput, DownloadError>;

    /// Fail with [`Error::ToolUnavailable`] when the tool cannot be run at all.
    async fn ensure_available(&self) -> Result<()>;
}

/// Program plus argument template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandTemplate {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for CommandTemplate {
    fn default() -> Self {
        Self {
            program: "qobuz-dl".to_string(),
            args: [
                "lucky",
                "-t",
                "track",
                "-n",
                "1",
                "-q",
                "{quality_code}",
                "-d",
                "{dir}",
                "--no-db",
                "--no-m3u",
                "--no-fallback",
                "-ff",
                "{artist} - {album} ({year}) [{bit_depth}B-{sampling_rate}kHz]",
                "-tf",
                "{tracktitle}",
                "{query}",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl CommandTemplate {
    /// Bind the per-invocation placeholders.
    pub fn render(&self, query: &str, tier: QualityTier, dir: &Path) -> Vec<String> {
        let dir = dir.display().to_string();
        let code = tier.code().to_string();
        self.args
            .iter()
            .map(|arg| {
                // {query} last so a query containing "{dir}" is never expanded
                arg.replace("{quality_code}", &code)
                    .replace("{quality}", tier.name())
                    .replace("{dir}", &dir)
                    .replace("{query}", query)
            })
            .collect()
    }

    pub fn command_line(&self, query: &str, tier: QualityTier, dir: &Path) -> String {
        std::iter::once(self.program.clone())
            .chain(self.render(query, tier, dir).into_iter().map(|a| shell_quote(&a)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn shell_quote(arg: &str) -> String {
    if !arg.is_empty() && !arg.chars().any(|c| c.is_whitespace() || c == '"' || c == '\'') {
        return arg.to_string();
    }
    format!("\"{}\"", arg.replace('"', "\\\""))
}

/// [`Downloader`] that spawns the configured program.
#[derive(Debug, Clone, Default)]
pub struct CommandDownloader {
    template: CommandTemplate,
}

impl CommandDownloader {
    pub fn new(template: CommandTemplate) -> Self {
        Self { template }
    }

    pub fn program(&self) -> &str {
        &self.template.program
    }
}

#[async_trait]
impl Downloader for CommandDownloader {
    fn command_line(&self, query: &str, tier: QualityTier, dir: &Path) -> String {
        self.template.command_line(query, tier, dir)
    }

    async fn download(
        &self,
        query: &str,
        tier: QualityTier,
        dir: &Path,
    ) -> std::result::Result<ToolOutput, DownloadError> {
        let program = &self.template.program;
        let mut child = Command::new(program)
            .args(self.template.render(query, tier, dir))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DownloadError::spawn(program, source))?;

        let stdout = child.stdout.take().ok_or(DownloadError::MissingPipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(DownloadError::MissingPipe("stderr"))?;

        let (stdout, stderr) = tokio::join!(read_with_progress(stdout, query), read_all(stderr));
        let status = child.wait().await?;

        Ok(ToolOutput {
            exit_code: status.code().unwrap_or(-1),
            stdout: stdout?,
            stderr: stderr?,
        })
    }

    async fn ensure_available(&self) -> Result<()> {
        if is_tool_available(&self.template.program, "--help").await {
            Ok(())
        } else {
            Err(Error::tool_unavailable(
                &self.template.program,
                "install it (for qobuz-dl: `pip install qobuz-dl`, then `qobuz-dl -r` to log in) or set [downloader].program",
            ))
        }
    }
}

/// Read stdout in chunks, reporting progress counters as they appear.
async fn read_with_progress(
    mut reader: impl AsyncRead + Unpin,
    query: &str,
) -> std::io::Result<String> {
    let mut collected = Vec::new();
    let mut chunk = [0u8; 4096];
    let mut last_percent = None;
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        collected.extend_from_slice(&chunk[..n]);
        if let Some(progress) = parse_progress(&String::from_utf8_lossy(&chunk[..n])) {
            let percent = progress.percent();
            if percent != last_percent {
                tracing::debug!(
                    target: "download",
                    query,
                    bytes = progress.bytes,
                    total = progress.total,
                    percent = percent.unwrap_or(0),
                    "progress"
                );
                last_percent = percent;
            }
        }
    }
    Ok(String::from_utf8_lossy(&collected).into_owned())
}

async fn read_all(mut reader: impl AsyncRead + Unpin) -> std::io::Result<String> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Whether `program` can be spawned at all. Its exit status is ignored.
pub async fn is_tool_available(program: &str, probe_arg: &str) -> bool {
    let result = Command::new(program)
        .arg(probe_arg)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await;
    match result {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!(target: "download", program, error = %e, "tool probe failed");
            false
        }
    }
}
