//! Download progress scraped from the downloader's stdout.

use std::sync::LazyLock;

use regex::Regex;

static PROGRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)([kM])/(\d+(?:\.\d+)?)([kM])").expect("progress pattern is valid")
});

/// Bytes received out of the expected total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub bytes: u64,
    pub total: u64,
}

impl Progress {
    /// Completion in whole percent, clamped to 0..=100.
    pub fn percent(&self) -> Option<u8> {
        if self.total == 0 {
            return None;
        }
        let pct = (self.bytes as f64 / self.total as f64 * 100.0).round();
        Some(pct.clamp(0.0, 100.0) as u8)
    }
}

/// Find the last `<n>[kM]/<n>[kM]` counter in a chunk of output.
pub fn parse_progress(chunk: &str) -> Option<Progress> {
    let caps = PROGRESS.captures_iter(chunk).last()?;
    let bytes = scaled(&caps[1], &caps[2])?;
    let total = scaled(&caps[3], &caps[4])?;
    Some(Progress { bytes, total })
}

fn scaled(number: &str, unit: &str) -> Option<u64> {
    let value: f64 = number.parse().ok()?;
    let factor = if unit == "M" { 1_000_000.0 } else { 1_000.0 };
    Some((value * factor) as u64)
}
