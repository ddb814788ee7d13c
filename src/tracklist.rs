//! Reading tracklists: one "Title - Artist" reference per line.

use std::io::{self, BufRead};
use std::path::Path;

/// Whether a line is a track reference rather than a blank or a comment
/// (`#` or `//`).
pub fn is_track_line(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && !line.starts_with('#') && !line.starts_with("//")
}

/// Track lines from any reader, trimmed.
pub fn read_lines(reader: impl BufRead) -> io::Result<Vec<String>> {
    let mut lines = Vec::new();
    for line in reader.lines() {
        let line = line?;
        // A UTF-8 BOM survives `lines()` on the first line of some exports
        let line = line.trim_start_matches('\u{feff}');
        if is_track_line(line) {
            lines.push(line.trim().to_string());
        }
    }
    Ok(lines)
}

/// Track lines from a file, or from stdin when `path` is `None` or `-`.
pub fn load(path: Option<&Path>) -> io::Result<Vec<String>> {
    match path {
        Some(p) if p != Path::new("-") => {
            let file = std::fs::File::open(p)?;
            read_lines(io::BufReader::new(file))
        }
        _ => read_lines(io::stdin().lock()),
    }
}
