//! Best-effort filesystem cleanup.
//!
//! Nothing here returns an error. Every failure is logged as a warning under
//! the `cleanup` target and the caller carries on; a file that vanished
//! between the snapshot and the cleanup is not worth reporting at all.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::download::sidecar_path;

fn warn_unless_gone(action: &str, path: &Path, err: &io::Error) {
    if err.kind() != io::ErrorKind::NotFound {
        tracing::warn!(target: "cleanup", path = %path.display(), error = %err, "failed to {action}");
    }
}

/// Delete a single file; true when it was removed.
pub fn remove_file(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) => {
            warn_unless_gone("remove file", path, &e);
            false
        }
    }
}

/// Delete audio files together with their `.search.txt` sidecars.
pub fn remove_files_with_sidecars(files: &[PathBuf]) -> usize {
    let mut removed = 0;
    for file in files {
        if remove_file(file) {
            removed += 1;
        }
        let sidecar = sidecar_path(file);
        if let Err(e) = fs::remove_file(&sidecar) {
            warn_unless_gone("remove sidecar", &sidecar, &e);
        }
    }
    removed
}

/// Remove directories, contents included, deepest first.
///
/// Only for directories a single downloader run created: everything inside
/// them came from that run.
pub fn remove_dirs(dirs: &[PathBuf]) {
    for dir in deepest_first(dirs) {
        if let Err(e) = fs::remove_dir_all(&dir) {
            warn_unless_gone("remove directory", &dir, &e);
        }
    }
}

/// Remove the given directories that are empty, deepest first.
pub fn remove_empty_dirs(dirs: &[PathBuf]) {
    for dir in deepest_first(dirs) {
        if is_empty_dir(&dir)
            && let Err(e) = fs::remove_dir(&dir)
        {
            warn_unless_gone("remove empty directory", &dir, &e);
        }
    }
}

/// Delete files ending in `.tmp`. Other paths are ignored.
pub fn remove_tmp_files(files: &[PathBuf]) {
    for file in files.iter().filter(|p| is_tmp(p)) {
        if let Err(e) = fs::remove_file(file) {
            warn_unless_gone("remove partial download", file, &e);
        }
    }
}

/// Remove every empty directory below `root`, bottom-up. `root` itself stays.
pub fn prune_empty_dirs(root: &Path) {
    let Ok(entries) = fs::read_dir(root) else {
        return;
    };
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            prune_empty_dirs(&path);
            if is_empty_dir(&path)
                && let Err(e) = fs::remove_dir(&path)
            {
                warn_unless_gone("prune directory", &path, &e);
            }
        }
    }
}

fn is_tmp(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("tmp"))
}

fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}

fn deepest_first(dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut sorted = dirs.to_vec();
    sorted.sort_by_key(|d| std::cmp::Reverse(d.components().count()));
    sorted
}
