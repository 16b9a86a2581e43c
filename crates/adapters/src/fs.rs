// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C1: pure filesystem probes over the operating-system filesystem.
//!
//! These are deliberately forgiving: a missing/unreadable directory is "no
//! results", not an error, and a symlink conflict is "already done", not a
//! failure — per spec.md §7's error-handling design, only genuine I/O
//! failures that a caller cannot route around surface as `Err`.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("failed to create directory tree at {path:?}: {source}")]
    MakeDirs {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to set mode {mode:o} on {path:?}: {source}")]
    SetMode {
        path: PathBuf,
        mode: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove tree at {path:?}: {source}")]
    RemoveTree {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Lists the absolute paths of `path`'s direct children.
///
/// Returns an empty vector if `path` is missing or unreadable rather than
/// raising — per spec.md §4.1, a transient filesystem condition here is "no
/// results", logged by the caller if it cares.
pub fn list_directory(path: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(path) else {
        return Vec::new();
    };
    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .collect()
}

/// Returns whether `path` exists (file, directory, or symlink target).
pub fn exists(path: &Path) -> bool {
    path.exists()
}

/// Recursively creates `path` and any missing ancestors.
pub fn make_directory_tree(path: &Path) -> Result<(), FsError> {
    std::fs::create_dir_all(path).map_err(|source| FsError::MakeDirs {
        path: path.to_path_buf(),
        source,
    })
}

/// Sets the unix permission bits (e.g. `0o750`) on `path`.
#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> Result<(), FsError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).map_err(|source| {
        FsError::SetMode {
            path: path.to_path_buf(),
            mode,
            source,
        }
    })
}

#[cfg(not(unix))]
pub fn set_mode(_path: &Path, _mode: u32) -> Result<(), FsError> {
    Ok(())
}

/// Recursively removes the directory tree rooted at `path`.
///
/// A missing path is not an error: the end state (path gone) already holds.
pub fn remove_tree(path: &Path) -> Result<(), FsError> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(FsError::RemoveTree {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Creates a symbolic link from `dest` to `src`.
///
/// Ensures `dest`'s parent exists, removes any pre-existing file at `dest`,
/// then links. A missing source or destination is a no-op. "Already
/// exists", permission-denied-on-remove, and other generic I/O failures are
/// swallowed: per spec.md §7 a symlink conflict is treated as idempotent
/// success, since the desired end state (the link exists) already holds or
/// isn't achievable by retrying.
pub fn symlink(src: Option<&Path>, dest: Option<&Path>) {
    let (Some(src), Some(dest)) = (src, dest) else {
        return;
    };
    if let Some(parent) = dest.parent() {
        if make_directory_tree(parent).is_err() {
            return;
        }
    }
    if dest.exists() || dest.symlink_metadata().is_ok() {
        let _ = std::fs::remove_file(dest);
    }
    let _ = platform_symlink(src, dest);
}

#[cfg(unix)]
fn platform_symlink(src: &Path, dest: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(src, dest)
}

#[cfg(not(unix))]
fn platform_symlink(src: &Path, dest: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(src, dest)
}

/// Finds paths under `dir` matching `pattern` (a glob relative to `dir`).
///
/// Used to locate produced artifacts whose exact name isn't known ahead of
/// time (e.g. a tool-versioned output file). Malformed patterns or
/// unreadable directories yield no results.
pub fn find_by_glob(dir: &Path, pattern: &str) -> Vec<PathBuf> {
    let full_pattern = dir.join(pattern);
    let Some(full_pattern) = full_pattern.to_str() else {
        return Vec::new();
    };
    let Ok(paths) = glob::glob(full_pattern) else {
        return Vec::new();
    };
    paths.filter_map(|p| p.ok()).collect()
}

#[cfg(test)]
#[path = "fs_tests.rs"]
mod tests;
