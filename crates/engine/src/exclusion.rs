// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C2: the exclusion registry — periodically reloaded sets of forbidden
//! run and library identifiers.

use parking_lot::RwLock;
use runwatch_core::{LibraryId, RunId};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A whole-value snapshot of the exclusion sets, replaced atomically on
/// every reload so readers never observe a set that is half old, half new.
#[derive(Debug, Default)]
pub struct ExclusionSnapshot {
    pub run_ids: HashSet<RunId>,
    pub library_ids: HashSet<LibraryId>,
}

/// Loads one identifier per line from each file in `paths`, unioning the
/// results. A missing file is silently skipped (spec.md §4.2).
fn load_union(paths: &[PathBuf]) -> HashSet<String> {
    let mut ids = HashSet::new();
    for path in paths {
        let Ok(contents) = std::fs::read_to_string(path) else {
            continue;
        };
        for line in contents.lines() {
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                ids.insert(trimmed.to_string());
            }
        }
    }
    ids
}

/// Holds the configured list of exclusion files and the current snapshot
/// built from them.
pub struct ExclusionRegistry {
    run_exclude_files: Vec<PathBuf>,
    library_exclude_files: Vec<PathBuf>,
    snapshot: RwLock<Arc<ExclusionSnapshot>>,
}

impl ExclusionRegistry {
    pub fn new(run_exclude_files: Vec<PathBuf>, library_exclude_files: Vec<PathBuf>) -> Self {
        Self {
            run_exclude_files,
            library_exclude_files,
            snapshot: RwLock::new(Arc::new(ExclusionSnapshot::default())),
        }
    }

    /// Rebuilds both sets from scratch and replaces the snapshot as a
    /// single whole-value swap.
    pub fn reload(&self) {
        let snapshot = ExclusionSnapshot {
            run_ids: load_union(&self.run_exclude_files)
                .into_iter()
                .map(RunId::from)
                .collect(),
            library_ids: load_union(&self.library_exclude_files)
                .into_iter()
                .map(LibraryId::from)
                .collect(),
        };
        *self.snapshot.write() = Arc::new(snapshot);
    }

    /// Returns a cheap clone of the current snapshot.
    pub fn snapshot(&self) -> Arc<ExclusionSnapshot> {
        Arc::clone(&self.snapshot.read())
    }

    pub fn is_run_excluded(&self, id: &RunId) -> bool {
        self.snapshot().run_ids.contains(id)
    }

    pub fn is_library_excluded(&self, id: &LibraryId) -> bool {
        self.snapshot().library_ids.contains(id)
    }

    /// Runs the reload loop on `interval`, honouring cancellation between
    /// ticks, same cooperative-cancellation idiom as the run discoverer.
    pub async fn run_reload_loop(self: Arc<Self>, interval: std::time::Duration, stop: CancellationToken) {
        self.reload();
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // consume the immediate first tick
        loop {
            tokio::select! {
                _ = ticker.tick() => self.reload(),
                _ = stop.cancelled() => break,
            }
        }
    }
}

#[cfg(test)]
#[path = "exclusion_tests.rs"]
mod tests;
