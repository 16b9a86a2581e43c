// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C4: the run discoverer — a periodic scan that emits at most one
//! `run-directory-found` event per tick, across all configured roots.

use crate::bus::Bus;
use crate::exclusion::ExclusionRegistry;
use crate::progress::ProgressRegistry;
use runwatch_core::{Event, RunId, Topic};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const UPLOAD_MARKER: &str = "upload_complete.json";

fn is_eligible(path: &Path, exclusions: &ExclusionRegistry, progress: &ProgressRegistry) -> bool {
    if !path.is_dir() {
        return false;
    }
    let Some(basename) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if !runwatch_core::is_run_name(basename) {
        return false;
    }
    if !path.join(UPLOAD_MARKER).exists() {
        return false;
    }
    let id = RunId::from(basename.to_string());
    if exclusions.is_run_excluded(&id) {
        return false;
    }
    !progress.is_promoted(&id)
}

/// One scan task covering every configured root directory. Eligibility is
/// ∧-ed: directory, run-name shape, upload marker present, not excluded,
/// not already promoted in this process.
pub struct RunDiscoverer {
    run_dirs: Vec<PathBuf>,
    exclusions: Arc<ExclusionRegistry>,
    progress: Arc<ProgressRegistry>,
    bus: Arc<Bus>,
}

impl RunDiscoverer {
    pub fn new(
        run_dirs: Vec<PathBuf>,
        exclusions: Arc<ExclusionRegistry>,
        progress: Arc<ProgressRegistry>,
        bus: Arc<Bus>,
    ) -> Self {
        Self {
            run_dirs,
            exclusions,
            progress,
            bus,
        }
    }

    /// Scans every configured root, in order, returning the first eligible
    /// run directory found (if any). Ordering beyond lexical listing within
    /// each root is not guaranteed.
    fn first_eligible(&self) -> Option<PathBuf> {
        for root in &self.run_dirs {
            let mut children = runwatch_adapters::fs::list_directory(root);
            children.sort();
            for child in children {
                if is_eligible(&child, &self.exclusions, &self.progress) {
                    return Some(child);
                }
            }
        }
        None
    }

    /// Runs one scan, publishing a `run-directory-found` event for the
    /// first eligible run (if any). Returns the run path found, for tests.
    pub async fn scan_once(&self) -> Option<PathBuf> {
        let found = self.first_eligible()?;
        let event = Event::RunDirectoryFound {
            run_dir: found.clone(),
        };
        self.bus
            .publish(runwatch_core::BusMessage::event(
                Topic::Symlinking,
                chrono::Utc::now(),
                event,
            ))
            .await;
        Some(found)
    }

    /// Runs the scan loop on `interval`. Between ticks, waits on either the
    /// timeout or cancellation, whichever arrives first.
    pub async fn run_loop(self: Arc<Self>, interval: std::time::Duration, stop: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.scan_once().await;
                }
                _ = stop.cancelled() => break,
            }
        }
    }
}

#[cfg(test)]
#[path = "discover_tests.rs"]
mod tests;
