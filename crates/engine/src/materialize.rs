// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C5: the link materializer — turns a `run-directory-found` event into
//! per-library symlinks under the year-partitioned fastq tree, then
//! publishes `symlinks-created`.

use crate::bus::{Bus, Subscriber};
use crate::exclusion::ExclusionRegistry;
use crate::progress::ProgressRegistry;
use regex::Regex;
use runwatch_adapters::SampleSheetReader;
use runwatch_core::{classify, year_of, CoreError, Event, InstrumentClass, LibraryId, Payload, RunId, SymlinkPaths, Topic};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

fn current_year_partition() -> String {
    format!("{:02}", chrono::Utc::now().format("%y"))
}

fn sample_sheet_columns(class: InstrumentClass) -> Option<(&'static str, usize, usize)> {
    match class {
        InstrumentClass::MiSeq => Some(("[Data]", 9, 1)),
        InstrumentClass::NextSeq => Some(("[Cloud_Data]", 1, 0)),
        InstrumentClass::Unknown => None,
    }
}

fn locate_fastq_dir(run_dir: &Path, class: InstrumentClass) -> Option<PathBuf> {
    match class {
        InstrumentClass::MiSeq => {
            let dir = run_dir.join("Data/Intensities/BaseCalls");
            dir.is_dir().then_some(dir)
        }
        InstrumentClass::NextSeq => {
            let mut candidates = runwatch_adapters::fs::find_by_glob(run_dir, "Analysis/*/Data/fastq");
            candidates.sort();
            candidates.pop()
        }
        InstrumentClass::Unknown => None,
    }
}

/// Finds the R1/R2 fastq files for `lib_id` within `fastq_dir`.
fn find_reads(fastq_dir: &Path, lib_id: &str) -> (Option<PathBuf>, Option<PathBuf>) {
    let escaped = regex::escape(lib_id);
    let r1_re = Regex::new(&format!(r"^{escaped}_S\d+_L\d+_R1_\d+\.fastq\.gz$")).ok();
    let r2_re = Regex::new(&format!(r"^{escaped}_S\d+_L\d+_R2_\d+\.fastq\.gz$")).ok();

    let mut r1 = None;
    let mut r2 = None;
    for entry in runwatch_adapters::fs::list_directory(fastq_dir) {
        let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if r1_re.as_ref().is_some_and(|re| re.is_match(name)) {
            r1 = Some(entry.clone());
        }
        if r2_re.as_ref().is_some_and(|re| re.is_match(name)) {
            r2 = Some(entry);
        }
    }
    (r1, r2)
}

pub struct LinkMaterializer {
    project_id: String,
    symlinks_root: PathBuf,
    reader: Arc<dyn SampleSheetReader>,
    exclusions: Arc<ExclusionRegistry>,
    progress: Arc<ProgressRegistry>,
    bus: Arc<Bus>,
}

impl LinkMaterializer {
    pub fn new(
        project_id: String,
        symlinks_root: PathBuf,
        reader: Arc<dyn SampleSheetReader>,
        exclusions: Arc<ExclusionRegistry>,
        progress: Arc<ProgressRegistry>,
        bus: Arc<Bus>,
    ) -> Self {
        Self {
            project_id,
            symlinks_root,
            reader,
            exclusions,
            progress,
            bus,
        }
    }

    /// Processes one run directory: resolves libraries-of-interest,
    /// materializes symlinks for each, and returns the library ids that
    /// were newly linked (for tests and for the caller to publish events).
    fn process_run(&self, run_dir: &Path) -> Result<Vec<(LibraryId, SymlinkPaths)>, CoreError> {
        let basename = run_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let class = classify(basename);
        let (section_header, project_col, lib_col) = sample_sheet_columns(class)
            .ok_or_else(|| CoreError::UnknownInstrumentClass(basename.to_string()))?;

        let sheets = runwatch_adapters::fs::find_by_glob(run_dir, "SampleSheet*.csv");
        let sheet_path = sheets
            .first()
            .ok_or_else(|| CoreError::SampleSheetMissing(run_dir.to_path_buf()))?;
        let contents = std::fs::read_to_string(sheet_path)?;
        let lines: Vec<String> = contents.lines().map(str::to_string).collect();

        let libraries =
            self.reader
                .libraries_of_interest(&lines, section_header, &self.project_id, project_col, lib_col);

        let fastq_dir = locate_fastq_dir(run_dir, class)
            .ok_or_else(|| CoreError::FastqDirMissing(run_dir.to_path_buf()))?;

        let mut created = Vec::new();
        for lib_id in libraries {
            if self.exclusions.is_library_excluded(&lib_id) {
                continue;
            }

            let year = year_of(lib_id.as_str()).unwrap_or_else(current_year_partition);
            let dest_r1 = self.symlinks_root.join(&year).join(format!("{lib_id}_R1.fastq.gz"));
            let dest_r2 = self.symlinks_root.join(&year).join(format!("{lib_id}_R2.fastq.gz"));
            if dest_r1.exists() && dest_r2.exists() {
                continue;
            }

            let (r1, r2) = find_reads(&fastq_dir, lib_id.as_str());
            let (Some(r1), Some(r2)) = (r1, r2) else {
                warn!(library = %lib_id, "could not locate both read files, skipping");
                continue;
            };

            runwatch_adapters::fs::symlink(Some(&r1), Some(&dest_r1));
            runwatch_adapters::fs::symlink(Some(&r2), Some(&dest_r2));

            if !dest_r1.exists() || !dest_r2.exists() {
                warn!(library = %lib_id, "partial symlink, not publishing symlinks-created");
                continue;
            }

            created.push((
                lib_id,
                SymlinkPaths {
                    r1: dest_r1,
                    r2: dest_r2,
                },
            ));
        }

        Ok(created)
    }

    /// Handles one `run-directory-found` event end to end: materialize,
    /// publish per-library `symlinks-created` events, mark the run promoted.
    async fn handle_run_found(&self, run_dir: &Path) {
        let run_id = run_dir
            .file_name()
            .and_then(|n| n.to_str())
            .map(|s| RunId::from(s.to_string()));

        match self.process_run(run_dir) {
            Ok(created) => {
                for (id, symlink_paths) in created {
                    info!(library = %id, "symlinks created");
                    let event = Event::SymlinksCreated { id, symlink_paths };
                    for topic in event.topics() {
                        self.bus
                            .publish(runwatch_core::BusMessage::event(*topic, chrono::Utc::now(), event.clone()))
                            .await;
                    }
                }
            }
            Err(err) => {
                warn!(run = %run_dir.display(), error = %err, "failed to materialize run");
            }
        }

        if let Some(run_id) = run_id {
            self.progress.mark_promoted(run_id);
        }
    }

    /// Drains `subscriber` (expected to be subscribed to the symlinking
    /// topic) until the channel closes or `stop` fires.
    pub async fn run_loop(self: Arc<Self>, mut subscriber: Subscriber, stop: CancellationToken) {
        loop {
            tokio::select! {
                msg = subscriber.recv() => {
                    let Some(msg) = msg else { break };
                    if let Payload::Event(Event::RunDirectoryFound { run_dir }) = msg.payload {
                        self.handle_run_found(&run_dir).await;
                    }
                }
                _ = stop.cancelled() => break,
            }
        }
    }
}

#[cfg(test)]
#[path = "materialize_tests.rs"]
mod tests;
