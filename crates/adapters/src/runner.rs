// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The external workflow runner.
//!
//! Spec.md §1 puts "the external workflow runner itself and the scientific
//! pipelines it executes" out of scope: the core only constructs inputs,
//! invokes the runner, and interprets completion by the presence of marker
//! files. [`PipelineRunner`] is that invocation boundary; the reference
//! implementation shells out to a configurable executable (`nextflow` by
//! default) via `tokio::process`.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to open log file {0:?}: {1}")]
    LogFile(PathBuf, #[source] std::io::Error),

    #[error("failed to spawn {0:?}: {1}")]
    Spawn(String, #[source] std::io::Error),

    #[error("failed to wait on {0:?}: {1}")]
    Wait(String, #[source] std::io::Error),
}

/// One invocation of an external pipeline over a single (kind, year)
/// partition of libraries.
#[derive(Debug, Clone)]
pub struct PipelineInvocation {
    /// Short pipeline name, e.g. `routine-assembly`, used only for logging
    /// and the runner log filename.
    pub pipeline: String,
    /// Fixed arguments plus the pipeline-specific flags resolved from
    /// configuration (version tag, tool choices, database paths).
    pub args: Vec<String>,
    /// Per-invocation work directory (`work-<pipeline>-<uuid>`), removed by
    /// the caller after the invocation returns.
    pub work_dir: PathBuf,
    /// Where stdout/stderr from this invocation are appended.
    pub log_path: PathBuf,
}

/// The outcome of a runner invocation.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOutcome {
    pub exit_code: i32,
}

impl PipelineOutcome {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Invokes an external workflow runner and reports its outcome.
///
/// A non-zero exit is reported, not retried: per spec.md §7, the caller is
/// responsible for skipping completion-event publication and leaving the
/// library without a marker file.
#[async_trait]
pub trait PipelineRunner: Send + Sync {
    async fn run(&self, invocation: &PipelineInvocation) -> Result<PipelineOutcome, RunnerError>;
}

/// Shells out to a configurable workflow-runner executable.
#[derive(Debug, Clone)]
pub struct ProcessPipelineRunner {
    /// Path or bare name of the runner executable (e.g. `nextflow`).
    pub executable: PathBuf,
}

impl ProcessPipelineRunner {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }
}

impl Default for ProcessPipelineRunner {
    fn default() -> Self {
        Self::new("nextflow")
    }
}

#[async_trait]
impl PipelineRunner for ProcessPipelineRunner {
    async fn run(&self, invocation: &PipelineInvocation) -> Result<PipelineOutcome, RunnerError> {
        let mut log = File::create(&invocation.log_path)
            .await
            .map_err(|e| RunnerError::LogFile(invocation.log_path.clone(), e))?;

        let exe_display = self.executable.display().to_string();

        let output = Command::new(&self.executable)
            .args(&invocation.args)
            .current_dir(&invocation.work_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| RunnerError::Spawn(exe_display.clone(), e))?;

        log.write_all(&output.stdout)
            .await
            .map_err(|e| RunnerError::Wait(exe_display.clone(), e))?;
        log.write_all(&output.stderr)
            .await
            .map_err(|e| RunnerError::Wait(exe_display, e))?;

        Ok(PipelineOutcome {
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
