// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fakes for exercising the engine without a real runner or sample sheet.

use crate::runner::{PipelineInvocation, PipelineOutcome, PipelineRunner, RunnerError};
use crate::samplesheet::SampleSheetReader;
use async_trait::async_trait;
use runwatch_core::LibraryId;
use std::sync::Mutex;

/// A pipeline runner that always succeeds (or is configured to fail) and
/// records every invocation it was asked to perform, for assertions.
#[derive(Default)]
pub struct FakePipelineRunner {
    pub exit_code: i32,
    pub invocations: Mutex<Vec<PipelineInvocation>>,
}

impl FakePipelineRunner {
    pub fn succeeding() -> Self {
        Self {
            exit_code: 0,
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(exit_code: i32) -> Self {
        Self {
            exit_code,
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.invocations.lock().expect("lock poisoned").len()
    }
}

#[async_trait]
impl PipelineRunner for FakePipelineRunner {
    async fn run(&self, invocation: &PipelineInvocation) -> Result<PipelineOutcome, RunnerError> {
        self.invocations
            .lock()
            .expect("lock poisoned")
            .push(invocation.clone());
        Ok(PipelineOutcome {
            exit_code: self.exit_code,
        })
    }
}

/// A sample-sheet reader that returns a fixed list of library ids
/// regardless of input, for tests that don't care about CSV parsing.
pub struct FakeSampleSheetReader {
    pub libraries: Vec<LibraryId>,
}

impl FakeSampleSheetReader {
    pub fn returning(libraries: Vec<LibraryId>) -> Self {
        Self { libraries }
    }
}

impl SampleSheetReader for FakeSampleSheetReader {
    fn libraries_of_interest(
        &self,
        _lines: &[String],
        _section_header: &str,
        _project_id: &str,
        _project_id_col: usize,
        _library_id_col: usize,
    ) -> Vec<LibraryId> {
        self.libraries.clone()
    }
}
