// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error kinds shared across crate boundaries.
//!
//! Per spec, no error crosses a component boundary as a thrown exception —
//! every fallible operation returns one of these and the caller decides
//! whether to log-and-skip or (CLI-level config errors only) exit.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown instrument class for run id {0:?}")]
    UnknownInstrumentClass(String),

    #[error("sample sheet not found under {0:?}")]
    SampleSheetMissing(std::path::PathBuf),

    #[error("fastq directory not found under {0:?}")]
    FastqDirMissing(std::path::PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
