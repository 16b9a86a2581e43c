// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event/topic model that flows over the bus (C6).
//!
//! Serializes with `{"event": "event:name", ...fields}` so the shape on the
//! wire mirrors the field-driven routing the spec describes. Unknown tags
//! deserialize to `Custom` rather than failing, in case an older component
//! publishes a payload a newer one doesn't know about.

use crate::ids::LibraryId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Topics in use on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Symlinking,
    Analysis,
    Logging,
}

/// Severity of a [`LogRecord`], mapped 1:1 to a `tracing` level by the
/// logging consumer (C9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

/// A free-text log line published to the `logging` topic by any component,
/// distinct from a domain [`Event`] that happens to also be routed there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub level: LogLevel,
    pub payload: String,
}

impl LogRecord {
    pub fn new(level: LogLevel, payload: impl Into<String>) -> Self {
        Self {
            level,
            payload: payload.into(),
        }
    }

    pub fn info(payload: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, payload)
    }

    pub fn warn(payload: impl Into<String>) -> Self {
        Self::new(LogLevel::Warn, payload)
    }

    pub fn error(payload: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, payload)
    }
}

/// Paths of a materialized R1/R2 symlink pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymlinkPaths {
    pub r1: PathBuf,
    pub r2: PathBuf,
}

/// Events that trigger state transitions in the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum Event {
    #[serde(rename = "run-directory-found")]
    RunDirectoryFound { run_dir: PathBuf },

    #[serde(rename = "symlinks-created")]
    SymlinksCreated {
        id: LibraryId,
        symlink_paths: SymlinkPaths,
    },

    #[serde(rename = "analysis-started")]
    AnalysisStarted {
        pipeline_name: String,
        /// Per-invocation id (a UUID), not a library id: this bookkeeping
        /// event tracks one external-runner invocation, which may cover
        /// many libraries in a year-partition.
        id: String,
    },

    #[serde(rename = "analysis-completed")]
    AnalysisCompleted {
        pipeline_name: String,
        pipeline_version: String,
        id: String,
        outdir: PathBuf,
    },

    #[serde(rename = "assembly-completed")]
    AssemblyCompleted {
        id: LibraryId,
        r1_path: PathBuf,
        r2_path: PathBuf,
        assembly_path: PathBuf,
        assembly_tool: String,
        annotation_tool: String,
    },

    #[serde(rename = "mlst-completed")]
    MlstCompleted {
        id: LibraryId,
        mlst_sequence_type_path: PathBuf,
    },

    #[serde(rename = "plasmid-screen-completed")]
    PlasmidScreenCompleted {
        id: LibraryId,
        resistance_gene_report_path: PathBuf,
    },

    /// Catch-all for unknown event tags (extensibility).
    #[serde(other, skip_serializing)]
    Custom,
}

impl Event {
    /// The topics this event is routed to, mirroring spec.md's §3/§4.5/§4.8
    /// per-kind routing table exactly (`symlinks-created` is the only event
    /// that is simultaneously visible on all three topics).
    pub fn topics(&self) -> &'static [Topic] {
        match self {
            Event::RunDirectoryFound { .. } => &[Topic::Symlinking],
            Event::SymlinksCreated { .. } => {
                &[Topic::Symlinking, Topic::Analysis, Topic::Logging]
            }
            Event::AnalysisStarted { .. }
            | Event::AnalysisCompleted { .. }
            | Event::AssemblyCompleted { .. }
            | Event::MlstCompleted { .. }
            | Event::PlasmidScreenCompleted { .. } => &[Topic::Analysis, Topic::Logging],
            Event::Custom => &[],
        }
    }

    /// The library id a completion event carries, canonicalized to a single
    /// field regardless of the event kind (resolves spec.md §9 open
    /// question 2: downstream code must not special-case field naming).
    pub fn library_id(&self) -> Option<&LibraryId> {
        match self {
            Event::SymlinksCreated { id, .. }
            | Event::AssemblyCompleted { id, .. }
            | Event::MlstCompleted { id, .. }
            | Event::PlasmidScreenCompleted { id, .. } => Some(id),
            _ => None,
        }
    }
}

/// The payload carried by a [`BusMessage`]: either a domain event or a
/// free-text log record.
#[derive(Debug, Clone)]
pub enum Payload {
    Event(Event),
    Log(LogRecord),
}

/// A message as it exists once admitted to the bus: a topic, a monotonic
/// timestamp, and a payload.
#[derive(Debug, Clone)]
pub struct BusMessage {
    pub topic: Topic,
    pub timestamp: DateTime<Utc>,
    pub payload: Payload,
}

impl BusMessage {
    pub fn event(topic: Topic, timestamp: DateTime<Utc>, event: Event) -> Self {
        Self {
            topic,
            timestamp,
            payload: Payload::Event(event),
        }
    }

    pub fn log(timestamp: DateTime<Utc>, record: LogRecord) -> Self {
        Self {
            topic: Topic::Logging,
            timestamp,
            payload: Payload::Log(record),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
