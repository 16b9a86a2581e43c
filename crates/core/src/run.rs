// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run identity, classification, and year extraction.

use crate::ids::RunId;
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;

/// `YYYYMMDD_<INSTRUMENT>_<NUM>_<FLOWCELL>`, e.g.
/// `220207_M00123_0123_000000000-A7TRG` or `220207_VH00123_23_A7TY6AG73`.
static RUN_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{6}_[A-Za-z0-9]+_[0-9]+_[A-Za-z0-9-]+$").expect("valid run-name regex")
});

/// `BC(\d{2})[A-Z]` — the two-digit collection year embedded in a library id.
static LIBRARY_YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"BC(\d{2})[A-Z]").expect("valid library-year regex"));

/// Instrument family a run was produced on, derived from the run-id prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentClass {
    MiSeq,
    NextSeq,
    Unknown,
}

/// A sequencing-instrument output directory discovered on disk.
#[derive(Debug, Clone)]
pub struct Run {
    pub id: RunId,
    pub path: PathBuf,
}

impl Run {
    pub fn new(path: PathBuf) -> Option<Self> {
        let basename = path.file_name()?.to_str()?;
        if !is_run_name(basename) {
            return None;
        }
        Some(Self {
            id: RunId::from(basename),
            path,
        })
    }

    pub fn instrument_class(&self) -> InstrumentClass {
        classify(self.id.as_str())
    }
}

/// Returns true if `name` matches the run-directory naming convention.
pub fn is_run_name(name: &str) -> bool {
    RUN_NAME_RE.is_match(name)
}

/// Classifies a run-id by its instrument-prefix token (the second
/// underscore-delimited field): `M…` → MiSeq, `VH…` → NextSeq, else Unknown.
///
/// A run-id that does not even match the run-name shape classifies as
/// `Unknown` rather than panicking — callers that need the naming
/// precondition should check [`is_run_name`] first.
pub fn classify(run_id: &str) -> InstrumentClass {
    let Some(instrument_token) = run_id.split('_').nth(1) else {
        return InstrumentClass::Unknown;
    };
    if instrument_token.starts_with('M') {
        InstrumentClass::MiSeq
    } else if instrument_token.starts_with("VH") {
        InstrumentClass::NextSeq
    } else {
        InstrumentClass::Unknown
    }
}

/// Extracts the two-digit collection year from a library id matching
/// `BC(\d{2})[A-Z]`. Returns `None` when the pattern is absent; callers
/// fall back to the current two-digit year.
pub fn year_of(library_id: &str) -> Option<String> {
    LIBRARY_YEAR_RE
        .captures(library_id)
        .map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_run_names() {
        assert!(is_run_name("220207_M00123_0123_000000000-A7TRG"));
        assert!(is_run_name("220207_VH00123_23_A7TY6AG73"));
    }

    #[test]
    fn rejects_malformed_names() {
        assert!(!is_run_name("not-a-run"));
        assert!(!is_run_name("220207"));
        assert!(!is_run_name(""));
    }

    #[yare::parameterized(
        miseq      = { "220207_M00123_0123_000000000-A7TRG", InstrumentClass::MiSeq },
        nextseq    = { "220207_VH00123_23_A7TY6AG73", InstrumentClass::NextSeq },
        other_prefix = { "220207_X00123_23_A7TY6AG73", InstrumentClass::Unknown },
        no_underscore = { "garbage", InstrumentClass::Unknown },
    )]
    fn classifies_by_instrument_prefix(run_id: &str, expected: InstrumentClass) {
        assert_eq!(classify(run_id), expected);
    }

    #[test]
    fn year_of_extracts_two_digits() {
        assert_eq!(year_of("BC21A001A").as_deref(), Some("21"));
        assert_eq!(year_of("BC22A002A").as_deref(), Some("22"));
    }

    #[test]
    fn year_of_none_when_absent() {
        assert_eq!(year_of("no-year-here"), None);
    }

    #[test]
    fn run_from_path_rejects_non_run_directory() {
        assert!(Run::new(PathBuf::from("/runs/not-a-run")).is_none());
    }

    #[test]
    fn run_from_path_accepts_run_directory() {
        let run = Run::new(PathBuf::from("/runs/220207_M00123_0123_000000000-A7TRG"))
            .expect("valid run directory");
        assert_eq!(run.id.as_str(), "220207_M00123_0123_000000000-A7TRG");
        assert_eq!(run.instrument_class(), InstrumentClass::MiSeq);
    }

    proptest::proptest! {
        #[test]
        fn classifier_never_panics(s in "\\PC*") {
            let _ = classify(&s);
        }
    }
}
