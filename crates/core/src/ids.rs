// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifiers derived from filesystem and sample-sheet strings.
//!
//! Unlike a generated entity id, a [`RunId`] or [`LibraryId`] is never
//! minted by us — it is always parsed out of a directory basename or a
//! sample-sheet row, so these are thin, allocation-backed newtypes rather
//! than the nanoid-style `define_id!` wrapper used for synthesized ids
//! elsewhere in the stack (see `runwatch-engine::dispatch` for the one id
//! in this system that *is* generated: the per-pipeline-invocation UUID).

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }
    };
}

string_id!(
    /// The basename of a run directory, e.g. `220207_M00123_0123_000000000-A7TRG`.
    RunId
);

string_id!(
    /// A library identifier matched against a sample-sheet row, e.g. `BC21A001A`.
    LibraryId
);
