// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Small string helpers shared across the engine.

/// Removes a trailing occurrence of `suffix` from `s`, if present.
///
/// Idempotent: applying it twice is the same as applying it once, since the
/// second application finds nothing left to strip. An empty `suffix` is a
/// no-op (every string "ends with" the empty string, but stripping it would
/// change nothing anyway).
pub fn remove_suffix<'a>(s: &'a str, suffix: &str) -> &'a str {
    if suffix.is_empty() {
        return s;
    }
    s.strip_suffix(suffix).unwrap_or(s)
}
