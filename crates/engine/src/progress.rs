// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C3: process-local memory of runs already promoted. Deliberately
//! volatile — durable state lives only in symlinks and marker files, and
//! a restart simply re-scans (see C5's destination-exists check).

use parking_lot::Mutex;
use runwatch_core::RunId;
use std::collections::HashSet;

#[derive(Default)]
pub struct ProgressRegistry {
    promoted: Mutex<HashSet<RunId>>,
}

impl ProgressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_promoted(&self, id: &RunId) -> bool {
        self.promoted.lock().contains(id)
    }

    pub fn mark_promoted(&self, id: RunId) {
        self.promoted.lock().insert(id);
    }
}
