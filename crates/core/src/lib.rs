// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! runwatch-core: shared domain model for the runwatch daemon.
//!
//! Pure, dependency-light types shared by every other crate: run/library
//! identity and classification, the event/topic model that flows through
//! the bus, the `Clock` abstraction, and the error kinds that cross
//! component boundaries as values rather than exceptions.

pub mod clock;
pub mod error;
pub mod event;
pub mod ids;
pub mod run;
pub mod strutil;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use error::CoreError;
pub use event::{BusMessage, Event, LogLevel, LogRecord, Payload, SymlinkPaths, Topic};
pub use ids::{LibraryId, RunId};
pub use run::{classify, is_run_name, year_of, InstrumentClass, Run};
pub use strutil::remove_suffix;
