// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! runwatch-engine: the watch/publish/dispatch core (C2–C9).
//!
//! Discovery, link materialization, the event bus, batching, and per-stage
//! dispatch all live here. The supervisor that wires these tasks together
//! (C10) lives in `runwatch-daemon`; CLI/config parsing live further out
//! still.

pub mod batch;
pub mod bus;
pub mod dispatch;
pub mod discover;
pub mod exclusion;
pub mod logging_consumer;
pub mod materialize;
pub mod progress;

pub use batch::StageBatcher;
pub use bus::{Bus, Subscriber};
pub use dispatch::StageDispatcher;
pub use discover::RunDiscoverer;
pub use exclusion::ExclusionRegistry;
pub use logging_consumer::LoggingConsumer;
pub use materialize::LinkMaterializer;
pub use progress::ProgressRegistry;
