// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C9: the logging consumer — drains the `logging` topic and emits one
//! `tracing` event per payload. Never back-pressures the bus beyond its
//! own subscriber channel capacity.

use crate::bus::Subscriber;
use runwatch_core::{Event, LogLevel, Payload};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub struct LoggingConsumer;

impl LoggingConsumer {
    pub fn new() -> Self {
        Self
    }

    fn emit(record: &runwatch_core::LogRecord) {
        match record.level {
            LogLevel::Error => error!(target: "runwatch", "{}", record.payload),
            LogLevel::Warn => warn!(target: "runwatch", "{}", record.payload),
            LogLevel::Info => info!(target: "runwatch", "{}", record.payload),
            LogLevel::Debug => debug!(target: "runwatch", "{}", record.payload),
        }
    }

    /// Drains `subscriber` until it closes or `stop` fires. A domain
    /// [`Event`] routed to this topic (e.g. `symlinks-created`, which is
    /// visible on `logging` too) is logged at info level by its debug
    /// representation rather than dropped.
    pub async fn run_loop(&self, mut subscriber: Subscriber, stop: CancellationToken) {
        loop {
            tokio::select! {
                msg = subscriber.recv() => {
                    let Some(msg) = msg else { break };
                    match msg.payload {
                        Payload::Log(record) => Self::emit(&record),
                        Payload::Event(event) => Self::emit_event(&event),
                    }
                }
                _ = stop.cancelled() => break,
            }
        }
    }

    fn emit_event(event: &Event) {
        info!(target: "runwatch", event = ?event, "domain event");
    }
}

impl Default for LoggingConsumer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "logging_consumer_tests.rs"]
mod tests;
