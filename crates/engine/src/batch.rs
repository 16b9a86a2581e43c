// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C7: the stage batcher — turns the `analysis` subscriber channel into a
//! channel of size/timeout-bounded batches.

use crate::bus::Subscriber;
use runwatch_core::BusMessage;
use std::time::Duration;
use tokio::sync::mpsc;

pub struct StageBatcher {
    max_size: usize,
    timeout: Duration,
}

impl StageBatcher {
    pub fn new(max_size: usize, timeout: Duration) -> Self {
        Self { max_size, timeout }
    }

    /// Consumes `subscriber`, sending a batch to `out` whenever `max_size`
    /// messages have accumulated or `timeout` has elapsed since the
    /// batch's first message, whichever comes first. Never sends an empty
    /// batch. When `subscriber`'s channel closes, flushes any partial
    /// batch, then returns (dropping `out` closes the downstream channel).
    pub async fn run_loop(&self, mut subscriber: Subscriber, out: mpsc::Sender<Vec<BusMessage>>) {
        loop {
            let Some(first) = subscriber.recv().await else {
                return;
            };
            let mut batch = vec![first];

            let deadline = tokio::time::sleep(self.timeout);
            tokio::pin!(deadline);

            loop {
                if batch.len() >= self.max_size {
                    break;
                }
                tokio::select! {
                    msg = subscriber.recv() => {
                        match msg {
                            Some(msg) => batch.push(msg),
                            None => {
                                let _ = out.send(batch).await;
                                return;
                            }
                        }
                    }
                    _ = &mut deadline => break,
                }
            }

            if out.send(batch).await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
