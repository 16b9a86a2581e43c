// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C6: the event bus — topic-keyed publish/subscribe fan-out over bounded
//! `tokio::sync::mpsc` channels.
//!
//! Built from scratch rather than reusing a WAL-backed single-stream event
//! store: this bus needs multi-subscriber fan-out per topic with visible
//! back-pressure, not crash-recoverable replay.

use parking_lot::Mutex;
use runwatch_core::{BusMessage, Topic};
use std::collections::HashMap;
use tokio::sync::mpsc;

/// A subscriber's inbox for one topic.
pub struct Subscriber {
    receiver: mpsc::Receiver<BusMessage>,
}

impl Subscriber {
    pub async fn recv(&mut self) -> Option<BusMessage> {
        self.receiver.recv().await
    }
}

/// Publishes to every current subscriber of a message's topic. Delivery to
/// a single subscriber is FIFO; publishing blocks (providing back-pressure)
/// when a subscriber's channel is full.
pub struct Bus {
    capacity: usize,
    subscribers: Mutex<HashMap<Topic, Vec<mpsc::Sender<BusMessage>>>>,
}

impl Bus {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    pub fn subscribe(&self, topic: Topic) -> Subscriber {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.subscribers.lock().entry(topic).or_default().push(tx);
        Subscriber { receiver: rx }
    }

    /// Delivers `msg` to every subscriber of `msg.topic`, cloning it once
    /// per subscriber. Dead subscribers (receiver dropped) are pruned
    /// lazily on the next publish to that topic.
    pub async fn publish(&self, msg: BusMessage) {
        let senders: Vec<mpsc::Sender<BusMessage>> = {
            let subs = self.subscribers.lock();
            subs.get(&msg.topic).cloned().unwrap_or_default()
        };

        let mut dead = Vec::new();
        for (idx, sender) in senders.iter().enumerate() {
            if sender.send(msg.clone()).await.is_err() {
                dead.push(idx);
            }
        }

        if !dead.is_empty() {
            let mut subs = self.subscribers.lock();
            if let Some(list) = subs.get_mut(&msg.topic) {
                for idx in dead.into_iter().rev() {
                    list.remove(idx);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
