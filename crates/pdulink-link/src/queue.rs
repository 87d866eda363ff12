//! Bounded FIFO between the read loop and a telemetry consumer.
//!
//! The producer side is a [`QueueSink`] plugged into the controller; the
//! consumer side is a [`TelemetryReceiver`] drained at whatever cadence the
//! presentation layer runs. Items are owned values, so nothing the read loop
//! does after a push is visible to the consumer.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use pdulink_schema::PowerEvent;
use serde::Serialize;
use tracing::warn;

use crate::sink::TelemetrySink;
use crate::snapshot::Telemetry;

/// What to do when the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backpressure {
    /// Stall the read loop until the consumer makes room. Nothing is
    /// dropped here, but a stalled reader lets the OS serial buffer overflow.
    Block,
    /// Evict the oldest queued item. The consumer always sees the latest state.
    #[default]
    DropOldest,
    /// Discard the incoming item and keep what is queued.
    DropNewest,
}

impl fmt::Display for Backpressure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Backpressure::Block => "block",
            Backpressure::DropOldest => "drop-oldest",
            Backpressure::DropNewest => "drop-newest",
        })
    }
}

impl FromStr for Backpressure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "block" => Ok(Backpressure::Block),
            "drop-oldest" | "drop_oldest" => Ok(Backpressure::DropOldest),
            "drop-newest" | "drop_newest" => Ok(Backpressure::DropNewest),
            other => Err(format!(
                "unknown backpressure policy '{other}' (expected block, drop-oldest or drop-newest)"
            )),
        }
    }
}

/// One item handed to the consumer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LinkMessage {
    Telemetry(Telemetry),
    Event(PowerEvent),
}

struct State {
    items: VecDeque<LinkMessage>,
    dropped: u64,
    producer_gone: bool,
    consumer_gone: bool,
}

struct Shared {
    capacity: usize,
    policy: Backpressure,
    state: Mutex<State>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Create a bounded queue holding at most `capacity` items (minimum 1).
pub fn telemetry_queue(capacity: usize, policy: Backpressure) -> (QueueSink, TelemetryReceiver) {
    let capacity = capacity.max(1);
    let shared = Arc::new(Shared {
        capacity,
        policy,
        state: Mutex::new(State {
            items: VecDeque::with_capacity(capacity),
            dropped: 0,
            producer_gone: false,
            consumer_gone: false,
        }),
        not_empty: Condvar::new(),
        not_full: Condvar::new(),
    });
    (
        QueueSink {
            shared: Arc::clone(&shared),
        },
        TelemetryReceiver { shared },
    )
}

/// Producer half; implements [`TelemetrySink`].
pub struct QueueSink {
    shared: Arc<Shared>,
}

impl QueueSink {
    /// Enqueue one item according to the backpressure policy.
    ///
    /// Returns `false` if the item was not queued (dropped, or no consumer).
    pub fn push(&self, message: LinkMessage) -> bool {
        let shared = &*self.shared;
        let mut state = shared.lock();

        if state.consumer_gone {
            return false;
        }

        if state.items.len() >= shared.capacity {
            match shared.policy {
                Backpressure::Block => {
                    while state.items.len() >= shared.capacity && !state.consumer_gone {
                        state = shared
                            .not_full
                            .wait(state)
                            .unwrap_or_else(PoisonError::into_inner);
                    }
                    if state.consumer_gone {
                        return false;
                    }
                }
                Backpressure::DropOldest => {
                    state.items.pop_front();
                    state.dropped += 1;
                    warn!(dropped = state.dropped, "telemetry queue full; evicted oldest item");
                }
                Backpressure::DropNewest => {
                    state.dropped += 1;
                    warn!(dropped = state.dropped, "telemetry queue full; discarded newest item");
                    return false;
                }
            }
        }

        state.items.push_back(message);
        drop(state);
        shared.not_empty.notify_one();
        true
    }
}

impl TelemetrySink for QueueSink {
    fn on_telemetry(&mut self, telemetry: Telemetry) {
        self.push(LinkMessage::Telemetry(telemetry));
    }

    fn on_event(&mut self, event: PowerEvent) {
        self.push(LinkMessage::Event(event));
    }
}

impl Drop for QueueSink {
    fn drop(&mut self) {
        self.shared.lock().producer_gone = true;
        self.shared.not_empty.notify_all();
    }
}

/// Consumer half. Never blocks the producer except under [`Backpressure::Block`].
pub struct TelemetryReceiver {
    shared: Arc<Shared>,
}

impl TelemetryReceiver {
    /// Take the oldest item, if any.
    pub fn try_recv(&self) -> Option<LinkMessage> {
        let message = self.shared.lock().items.pop_front();
        if message.is_some() {
            self.shared.not_full.notify_one();
        }
        message
    }

    /// Wait up to `timeout` for an item.
    ///
    /// Returns `None` on timeout or once the producer is gone and the queue
    /// is empty.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<LinkMessage> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.lock();
        loop {
            if let Some(message) = state.items.pop_front() {
                drop(state);
                self.shared.not_full.notify_one();
                return Some(message);
            }
            if state.producer_gone {
                return None;
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            state = self
                .shared
                .not_empty
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Take everything queued right now, oldest first.
    pub fn drain(&self) -> Vec<LinkMessage> {
        let items: Vec<LinkMessage> = self.shared.lock().items.drain(..).collect();
        if !items.is_empty() {
            self.shared.not_full.notify_all();
        }
        items
    }

    /// Items currently queued.
    pub fn len(&self) -> usize {
        self.shared.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items lost to the backpressure policy so far.
    pub fn dropped(&self) -> u64 {
        self.shared.lock().dropped
    }

    /// True once the producer (and therefore the read loop) is gone.
    pub fn is_disconnected(&self) -> bool {
        self.shared.lock().producer_gone
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn policy(&self) -> Backpressure {
        self.shared.policy
    }

    /// Stop accepting items and release a producer blocked on a full queue.
    ///
    /// Items already queued stay readable; later pushes are refused.
    pub fn close(&self) {
        self.shared.lock().consumer_gone = true;
        self.shared.not_full.notify_all();
    }
}

impl Drop for TelemetryReceiver {
    fn drop(&mut self) {
        self.close();
    }
}
