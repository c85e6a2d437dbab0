//! Cross-thread hand-off of inbound messages to the application loop.
//!
//! # Why a relay? (for beginners)
//!
//! Socket reads complete on an I/O task that may run on any runtime worker
//! thread.  Game and UI code, on the other hand, is single-threaded: it runs
//! once per frame ("tick") and must never observe state changing underneath
//! it.  The relay is the boundary between the two worlds:
//!
//! ```text
//! I/O task(s)                     application thread
//! ───────────                     ──────────────────
//! push(msg) ──▶ [ m1 m2 m3 ] ──▶ drain_once(|msg| dispatch(msg))   (once per tick)
//! ```
//!
//! `push` never blocks for longer than one short critical section, and
//! `drain_once` never waits for new messages: it processes whatever is
//! queued *now* and returns.
//!
//! # Duplicate suppression
//!
//! Low-level deliveries can repeat or arrive out of order.  The relay keeps
//! the highest timestamp it has accepted and drops any pushed message whose
//! timestamp is not strictly greater.  Equal timestamps count as duplicates.
//! The comparison and the enqueue happen under the same lock, so two
//! concurrent pushes of the same message cannot both pass the check.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tracing::debug;

use crate::protocol::message::Message;

/// Result of [`InboundRelay::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The message was queued for the next drain.
    Accepted,
    /// The message was dropped because its timestamp was not newer than the
    /// last accepted one.
    Duplicate { timestamp: u64, last_accepted: u64 },
}

#[derive(Debug, Default)]
struct RelayState {
    queue: VecDeque<Message>,
    last_accepted: Option<u64>,
}

/// Thread-safe, multi-producer / single-consumer message hand-off buffer.
#[derive(Debug, Default)]
pub struct InboundRelay {
    state: Mutex<RelayState>,
}

impl InboundRelay {
    /// Creates an empty relay with no accepted timestamp yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues `message` unless it is a duplicate.  Callable from any thread.
    pub fn push(&self, message: Message) -> PushOutcome {
        let mut state = self.state.lock();

        if let Some(last) = state.last_accepted {
            if message.timestamp <= last {
                debug!(
                    "relay dropped {} (timestamp {} <= last accepted {last})",
                    message.head.operation_code, message.timestamp
                );
                return PushOutcome::Duplicate {
                    timestamp: message.timestamp,
                    last_accepted: last,
                };
            }
        }

        state.last_accepted = Some(message.timestamp);
        state.queue.push_back(message);
        PushOutcome::Accepted
    }

    /// Processes every message queued at the moment of the call, in FIFO
    /// order, and returns how many were processed.
    ///
    /// The queue is taken under the lock and `handle` runs after the lock is
    /// released, so I/O pushes are never blocked by handler work.  Messages
    /// pushed while `handle` is running are left for the next drain.
    pub fn drain_once<F>(&self, mut handle: F) -> usize
    where
        F: FnMut(Message),
    {
        let batch = std::mem::take(&mut self.state.lock().queue);
        let count = batch.len();
        for message in batch {
            handle(message);
        }
        count
    }

    /// Number of messages waiting for the next drain.
    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Returns `true` if nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.state.lock().queue.is_empty()
    }

    /// Highest timestamp accepted so far, if any.
    pub fn last_accepted(&self) -> Option<u64> {
        self.state.lock().last_accepted
    }

    /// Drops every queued message but keeps the duplicate high-water mark.
    pub fn clear(&self) {
        self.state.lock().queue.clear();
    }

    /// Drops every queued message *and* forgets the high-water mark.
    ///
    /// Used when a new connection is established: a restarted server may
    /// legitimately stamp messages lower than the previous session did.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.queue.clear();
        state.last_accepted = None;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
