//! Backpressure send queue: one write in flight, the rest in FIFO order.
//!
//! # Why serialize writes? (for beginners)
//!
//! Two overlapping asynchronous writes on one socket can interleave their
//! bytes, corrupting both frames.  The protocol therefore allows exactly one
//! write in flight per connection.  Callers must not be blocked while a write
//! is pending (the game loop cannot stall on the network), so extra frames
//! are parked in a queue and released one by one as writes complete:
//!
//! ```text
//! send(b1) ──▶ Issue(b1)            in flight: b1   queue: []
//! send(b2) ──▶ Queued { depth: 1 }  in flight: b1   queue: [b2]
//! send(b3) ──▶ Queued { depth: 2 }  in flight: b1   queue: [b2, b3]
//! b1 done  ──▶ Next(b2)             in flight: b2   queue: [b3]
//! b2 done  ──▶ Next(b3)             in flight: b3   queue: []
//! b3 done  ──▶ Idle                 in flight: -    queue: []
//! ```
//!
//! This type is a pure state machine with no I/O; [`super::TransportPeer`]
//! performs the actual writes and reports each completion back.

use std::collections::VecDeque;

use super::TransportError;

/// What the caller of [`SendQueue::enqueue`] must do next.
#[derive(Debug, PartialEq, Eq)]
pub enum SendAction {
    /// No write was in flight: write this frame now.
    Issue(Vec<u8>),
    /// A write is in flight; the frame waits at position `depth` in the FIFO.
    Queued { depth: usize },
}

/// What the writer must do after a write completes.
#[derive(Debug, PartialEq, Eq)]
pub enum WriteCompletion {
    /// Write this next frame.
    Next(Vec<u8>),
    /// Nothing left to write; the queue is idle again.
    Idle,
    /// The write failed.  The queue has been cleared and the connection must
    /// be closed.
    Failed,
}

/// Serializes outbound frames into a single in-flight write plus a FIFO.
#[derive(Debug, Default)]
pub struct SendQueue {
    in_flight: bool,
    pending: VecDeque<Vec<u8>>,
    capacity: Option<usize>,
}

impl SendQueue {
    /// Creates a queue.  `capacity` bounds the number of *waiting* frames
    /// (the in-flight frame is not counted); `None` means unbounded.
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            in_flight: false,
            pending: VecDeque::new(),
            capacity,
        }
    }

    /// Offers a frame for sending.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::SendQueueFull`] if a write is in flight and
    /// the bounded FIFO is already full.  The frame is rejected, never
    /// silently dropped.
    pub fn enqueue(&mut self, frame: Vec<u8>) -> Result<SendAction, TransportError> {
        if !self.in_flight {
            self.in_flight = true;
            return Ok(SendAction::Issue(frame));
        }

        if let Some(capacity) = self.capacity {
            if self.pending.len() >= capacity {
                return Err(TransportError::SendQueueFull { capacity });
            }
        }
        self.pending.push_back(frame);
        Ok(SendAction::Queued {
            depth: self.pending.len(),
        })
    }

    /// Reports completion of the in-flight write.
    pub fn complete(&mut self, success: bool) -> WriteCompletion {
        if !success {
            self.clear();
            return WriteCompletion::Failed;
        }

        match self.pending.pop_front() {
            Some(next) => WriteCompletion::Next(next),
            None => {
                self.in_flight = false;
                WriteCompletion::Idle
            }
        }
    }

    /// Drops all waiting frames and clears the in-flight flag.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.in_flight = false;
    }

    /// Returns `true` while a write is in flight.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Number of frames waiting behind the in-flight write.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
