//! Strictly increasing timestamps for outbound messages.
//!
//! # Why not just read the system clock? (for beginners)
//!
//! The receiving side of a connection drops any message whose timestamp is
//! not *strictly greater* than the last one it accepted (see
//! [`crate::relay::InboundRelay`]).  Two messages created within the same
//! microsecond, or a wall clock that steps backwards, would therefore make
//! the second message look like a duplicate.
//!
//! [`MessageClock`] hands out wall-clock microseconds but never repeats or
//! goes backwards: each value is `max(now, previous + 1)`.
//!
//! # Thread safety
//!
//! The clock uses a single `AtomicU64` updated with a compare-and-swap loop
//! (`fetch_update`), so any number of threads can stamp messages at once
//! without a lock and without ever receiving the same value.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// A thread-safe source of strictly increasing microsecond timestamps.
///
/// # Examples
///
/// ```rust
/// use gamenet_core::protocol::MessageClock;
///
/// let clock = MessageClock::new();
/// let a = clock.next();
/// let b = clock.next();
/// assert!(b > a);
/// ```
#[derive(Debug)]
pub struct MessageClock {
    /// The last value handed out (0 before the first call).
    last: AtomicU64,
}

impl MessageClock {
    /// Creates a new clock.
    pub fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Returns the next timestamp: the current time in microseconds since the
    /// Unix epoch, bumped to `previous + 1` if the wall clock has not moved
    /// past the previous value.
    pub fn next(&self) -> u64 {
        let now = now_micros();
        // `fetch_update` retries the closure until the CAS succeeds and
        // returns the *previous* value; the closure never returns `None`, so
        // both arms carry the previous value.
        let previous = match self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |prev| {
                Some(now.max(prev.saturating_add(1)))
            }) {
            Ok(prev) | Err(prev) => prev,
        };
        now.max(previous.saturating_add(1))
    }

    /// Returns the last value handed out without advancing.
    pub fn current(&self) -> u64 {
        self.last.load(Ordering::Acquire)
    }
}

impl Default for MessageClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Current wall-clock time in microseconds since the Unix epoch (0 if the
/// system clock is before 1970).
pub fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
