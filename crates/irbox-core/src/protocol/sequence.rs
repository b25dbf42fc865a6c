//! Thread-safe sequence counter for request bookkeeping.
//!
//! # What is the sequence number for? (for beginners)
//!
//! The IR box wire protocol carries **no** request identifier: the device
//! answers commands strictly in the order it received them, and the client
//! matches each answer to the oldest request still waiting.  The sequence
//! number therefore never goes on the wire.  It exists so that log lines such
//! as `Message(17): [nop]` and `Response(17): [+]` can be paired up by a human
//! reading the logs, and so that tests can tell ledger entries apart.
//!
//! # Thread safety
//!
//! The counter uses `AtomicU16` internally, so several tasks can call
//! [`SequenceCounter::next`] at the same time without a lock and without ever
//! receiving the same value twice in one cycle.  A `u16` wraps naturally at
//! 65536, which is the cycle length the bookkeeping needs.

use std::sync::atomic::{AtomicU16, Ordering};

/// A thread-safe counter producing sequence numbers in `0..=65535`.
///
/// Sequence numbers start at 0 and increment by 1 with each call to
/// [`next`](SequenceCounter::next).  After 65535 the counter wraps back to 0
/// without panicking.
///
/// # Examples
///
/// ```rust
/// use irbox_core::SequenceCounter;
///
/// let counter = SequenceCounter::new();
/// assert_eq!(counter.next(), 0);
/// assert_eq!(counter.next(), 1);
/// ```
#[derive(Debug)]
pub struct SequenceCounter {
    inner: AtomicU16,
}

impl SequenceCounter {
    /// Creates a new counter starting at 0.
    pub fn new() -> Self {
        Self {
            inner: AtomicU16::new(0),
        }
    }

    /// Returns the next sequence number and atomically increments the counter.
    ///
    /// # Atomic ordering
    ///
    /// `Ordering::Relaxed` is sufficient because sequence numbers are only
    /// used for bookkeeping, not for memory synchronisation between tasks.
    pub fn next(&self) -> u16 {
        // `fetch_add` returns the old value; u16 arithmetic wraps 65535 -> 0.
        self.inner.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns the value the next call to [`next`](SequenceCounter::next) will
    /// hand out, without incrementing.
    pub fn current(&self) -> u16 {
        self.inner.load(Ordering::Relaxed)
    }
}

impl Default for SequenceCounter {
    fn default() -> Self {
        Self::new()
    }
}
