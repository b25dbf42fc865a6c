//! State shared between the client and its reader task.
//!
//! Two short-lived `std::sync::Mutex`es guard the connection status and the
//! ledger.  They are never held across an `.await`, and when both are needed
//! the status lock is always taken first.
//!
//! Every connection gets a new *generation* number.  The reader tags each
//! line and each EOF with the generation of the socket it came from, so a
//! late event from a connection that has already been replaced is ignored.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::domain::ConnectionState;

use super::ledger::{Claim, EntryKind, Ledger, Resolution};

/// Locks `mutex`, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct LinkStatus {
    state: ConnectionState,
    generation: u64,
}

/// Outcome of asking for an unsolicited line.
#[derive(Debug)]
pub(crate) enum RxClaim {
    Ready(String),
    Waiting(oneshot::Receiver<String>),
    NotConnected,
}

#[derive(Debug, Default)]
pub(crate) struct Shared {
    status: Mutex<LinkStatus>,
    ledger: Mutex<Ledger>,
    stale_responses: AtomicU64,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn state(&self) -> ConnectionState {
        lock(&self.status).state
    }

    pub(crate) fn pending_requests(&self) -> usize {
        lock(&self.ledger).len()
    }

    pub(crate) fn stale_responses(&self) -> u64 {
        self.stale_responses.load(Ordering::Relaxed)
    }

    /// `true` while `generation` is the open connection.
    pub(crate) fn is_live(&self, generation: u64) -> bool {
        let status = lock(&self.status);
        status.state == ConnectionState::Connected && status.generation == generation
    }

    /// Marks a freshly opened socket as the live connection and returns its
    /// generation.  The ledger starts empty.
    pub(crate) fn open_generation(&self) -> u64 {
        let mut status = lock(&self.status);
        status.generation = status.generation.wrapping_add(1);
        status.state = ConnectionState::Connected;
        let leftover = lock(&self.ledger).clear();
        if leftover > 0 {
            warn!(leftover, "dropping entries left over from a previous connection");
        }
        status.generation
    }

    /// Closes `generation` if it is still the live connection.
    ///
    /// Pending entries are dropped so their callers resolve with a message
    /// timeout.  Returns the number of dropped entries, or `None` when the
    /// generation was not live (already closed or replaced).
    pub(crate) fn close_generation(&self, generation: u64) -> Option<usize> {
        let mut status = lock(&self.status);
        if status.state != ConnectionState::Connected || status.generation != generation {
            return None;
        }
        status.state = ConnectionState::Disconnected;
        Some(lock(&self.ledger).clear())
    }

    /// Leaves the soft-connected state (a live connection must already have
    /// been closed with [`Shared::close_generation`]).
    pub(crate) fn leave_soft_connected(&self) {
        let mut status = lock(&self.status);
        if status.state == ConnectionState::SoftConnected {
            status.state = ConnectionState::Disconnected;
        }
    }

    pub(crate) fn set_soft_connected(&self) {
        lock(&self.status).state = ConnectionState::SoftConnected;
    }

    /// Registers a command entry on `generation`.
    ///
    /// Returns `None` when that connection is no longer live, so an entry is
    /// never queued behind a socket nobody reads from.
    pub(crate) fn register(
        &self,
        generation: u64,
        sequence: u16,
    ) -> Option<oneshot::Receiver<String>> {
        let status = lock(&self.status);
        if status.state != ConnectionState::Connected || status.generation != generation {
            return None;
        }
        Some(lock(&self.ledger).register(sequence, EntryKind::Command))
    }

    /// Takes a queued unsolicited line or registers a listener for the next
    /// one.
    pub(crate) fn claim_rx(&self, sequence: u16) -> RxClaim {
        let status = lock(&self.status);
        let mut ledger = lock(&self.ledger);
        match ledger.claim_unsolicited(sequence) {
            Claim::Ready(line) => RxClaim::Ready(line),
            Claim::Waiting(_) if status.state != ConnectionState::Connected => {
                ledger.withdraw_listener(sequence);
                RxClaim::NotConnected
            }
            Claim::Waiting(receiver) => RxClaim::Waiting(receiver),
        }
    }

    pub(crate) fn withdraw_listener(&self, sequence: u16) -> bool {
        lock(&self.ledger).withdraw_listener(sequence)
    }

    /// Routes one line read from `generation` to the oldest pending entry.
    pub(crate) fn deliver(&self, generation: u64, line: String) {
        let status = lock(&self.status);
        if status.state != ConnectionState::Connected || status.generation != generation {
            debug!(generation, %line, "discarding line from a closed connection");
            return;
        }
        let (resolution, queued) = {
            let mut ledger = lock(&self.ledger);
            let resolution = ledger.resolve(line.clone());
            (resolution, ledger.unsolicited_len())
        };
        drop(status);

        match resolution {
            Resolution::Delivered { sequence } => {
                debug!(sequence, "Response({sequence}): {line}");
            }
            Resolution::Stale { sequence } => {
                self.stale_responses.fetch_add(1, Ordering::Relaxed);
                warn!(
                    sequence,
                    "Response({sequence}) arrived after its caller gave up: {line}"
                );
            }
            Resolution::Unsolicited => {
                debug!(queued, "unsolicited line queued: {line}");
            }
        }
    }
}
