//! FIFO ledger of requests awaiting a response line.
//!
//! The wire carries no request identifier, so responses are matched purely
//! by order: each line the device sends resolves the *oldest* unresolved
//! entry.  Every entry owns the sending half of a `oneshot` channel; the
//! caller that registered it awaits the receiving half.
//!
//! # Abandoned entries (for beginners)
//!
//! A caller that gives up after its response timeout drops its receiver but
//! its entry stays in the queue, because the device still owes an answer to
//! the command that was written.  When that late answer arrives it resolves
//! the abandoned entry (and is counted as *stale*) instead of shifting every
//! later response onto the wrong caller.
//!
//! Listener entries are different: an `rx` poll writes nothing, so no line
//! is owed to it.  It is withdrawn when the poll gives up, and one whose
//! caller vanished is skipped when a line arrives.

use std::collections::VecDeque;

use tokio::sync::oneshot;

/// Maximum number of response lines kept while nobody is waiting.
pub const UNSOLICITED_CAPACITY: usize = 64;

/// What an entry is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A command was written; the device owes one line.
    Command,
    /// Waiting for an unsolicited line (an `rx` capture); nothing was written.
    Listener,
}

#[derive(Debug)]
struct PendingRequest {
    sequence: u16,
    kind: EntryKind,
    responder: oneshot::Sender<String>,
}

/// Where an incoming line went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Handed to a caller that is still waiting.
    Delivered { sequence: u16 },
    /// Resolved an entry whose caller had already given up.
    Stale { sequence: u16 },
    /// No entry was waiting; the line was queued for `get_rx_message`.
    Unsolicited,
}

/// Result of asking for the next unsolicited line.
#[derive(Debug)]
pub enum Claim {
    /// A queued line was available immediately.
    Ready(String),
    /// A listener entry was registered; await the receiver.
    Waiting(oneshot::Receiver<String>),
}

/// Ordered pending requests plus a bounded queue of unsolicited lines.
#[derive(Debug, Default)]
pub struct Ledger {
    pending: VecDeque<PendingRequest>,
    unsolicited: VecDeque<String>,
}

impl Ledger {
    /// Appends an entry and returns the receiver its response will arrive on.
    pub fn register(&mut self, sequence: u16, kind: EntryKind) -> oneshot::Receiver<String> {
        let (responder, receiver) = oneshot::channel();
        self.pending.push_back(PendingRequest {
            sequence,
            kind,
            responder,
        });
        receiver
    }

    /// Takes the oldest unsolicited line, or registers a listener entry when
    /// none is queued.
    pub fn claim_unsolicited(&mut self, sequence: u16) -> Claim {
        match self.unsolicited.pop_front() {
            Some(line) => Claim::Ready(line),
            None => Claim::Waiting(self.register(sequence, EntryKind::Listener)),
        }
    }

    /// Matches `line` to the oldest pending entry.
    ///
    /// A listener whose caller went away was owed nothing, so it is skipped
    /// and the line is offered to the next entry.
    pub fn resolve(&mut self, mut line: String) -> Resolution {
        while let Some(entry) = self.pending.pop_front() {
            let sequence = entry.sequence;
            match (entry.responder.send(line), entry.kind) {
                (Ok(()), _) => return Resolution::Delivered { sequence },
                (Err(_), EntryKind::Command) => return Resolution::Stale { sequence },
                (Err(returned), EntryKind::Listener) => line = returned,
            }
        }
        self.queue(line)
    }

    fn queue(&mut self, line: String) -> Resolution {
        if self.unsolicited.len() == UNSOLICITED_CAPACITY {
            self.unsolicited.pop_front();
        }
        self.unsolicited.push_back(line);
        Resolution::Unsolicited
    }

    /// Removes a listener entry that is still pending.
    ///
    /// Returns `false` when the entry was already resolved or is a command
    /// entry (those stay until the device answers).
    pub fn withdraw_listener(&mut self, sequence: u16) -> bool {
        let position = self
            .pending
            .iter()
            .position(|e| e.sequence == sequence && e.kind == EntryKind::Listener);
        match position {
            Some(index) => self.pending.remove(index).is_some(),
            None => false,
        }
    }

    /// Drops every pending entry and queued line.
    ///
    /// Waiting callers observe a closed channel.  Returns how many entries
    /// were pending.
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        self.unsolicited.clear();
        dropped
    }

    /// Number of unresolved entries.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Number of queued unsolicited lines.
    pub fn unsolicited_len(&self) -> usize {
        self.unsolicited.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_responses_resolve_oldest_entry_first() {
        // Arrange
        let mut ledger = Ledger::default();
        let mut first = ledger.register(1, EntryKind::Command);
        let mut second = ledger.register(2, EntryKind::Command);

        // Act
        let r1 = ledger.resolve("+a".into());
        let r2 = ledger.resolve("+b".into());

        // Assert
        assert_eq!(r1, Resolution::Delivered { sequence: 1 });
        assert_eq!(r2, Resolution::Delivered { sequence: 2 });
        assert_eq!(first.try_recv().unwrap(), "+a");
        assert_eq!(second.try_recv().unwrap(), "+b");
        assert_eq!(ledger.len(), 0);
    }

    #[test]
    fn test_abandoned_entry_absorbs_its_late_response() {
        // Arrange – caller 1 gave up, caller 2 is still waiting
        let mut ledger = Ledger::default();
        drop(ledger.register(1, EntryKind::Command));
        let mut waiting = ledger.register(2, EntryKind::Command);

        // Act
        let late = ledger.resolve("+late".into());
        let fresh = ledger.resolve("+fresh".into());

        // Assert
        assert_eq!(late, Resolution::Stale { sequence: 1 });
        assert_eq!(fresh, Resolution::Delivered { sequence: 2 });
        assert_eq!(waiting.try_recv().unwrap(), "+fresh");
    }

    #[test]
    fn test_line_without_waiter_is_queued() {
        let mut ledger = Ledger::default();

        assert_eq!(ledger.resolve("tx(0x08,0x04,0x10)".into()), Resolution::Unsolicited);

        match ledger.claim_unsolicited(7) {
            Claim::Ready(line) => assert_eq!(line, "tx(0x08,0x04,0x10)"),
            Claim::Waiting(_) => panic!("queued line must be returned immediately"),
        }
        assert_eq!(ledger.len(), 0, "no listener registered when a line was ready");
    }

    #[test]
    fn test_unsolicited_queue_drops_oldest_when_full() {
        let mut ledger = Ledger::default();
        for i in 0..=UNSOLICITED_CAPACITY {
            ledger.resolve(format!("line {i}"));
        }

        assert_eq!(ledger.unsolicited_len(), UNSOLICITED_CAPACITY);
        match ledger.claim_unsolicited(0) {
            Claim::Ready(line) => assert_eq!(line, "line 1"),
            Claim::Waiting(_) => panic!("queue must not be empty"),
        }
    }

    #[test]
    fn test_claim_registers_listener_when_queue_empty() {
        let mut ledger = Ledger::default();

        let Claim::Waiting(mut receiver) = ledger.claim_unsolicited(3) else {
            panic!("empty queue must register a listener");
        };
        ledger.resolve("tx(0x13,0x01,0x15,12)".into());

        assert_eq!(receiver.try_recv().unwrap(), "tx(0x13,0x01,0x15,12)");
    }

    #[test]
    fn test_line_for_abandoned_listener_is_kept() {
        let mut ledger = Ledger::default();
        drop(ledger.register(4, EntryKind::Listener));

        assert_eq!(ledger.resolve("tx(0x15,0x87EE,0x02)".into()), Resolution::Unsolicited);
        assert_eq!(ledger.unsolicited_len(), 1);
    }

    #[test]
    fn test_abandoned_listener_passes_line_to_next_command() {
        // Arrange – a dropped rx poll sits in front of a live command
        let mut ledger = Ledger::default();
        drop(ledger.register(5, EntryKind::Listener));
        let mut command = ledger.register(6, EntryKind::Command);

        // Act
        let resolution = ledger.resolve("+".into());

        // Assert
        assert_eq!(resolution, Resolution::Delivered { sequence: 6 });
        assert_eq!(command.try_recv().unwrap(), "+");
        assert_eq!(ledger.len(), 0);
        assert_eq!(ledger.unsolicited_len(), 0);
    }

    #[test]
    fn test_withdraw_removes_listener_but_not_command() {
        let mut ledger = Ledger::default();
        let _command = ledger.register(1, EntryKind::Command);
        let _listener = ledger.register(2, EntryKind::Listener);

        assert!(!ledger.withdraw_listener(1));
        assert!(ledger.withdraw_listener(2));
        assert!(!ledger.withdraw_listener(2));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_clear_closes_waiting_receivers() {
        let mut ledger = Ledger::default();
        let mut receiver = ledger.register(1, EntryKind::Command);
        ledger.resolve("x".into());
        let mut orphan = ledger.register(2, EntryKind::Command);
        ledger.resolve("y".into());
        let mut pending = ledger.register(3, EntryKind::Command);

        assert_eq!(ledger.clear(), 1);

        assert_eq!(receiver.try_recv().unwrap(), "x");
        assert_eq!(orphan.try_recv().unwrap(), "y");
        assert!(pending.try_recv().is_err());
        assert_eq!(ledger.unsolicited_len(), 0);
    }
}
