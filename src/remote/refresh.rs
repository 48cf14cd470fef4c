use std::cell::Cell;

use tracing::debug;

/// Sequence number handed out when a refresh is issued
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Orders overlapping refreshes so a stale response never replaces a newer
/// one.
///
/// Each refresh takes a ticket before calling the store. When its response
/// arrives it may be applied only if no later ticket was applied first.
#[derive(Debug, Default)]
pub struct RefreshSequencer {
    issued: Cell<u64>,
    applied: Cell<u64>,
}

impl RefreshSequencer {
    pub fn new() -> Self {
        RefreshSequencer::default()
    }

    pub fn issue(&self) -> Ticket {
        let next = self.issued.get() + 1;
        self.issued.set(next);
        Ticket(next)
    }

    /// Claim the right to apply the response for `ticket`.
    /// Returns false when a newer response has already been applied.
    pub fn accept(&self, ticket: Ticket) -> bool {
        if ticket.0 <= self.applied.get() {
            debug!(
                ticket = ticket.0,
                applied = self.applied.get(),
                "dropping stale refresh response"
            );
            return false;
        }
        self.applied.set(ticket.0);
        true
    }

    /// True when a response newer than `ticket` has already been applied
    pub fn is_superseded(&self, ticket: Ticket) -> bool {
        ticket.0 < self.applied.get()
    }

    /// True while a ticket newer than the last applied one is outstanding
    pub fn is_pending(&self) -> bool {
        self.issued.get() > self.applied.get()
    }
}
