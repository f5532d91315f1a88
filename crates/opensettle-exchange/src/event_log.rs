//! Append-only buffer of settlement events.

use opensettle_types::{OrderHash, SettlementEvent};

/// Events emitted by committed engine operations, oldest first.
///
/// The engine truncates the log back to an operation's starting length when
/// that operation aborts.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    events: Vec<SettlementEvent>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: SettlementEvent) {
        self.events.push(event);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&SettlementEvent> {
        self.events.last()
    }

    /// Events referring to `hash`.
    pub fn for_order(&self, hash: OrderHash) -> impl Iterator<Item = &SettlementEvent> {
        self.events
            .iter()
            .filter(move |event| event.order_hash() == Some(hash))
    }

    /// Hand every buffered event to the caller, leaving the log empty.
    pub fn drain(&mut self) -> Vec<SettlementEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.events.truncate(len);
    }
}
