//! Ordered listener registry shared by the event loop and the controller

use serde::{Deserialize, Serialize};

/// Handle returned when a listener is registered; used to remove it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListenerId(u64);

/// Listeners in registration order
pub(crate) struct ListenerList<L> {
    entries: Vec<(ListenerId, L)>,
    next_id: u64,
}

impl<L> ListenerList<L> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    pub(crate) fn add(&mut self, listener: L) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, listener));
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> Option<L> {
        let position = self.entries.iter().position(|(entry_id, _)| *entry_id == id)?;
        Some(self.entries.remove(position).1)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut L> {
        self.entries.iter_mut().map(|(_, listener)| listener)
    }

    /// Detach the current entries so callbacks can borrow their owner mutably
    pub(crate) fn take_entries(&mut self) -> Vec<(ListenerId, L)> {
        std::mem::take(&mut self.entries)
    }

    /// Put detached entries back in front of anything registered meanwhile
    pub(crate) fn restore_entries(&mut self, mut entries: Vec<(ListenerId, L)>) {
        entries.append(&mut self.entries);
        self.entries = entries;
    }
}

impl<L> Default for ListenerList<L> {
    fn default() -> Self {
        Self::new()
    }
}
