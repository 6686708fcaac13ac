//! Flush Queue
//!
//! Observers waiting to run, in the order they became pending. An Observer
//! appears at most once; invalidating an Observer that is already queued
//! does not move it.

use indexmap::IndexSet;

use super::node::NodeId;

#[derive(Debug, Default)]
pub struct FlushQueue {
    pending: IndexSet<NodeId>,
}

impl FlushQueue {
    pub fn new() -> Self {
        Self {
            pending: IndexSet::new(),
        }
    }

    /// Append an Observer. Returns false if it was already queued.
    pub fn push(&mut self, observer: NodeId) -> bool {
        self.pending.insert(observer)
    }

    /// Remove and return the oldest pending Observer.
    pub fn pop(&mut self) -> Option<NodeId> {
        self.pending.shift_remove_index(0)
    }

    /// Remove every pending Observer, oldest first.
    pub fn drain(&mut self) -> Vec<NodeId> {
        self.pending.drain(..).collect()
    }

    /// Drop an Observer from the queue (used on disposal).
    pub fn remove(&mut self, observer: NodeId) -> bool {
        self.pending.shift_remove(&observer)
    }

    pub fn contains(&self, observer: NodeId) -> bool {
        self.pending.contains(&observer)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
