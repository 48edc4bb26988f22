//! Deduplication tracker for message identities
//!
//! Uses IndexSet for O(1) lookup.
//! Entries are never evicted: the set lives for exactly one run.

use indexmap::IndexSet;

use crate::transfer::types::MessageId;

/// Identities already delivered in the current run
#[derive(Debug, Default)]
pub struct DeduplicationTracker {
    seen: IndexSet<MessageId>,
}

impl DeduplicationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, id: &MessageId) -> bool {
        self.seen.contains(id)
    }

    /// Record an identity; returns false if it was already present
    pub fn record(&mut self, id: MessageId) -> bool {
        self.seen.insert(id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
