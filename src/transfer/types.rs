//! Core types shared by the transfer engine and queue adapters.

use std::fmt;

pub use uuid::Uuid as MessageId;

/// Correlates a fetched message with its required finalize call.
///
/// Deliberately neither `Clone` nor `Copy`: `finalize` takes the token by
/// value, so each fetch can be finalized at most once.
#[derive(Debug, PartialEq, Eq)]
pub struct AckToken(u64);

impl AckToken {
    pub fn new(seq: u64) -> Self {
        Self(seq)
    }

    pub fn seq(&self) -> u64 {
        self.0
    }
}

/// A raw message claimed from a source, not yet finalized
#[derive(Debug)]
pub struct ReceivedMessage {
    pub raw: Vec<u8>,
    pub token: AckToken,
}

/// How a fetched message is finalized at its source
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Disposition {
    /// Permanently remove from the source
    Acknowledge,
    /// Return to the source, visible to other consumers again
    Release,
}

/// Counters accumulated by one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub processed: u64,
    pub skipped_duplicates: u64,
}

impl Summary {
    /// Messages actually handed to the destination
    pub fn delivered(&self) -> u64 {
        self.processed - self.skipped_duplicates
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed={} skipped_duplicates={}",
            self.processed, self.skipped_duplicates
        )
    }
}
