//! Error taxonomy for transfer runs

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
    /// Invalid policy, URI or endpoint combination; raised before a run starts
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Raw bytes fetched from a source are not a valid envelope
    #[error("failed to decode envelope: {0}")]
    Decode(String),

    #[error("failed to encode envelope {message_id}: {reason}")]
    Encode { message_id: uuid::Uuid, reason: String },

    /// Destination rejected the message or is unreachable
    #[error("delivery to '{destination}' failed: {reason}")]
    Delivery { destination: String, reason: String },

    /// Fetch/finalize/close failure at the queue layer
    #[error("transport error: {0}")]
    Transport(String),
}

impl TransferError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn delivery(destination: &str, reason: impl ToString) -> Self {
        Self::Delivery { destination: destination.to_string(), reason: reason.to_string() }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

impl From<sled::Error> for TransferError {
    fn from(e: sled::Error) -> Self {
        Self::Transport(e.to_string())
    }
}
