//! Queue capability traits
//!
//! A source hands out raw messages one at a time and must be told how each
//! one ends (acknowledge or release). A sink accepts delivered messages.
//! Network queues implement both; a filesystem sink only implements
//! [`MessageSink`].

use async_trait::async_trait;

use crate::transfer::envelope::Envelope;
use crate::transfer::error::TransferError;
use crate::transfer::types::{AckToken, Disposition, ReceivedMessage};

#[async_trait]
pub trait MessageSource: Send {
    /// Claim the next available message, or `None` when the source is exhausted.
    ///
    /// Implementations reject a fetch while a previous token is still
    /// outstanding.
    async fn try_fetch(&mut self) -> Result<Option<ReceivedMessage>, TransferError>;

    /// Finish a fetched message. Consumes the token.
    async fn finalize(&mut self, token: AckToken, disposition: Disposition) -> Result<(), TransferError>;

    async fn close(&mut self) -> Result<(), TransferError>;

    /// URI used in log lines and errors
    fn uri(&self) -> &str;
}

#[async_trait]
pub trait MessageSink: Send {
    /// Deliver a message. `raw` is the encoded form of `envelope`; sinks that
    /// store bytes use it as-is, sinks that render the message use `envelope`.
    async fn deliver(&mut self, envelope: &Envelope, raw: &[u8]) -> Result<(), TransferError>;

    async fn close(&mut self) -> Result<(), TransferError>;

    fn uri(&self) -> &str;
}
