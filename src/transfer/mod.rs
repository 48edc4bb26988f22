//! Transfer module - moves or copies messages between queues
//!
//! The engine pulls raw envelopes from a [`MessageSource`], optionally clears
//! their failure history, suppresses identities already delivered in the run,
//! delivers to a [`MessageSink`] and then acknowledges or releases the source
//! message.

pub mod adapters;
pub mod codec;
pub mod dedup;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod manager;
pub mod policy;
pub mod progress;
pub mod queue_uri;
pub mod types;

// Re-export commonly used types
pub use adapters::{FolderSink, MemoryQueue, MessageSink, MessageSource, SledQueue};
pub use codec::{CodecKind, EnvelopeCodec, GzipJsonCodec, JsonCodec};
pub use dedup::DeduplicationTracker;
pub use engine::{RunFailure, TransferEngine};
pub use envelope::{Envelope, FailureRecord};
pub use error::TransferError;
pub use manager::QueueManager;
pub use policy::{TransferMode, TransferPolicy};
pub use progress::{LogProgress, NoProgress, ProgressReporter, PROGRESS_INTERVAL};
pub use queue_uri::{ensure_distinct, QueueUri};
pub use types::{AckToken, Disposition, MessageId, ReceivedMessage, Summary};
