//! Adapters module - queue backends

pub mod traits;
pub mod memory;
pub mod sled_queue;
pub mod folder_sink;

pub use traits::{MessageSink, MessageSource};
pub use memory::MemoryQueue;
pub use sled_queue::SledQueue;
pub use folder_sink::FolderSink;
