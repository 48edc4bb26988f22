//! Filesystem sink - one JSON document per delivered message
//!
//! File name is the message identity (32 hex chars) so re-delivering the same
//! message overwrites its earlier dump.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::traits::MessageSink;
use crate::transfer::envelope::{Envelope, FailureRecord};
use crate::transfer::error::TransferError;
use crate::transfer::types::MessageId;

/// Human-readable rendering of an envelope
#[derive(Debug, Serialize)]
struct DumpedMessage<'a> {
    message_id: MessageId,
    message_type: &'a str,
    sent_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recipient: Option<&'a str>,
    failure_messages: &'a [FailureRecord],
    message: Value,
}

/// Payload inlined as JSON when it parses, otherwise as (lossy) UTF-8 text
fn render_payload(payload: &[u8]) -> Value {
    serde_json::from_slice(payload)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(payload).into_owned()))
}

pub struct FolderSink {
    uri: String,
    folder: PathBuf,
}

impl FolderSink {
    /// Open the sink, creating the folder if needed
    pub async fn open(folder: &Path, uri: &str) -> Result<Self, TransferError> {
        tokio::fs::create_dir_all(folder).await.map_err(|e| {
            TransferError::configuration(format!("cannot create folder '{}': {}", folder.display(), e))
        })?;

        Ok(Self { uri: uri.to_string(), folder: folder.to_path_buf() })
    }

    pub fn path_for(&self, message_id: &MessageId) -> PathBuf {
        self.folder.join(format!("{}.json", message_id.simple()))
    }
}

#[async_trait]
impl MessageSink for FolderSink {
    async fn deliver(&mut self, envelope: &Envelope, _raw: &[u8]) -> Result<(), TransferError> {
        let dumped = DumpedMessage {
            message_id: envelope.message_id,
            message_type: &envelope.message_type,
            sent_at: envelope.sent_at,
            recipient: envelope.recipient.as_deref(),
            failure_messages: &envelope.failure_messages,
            message: render_payload(&envelope.message),
        };
        let document =
            serde_json::to_vec_pretty(&dumped).map_err(|e| TransferError::delivery(&self.uri, e))?;

        tokio::fs::write(self.path_for(&envelope.message_id), document)
            .await
            .map_err(|e| TransferError::delivery(&self.uri, e))
    }

    async fn close(&mut self) -> Result<(), TransferError> {
        Ok(())
    }

    fn uri(&self) -> &str {
        &self.uri
    }
}
