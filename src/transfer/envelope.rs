//! Envelope - the unit moved between queues

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::transfer::types::MessageId;

/// One prior processing failure recorded against a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub recorded_at: DateTime<Utc>,
    pub reason: String,
}

/// Structured message envelope
///
/// Two envelopes with the same `message_id` are the same logical message,
/// whatever their payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub message_id: MessageId,
    pub message_type: String,
    #[serde(with = "payload_base64")]
    pub message: Vec<u8>,
    #[serde(default)]
    pub failure_messages: Vec<FailureRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    pub sent_at: DateTime<Utc>,
}

impl Envelope {
    /// New envelope with a freshly minted identity
    pub fn new(message_type: impl Into<String>, message: Vec<u8>) -> Self {
        Self {
            message_id: MessageId::new_v4(),
            message_type: message_type.into(),
            message,
            failure_messages: Vec::new(),
            recipient: None,
            sent_at: Utc::now(),
        }
    }

    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    pub fn record_failure(&mut self, reason: impl Into<String>) {
        self.failure_messages.push(FailureRecord { recorded_at: Utc::now(), reason: reason.into() });
    }

    pub fn has_failures(&self) -> bool {
        !self.failure_messages.is_empty()
    }

    /// Same envelope with an empty failure history
    pub fn without_failures(self) -> Self {
        Self { failure_messages: Vec::new(), ..self }
    }
}

mod payload_base64 {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_envelope_has_fresh_identity() {
        let a = Envelope::new("OrderPlaced", b"{}".to_vec());
        let b = Envelope::new("OrderPlaced", b"{}".to_vec());
        assert_ne!(a.message_id, b.message_id);
        assert!(!a.has_failures());
        assert!(a.recipient.is_none());
    }

    #[test]
    fn test_without_failures_keeps_identity() {
        let mut env = Envelope::new("OrderPlaced", b"payload".to_vec());
        env.record_failure("handler timed out");
        env.record_failure("handler timed out again");
        assert_eq!(env.failure_messages.len(), 2);

        let id = env.message_id;
        let cleared = env.without_failures();
        assert_eq!(cleared.message_id, id);
        assert_eq!(cleared.message, b"payload");
        assert!(!cleared.has_failures());
    }

    #[test]
    fn test_payload_serialized_as_base64() {
        let env = Envelope::new("Ping", vec![0, 1, 2, 255]).with_recipient("sled:bus?queue=inbox");
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["message"], "AAEC/w==");
        assert_eq!(json["recipient"], "sled:bus?queue=inbox");
    }
}
