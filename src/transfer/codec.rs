//! Envelope codec - bytes <-> Envelope
//!
//! Two wire formats:
//! - `json`: serde_json encoding of [`Envelope`]
//! - `gzip`: the same JSON, gzip-compressed with flate2

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Deserialize;
use std::io::{Read, Write};

use crate::transfer::envelope::Envelope;
use crate::transfer::error::TransferError;

pub trait EnvelopeCodec: Send + Sync {
    fn decode(&self, raw: &[u8]) -> Result<Envelope, TransferError>;

    /// Never fails for envelopes produced by this crate; the error exists for
    /// I/O failures inside a compressing codec.
    fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>, TransferError>;

    fn name(&self) -> &str;
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, strum_macros::Display, strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CodecKind {
    #[default]
    Json,
    Gzip,
}

impl CodecKind {
    pub fn build(self) -> Box<dyn EnvelopeCodec> {
        match self {
            CodecKind::Json => Box::new(JsonCodec),
            CodecKind::Gzip => Box::new(GzipJsonCodec::default()),
        }
    }
}

fn encode_error(envelope: &Envelope, reason: impl ToString) -> TransferError {
    TransferError::Encode { message_id: envelope.message_id, reason: reason.to_string() }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl EnvelopeCodec for JsonCodec {
    fn decode(&self, raw: &[u8]) -> Result<Envelope, TransferError> {
        serde_json::from_slice(raw).map_err(|e| TransferError::Decode(e.to_string()))
    }

    fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>, TransferError> {
        serde_json::to_vec(envelope).map_err(|e| encode_error(envelope, e))
    }

    fn name(&self) -> &str {
        "json"
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GzipJsonCodec {
    level: Compression,
}

impl Default for GzipJsonCodec {
    fn default() -> Self {
        Self { level: Compression::default() }
    }
}

impl EnvelopeCodec for GzipJsonCodec {
    fn decode(&self, raw: &[u8]) -> Result<Envelope, TransferError> {
        let mut decoder = GzDecoder::new(raw);
        let mut json = Vec::new();
        decoder
            .read_to_end(&mut json)
            .map_err(|e| TransferError::Decode(format!("gzip: {e}")))?;
        JsonCodec.decode(&json)
    }

    fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>, TransferError> {
        let json = JsonCodec.encode(envelope)?;
        let mut encoder = GzEncoder::new(Vec::new(), self.level);
        encoder.write_all(&json).map_err(|e| encode_error(envelope, e))?;
        encoder.finish().map_err(|e| encode_error(envelope, e))
    }

    fn name(&self) -> &str {
        "gzip"
    }
}
