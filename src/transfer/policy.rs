//! Transfer policy - immutable run configuration

use crate::transfer::envelope::Envelope;
use crate::transfer::error::TransferError;
use crate::transfer::types::Disposition;

/// Move acknowledges source messages after delivery; Copy releases them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::EnumString, strum_macros::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum TransferMode {
    Move,
    Copy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferPolicy {
    mode: TransferMode,
    /// 0 = unbounded
    max_count: u64,
    clear_failure_history: bool,
}

impl TransferPolicy {
    /// Validate and build a policy. A negative count is a configuration error.
    pub fn new(
        mode: TransferMode,
        max_count: i64,
        clear_failure_history: bool,
    ) -> Result<Self, TransferError> {
        let max_count = u64::try_from(max_count).map_err(|_| {
            TransferError::configuration(format!(
                "maximum count must not be negative (got {max_count})"
            ))
        })?;

        Ok(Self { mode, max_count, clear_failure_history })
    }

    pub fn mode(&self) -> TransferMode {
        self.mode
    }

    pub fn max_count(&self) -> u64 {
        self.max_count
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_count == 0
    }

    pub fn clear_failure_history(&self) -> bool {
        self.clear_failure_history
    }

    /// True once `processed` has reached a non-zero maximum
    pub fn limit_reached(&self, processed: u64) -> bool {
        self.max_count != 0 && processed >= self.max_count
    }

    pub fn disposition(&self) -> Disposition {
        match self.mode {
            TransferMode::Move => Disposition::Acknowledge,
            TransferMode::Copy => Disposition::Release,
        }
    }

    /// Whether the envelope must be rewritten (and therefore re-encoded)
    pub fn needs_rewrite(&self, envelope: &Envelope) -> bool {
        self.clear_failure_history && envelope.has_failures()
    }
}
