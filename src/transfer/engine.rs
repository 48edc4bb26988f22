//! Transfer Engine
//!
//! Strictly sequential loop, one message in flight at a time:
//!
//! 1. stop if the policy's maximum count has been reached
//! 2. fetch from the source; stop when exhausted
//! 3. decode (a decode error aborts the run and leaves the claim unfinalized)
//! 4. clear failure history if requested, re-encoding only when it changed
//! 5. deliver unless the identity was already delivered in this run
//! 6. finalize the source: acknowledge (move) or release (copy)
//! 7. count, and report progress every [`PROGRESS_INTERVAL`] messages
//!
//! Delivery happens before finalize, so a crash in between redelivers rather
//! than loses. Deduplication only spans one run.

use log::{debug, error, info, warn};
use thiserror::Error;

use crate::transfer::adapters::{MessageSink, MessageSource};
use crate::transfer::codec::EnvelopeCodec;
use crate::transfer::dedup::DeduplicationTracker;
use crate::transfer::error::TransferError;
use crate::transfer::policy::TransferPolicy;
use crate::transfer::progress::{NoProgress, ProgressReporter, PROGRESS_INTERVAL};
use crate::transfer::types::{ReceivedMessage, Summary};

/// A run that aborted, with the counters accumulated before the failure
#[derive(Debug, Error)]
#[error("{error} (after {summary})")]
pub struct RunFailure {
    #[source]
    pub error: TransferError,
    pub summary: Summary,
}

/// Owns all state for a single run; construct a new engine per run.
pub struct TransferEngine {
    policy: TransferPolicy,
    codec: Box<dyn EnvelopeCodec>,
    progress: Box<dyn ProgressReporter>,
    tracker: DeduplicationTracker,
    summary: Summary,
}

impl TransferEngine {
    pub fn new(policy: TransferPolicy, codec: Box<dyn EnvelopeCodec>) -> Self {
        Self {
            policy,
            codec,
            progress: Box::new(NoProgress),
            tracker: DeduplicationTracker::new(),
            summary: Summary::default(),
        }
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Run the transfer to completion.
    ///
    /// Both handles are closed before returning, on success and on failure.
    pub async fn run(
        mut self,
        mut source: Box<dyn MessageSource>,
        mut destination: Box<dyn MessageSink>,
    ) -> Result<Summary, RunFailure> {
        let max_count = if self.policy.is_unbounded() {
            "unbounded".to_string()
        } else {
            self.policy.max_count().to_string()
        };
        info!(
            "Transfer starting: {} -> {} (mode={}, max_count={}, clear_failure_history={}, codec={})",
            source.uri(),
            destination.uri(),
            self.policy.mode(),
            max_count,
            self.policy.clear_failure_history(),
            self.codec.name()
        );

        let outcome = self.transfer_loop(source.as_mut(), destination.as_mut()).await;

        let closed_source = source.close().await;
        let closed_destination = destination.close().await;

        debug!("{} distinct messages delivered", self.tracker.len());
        self.progress.on_complete(&self.summary);

        let result = match outcome {
            Err(e) => {
                for closed in [closed_source, closed_destination] {
                    if let Err(close_err) = closed {
                        warn!("Error while closing after failed run: {}", close_err);
                    }
                }
                Err(e)
            }
            Ok(()) => closed_source.and(closed_destination),
        };

        match result {
            Ok(()) => Ok(self.summary),
            Err(error) => {
                error!("Transfer aborted: {} ({})", error, self.summary);
                Err(RunFailure { error, summary: self.summary })
            }
        }
    }

    async fn transfer_loop(
        &mut self,
        source: &mut dyn MessageSource,
        destination: &mut dyn MessageSink,
    ) -> Result<(), TransferError> {
        loop {
            if self.policy.limit_reached(self.summary.processed) {
                debug!("Maximum count {} reached", self.policy.max_count());
                return Ok(());
            }

            let Some(ReceivedMessage { raw, token }) = source.try_fetch().await? else {
                debug!("{} exhausted", source.uri());
                return Ok(());
            };

            let mut envelope = self.codec.decode(&raw)?;
            let mut raw = raw;

            if self.policy.needs_rewrite(&envelope) {
                envelope = envelope.without_failures();
                raw = self.codec.encode(&envelope)?;
            }

            if self.tracker.seen(&envelope.message_id) {
                self.summary.skipped_duplicates += 1;
                debug!("Skipping duplicate message {}", envelope.message_id);
            } else {
                destination.deliver(&envelope, &raw).await?;
                self.tracker.record(envelope.message_id);
            }

            source.finalize(token, self.policy.disposition()).await?;

            self.summary.processed += 1;
            if self.summary.processed % PROGRESS_INTERVAL == 0 {
                self.progress.on_progress(self.summary.processed);
            }
        }
    }
}
