//! Progress reporting for transfer runs

use log::info;

use crate::transfer::types::Summary;

/// Progress events are emitted every this many processed messages
pub const PROGRESS_INTERVAL: u64 = 100;

/// Purely observational: implementations must not panic and have no way to
/// fail a run.
pub trait ProgressReporter: Send {
    fn on_progress(&mut self, processed: u64);

    fn on_complete(&mut self, summary: &Summary);
}

/// Reports through the `log` facade, e.g. "Transferred 200 messages so far..."
pub struct LogProgress {
    verb: String,
}

impl LogProgress {
    pub fn new(verb: &str) -> Self {
        Self { verb: verb.to_string() }
    }
}

impl ProgressReporter for LogProgress {
    fn on_progress(&mut self, processed: u64) {
        info!("{} {} messages so far...", self.verb, processed);
    }

    fn on_complete(&mut self, summary: &Summary) {
        info!(
            "{} {} messages in total ({} duplicates skipped).",
            self.verb, summary.processed, summary.skipped_duplicates
        );
    }
}

/// Discards all events
#[derive(Debug, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn on_progress(&mut self, _processed: u64) {}

    fn on_complete(&mut self, _summary: &Summary) {}
}
