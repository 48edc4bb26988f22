//! In-process queue for testing
//!
//! Behaves like the sled queue (ordered ready set, one in-flight claim per
//! handle, release returns the message under its original key) and allows
//! injecting fetch/delivery failures.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::traits::{MessageSink, MessageSource};
use crate::transfer::envelope::Envelope;
use crate::transfer::error::TransferError;
use crate::transfer::types::{AckToken, Disposition, ReceivedMessage};

#[derive(Debug, Default)]
struct MemoryQueueState {
    ready: BTreeMap<u64, Vec<u8>>,
    inflight: BTreeMap<u64, Vec<u8>>,
    next_seq: u64,
    deliveries: usize,
    fetches: usize,
    /// Deliveries beyond this many successful ones fail
    fail_deliveries_after: Option<usize>,
    /// Fetches beyond this many successful ones fail
    fail_fetches_after: Option<usize>,
    close_count: usize,
}

/// Cloneable handle; clones share the queue contents but each keeps its own
/// fetch cursor and outstanding claim.
#[derive(Debug, Clone)]
pub struct MemoryQueue {
    uri: String,
    state: Arc<Mutex<MemoryQueueState>>,
    cursor: u64,
    outstanding: Option<u64>,
}

impl MemoryQueue {
    pub fn new(name: &str) -> Self {
        Self {
            uri: format!("memory:{name}"),
            state: Arc::new(Mutex::new(MemoryQueueState::default())),
            cursor: 0,
            outstanding: None,
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryQueueState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append a raw message; returns its sequence number
    pub fn push(&self, raw: Vec<u8>) -> u64 {
        let mut state = self.state();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.ready.insert(seq, raw);
        seq
    }

    /// Ready messages in queue order
    pub fn messages(&self) -> Vec<Vec<u8>> {
        self.state().ready.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state().ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn inflight_len(&self) -> usize {
        self.state().inflight.len()
    }

    /// Make in-flight messages visible again, as a visibility timeout would
    pub fn recover_inflight(&self) -> usize {
        let mut state = self.state();
        let inflight = std::mem::take(&mut state.inflight);
        let recovered = inflight.len();
        state.ready.extend(inflight);
        recovered
    }

    pub fn fail_deliveries_after(&self, successes: usize) {
        self.state().fail_deliveries_after = Some(successes);
    }

    pub fn fail_fetches_after(&self, successes: usize) {
        self.state().fail_fetches_after = Some(successes);
    }

    pub fn close_count(&self) -> usize {
        self.state().close_count
    }
}

#[async_trait]
impl MessageSource for MemoryQueue {
    async fn try_fetch(&mut self) -> Result<Option<ReceivedMessage>, TransferError> {
        if let Some(seq) = self.outstanding {
            return Err(TransferError::Transport(format!(
                "{}: message {} is still outstanding",
                self.uri, seq
            )));
        }

        let claimed = {
            let mut state = self.state();
            if state.fail_fetches_after.is_some_and(|limit| state.fetches >= limit) {
                return Err(TransferError::Transport(format!("{}: fetch failed", self.uri)));
            }
            state.fetches += 1;

            let next = state.ready.range(self.cursor..).next().map(|(seq, _)| *seq);
            match next {
                Some(seq) => {
                    let raw = state.ready.remove(&seq).unwrap_or_default();
                    state.inflight.insert(seq, raw.clone());
                    Some((seq, raw))
                }
                None => None,
            }
        };

        Ok(claimed.map(|(seq, raw)| {
            self.cursor = seq + 1;
            self.outstanding = Some(seq);
            ReceivedMessage { raw, token: AckToken::new(seq) }
        }))
    }

    async fn finalize(&mut self, token: AckToken, disposition: Disposition) -> Result<(), TransferError> {
        if self.outstanding != Some(token.seq()) {
            return Err(TransferError::Transport(format!(
                "{}: unknown token {}",
                self.uri,
                token.seq()
            )));
        }

        {
            let mut state = self.state();
            let raw = state.inflight.remove(&token.seq()).ok_or_else(|| {
                TransferError::Transport(format!("{}: message {} is not in flight", self.uri, token.seq()))
            })?;
            if disposition == Disposition::Release {
                state.ready.insert(token.seq(), raw);
            }
        }

        self.outstanding = None;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransferError> {
        self.state().close_count += 1;
        Ok(())
    }

    fn uri(&self) -> &str {
        &self.uri
    }
}

#[async_trait]
impl MessageSink for MemoryQueue {
    async fn deliver(&mut self, _envelope: &Envelope, raw: &[u8]) -> Result<(), TransferError> {
        {
            let mut state = self.state();
            if state.fail_deliveries_after.is_some_and(|limit| state.deliveries >= limit) {
                return Err(TransferError::delivery(&self.uri, "destination unavailable"));
            }
            state.deliveries += 1;
        }
        self.push(raw.to_vec());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransferError> {
        self.state().close_count += 1;
        Ok(())
    }

    fn uri(&self) -> &str {
        &self.uri
    }
}
