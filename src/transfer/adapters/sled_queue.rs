//! Durable local queue on sled
//!
//! Layout per queue name:
//!   ready:<name>     seq (u64 BE) -> encoded envelope
//!   inflight:<name>  seq (u64 BE) -> encoded envelope, claimed but not finalized
//!
//! Sequence numbers come from `Db::generate_id`, so key order is enqueue order.

use async_trait::async_trait;
use log::{debug, warn};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, IVec, Transactional, Tree};

use super::traits::{MessageSink, MessageSource};
use crate::transfer::envelope::Envelope;
use crate::transfer::error::TransferError;
use crate::transfer::types::{AckToken, Disposition, ReceivedMessage};

fn seq_key(seq: u64) -> [u8; 8] {
    seq.to_be_bytes()
}

fn key_seq(key: &[u8]) -> Result<u64, TransferError> {
    let bytes: [u8; 8] = key
        .try_into()
        .map_err(|_| TransferError::Transport(format!("corrupt queue key of {} bytes", key.len())))?;
    Ok(u64::from_be_bytes(bytes))
}

fn tx_error(e: TransactionError<TransferError>) -> TransferError {
    match e {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => e.into(),
    }
}

/// Move `key` from one tree to another atomically; returns the moved value.
fn move_entry(from: &Tree, to: &Tree, key: &[u8]) -> Result<Option<IVec>, TransferError> {
    (from, to)
        .transaction(|(from, to)| {
            let value = from.remove(key)?;
            if let Some(value) = &value {
                to.insert(key, value.clone())?;
            }
            Ok::<_, ConflictableTransactionError<TransferError>>(value)
        })
        .map_err(tx_error)
}

pub struct SledQueue {
    uri: String,
    db: Db,
    ready: Tree,
    inflight: Tree,
    cursor: u64,
    outstanding: Option<u64>,
}

impl SledQueue {
    /// Open (or create) the named queue in `db`.
    ///
    /// Messages left in flight by an earlier, interrupted run are returned to
    /// the ready set.
    pub fn open(db: Db, queue: &str, uri: &str) -> Result<Self, TransferError> {
        if queue.is_empty() {
            return Err(TransferError::configuration(format!("{uri}: queue name must not be empty")));
        }

        let ready = db.open_tree(format!("ready:{queue}"))?;
        let inflight = db.open_tree(format!("inflight:{queue}"))?;

        let queue = Self { uri: uri.to_string(), db, ready, inflight, cursor: 0, outstanding: None };

        let recovered = queue.recover_inflight()?;
        if recovered > 0 {
            warn!("{}: returned {} in-flight messages to the queue", queue.uri, recovered);
        }

        Ok(queue)
    }

    fn recover_inflight(&self) -> Result<usize, TransferError> {
        let mut recovered = 0;
        for entry in self.inflight.iter() {
            let (key, _) = entry?;
            if move_entry(&self.inflight, &self.ready, &key)?.is_some() {
                recovered += 1;
            }
        }
        Ok(recovered)
    }

    /// Append an already-encoded message
    pub fn enqueue(&self, raw: &[u8]) -> Result<u64, TransferError> {
        let seq = self.db.generate_id()?;
        self.ready.insert(seq_key(seq), raw)?;
        self.db.flush()?;
        Ok(seq)
    }

    pub fn len(&self) -> usize {
        self.ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ready.is_empty()
    }

    pub fn inflight_len(&self) -> usize {
        self.inflight.len()
    }

    /// Ready messages in queue order
    pub fn messages(&self) -> Result<Vec<Vec<u8>>, TransferError> {
        self.ready
            .iter()
            .values()
            .map(|v| v.map(|v| v.to_vec()).map_err(TransferError::from))
            .collect()
    }
}

#[async_trait]
impl MessageSource for SledQueue {
    async fn try_fetch(&mut self) -> Result<Option<ReceivedMessage>, TransferError> {
        if let Some(seq) = self.outstanding {
            return Err(TransferError::Transport(format!(
                "{}: message {} is still outstanding",
                self.uri, seq
            )));
        }

        loop {
            let Some(entry) = self.ready.range(seq_key(self.cursor)..).next() else {
                return Ok(None);
            };
            let (key, _) = entry?;
            let seq = key_seq(&key)?;
            self.cursor = seq.saturating_add(1);

            // Another consumer may have claimed it between the scan and the move
            if let Some(raw) = move_entry(&self.ready, &self.inflight, &key)? {
                debug!("{}: claimed message {}", self.uri, seq);
                self.outstanding = Some(seq);
                return Ok(Some(ReceivedMessage { raw: raw.to_vec(), token: AckToken::new(seq) }));
            }
        }
    }

    async fn finalize(&mut self, token: AckToken, disposition: Disposition) -> Result<(), TransferError> {
        let seq = token.seq();
        if self.outstanding != Some(seq) {
            return Err(TransferError::Transport(format!("{}: unknown token {}", self.uri, seq)));
        }

        let key = seq_key(seq);
        let finalized = match disposition {
            Disposition::Acknowledge => self.inflight.remove(key)?,
            Disposition::Release => move_entry(&self.inflight, &self.ready, &key)?,
        };
        if finalized.is_none() {
            return Err(TransferError::Transport(format!(
                "{}: message {} is no longer in flight",
                self.uri, seq
            )));
        }

        self.outstanding = None;
        debug!("{}: {} message {}", self.uri, disposition, seq);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransferError> {
        if let Some(seq) = self.outstanding.take() {
            warn!(
                "{}: closing with message {} unfinalized; it is recovered on next open",
                self.uri, seq
            );
        }
        self.db.flush_async().await?;
        Ok(())
    }

    fn uri(&self) -> &str {
        &self.uri
    }
}

#[async_trait]
impl MessageSink for SledQueue {
    async fn deliver(&mut self, _envelope: &Envelope, raw: &[u8]) -> Result<(), TransferError> {
        self.enqueue(raw)
            .map(|_| ())
            .map_err(|e| TransferError::delivery(&self.uri, e))
    }

    async fn close(&mut self) -> Result<(), TransferError> {
        self.db.flush_async().await?;
        Ok(())
    }

    fn uri(&self) -> &str {
        &self.uri
    }
}
