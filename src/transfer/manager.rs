//! Queue manager - opens queue handles from URIs
//!
//! One `sled::Db` is cached per database path, so a source and destination
//! living in the same database share it (sled allows a single open per path).

use log::info;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::transfer::adapters::{FolderSink, MessageSink, MessageSource, SledQueue};
use crate::transfer::error::TransferError;
use crate::transfer::queue_uri::{normalized_path, QueueUri};

#[derive(Default)]
pub struct QueueManager {
    dbs: HashMap<PathBuf, sled::Db>,
}

impl QueueManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn open_db(&mut self, path: &Path) -> Result<sled::Db, TransferError> {
        let key = normalized_path(path);
        if let Some(db) = self.dbs.get(&key) {
            return Ok(db.clone());
        }
        let db = sled::open(path)?;
        info!("Opened queue database {}", path.display());
        // Re-normalize: the path exists now, canonicalize may resolve symlinks
        self.dbs.insert(normalized_path(path), db.clone());
        Ok(db)
    }

    pub fn create_sled_queue(&mut self, uri: &QueueUri) -> Result<SledQueue, TransferError> {
        match uri {
            QueueUri::Sled { path, queue } => {
                let db = self.open_db(path)?;
                SledQueue::open(db, queue, &uri.to_string())
            }
            QueueUri::Folder { .. } => {
                Err(TransferError::configuration(format!("'{uri}' is not a queue")))
            }
        }
    }

    pub fn create_source(&mut self, uri: &QueueUri) -> Result<Box<dyn MessageSource>, TransferError> {
        if !uri.supports_fetch() {
            return Err(TransferError::configuration(format!(
                "'{uri}' cannot be used as a source"
            )));
        }
        Ok(Box::new(self.create_sled_queue(uri)?))
    }

    pub async fn create_sink(&mut self, uri: &QueueUri) -> Result<Box<dyn MessageSink>, TransferError> {
        match uri {
            QueueUri::Sled { .. } => Ok(Box::new(self.create_sled_queue(uri)?)),
            QueueUri::Folder { path } => Ok(Box::new(FolderSink::open(path, &uri.to_string()).await?)),
        }
    }
}
