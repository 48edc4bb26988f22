//! Queue URIs
//!
//! - `sled:<db-path>?queue=<name>`  named queue inside a sled database
//! - `folder:<dir-path>`            filesystem sink (delivery only)

use percent_encoding::percent_decode_str;
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

use crate::transfer::error::TransferError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueUri {
    Sled { path: PathBuf, queue: String },
    Folder { path: PathBuf },
}

impl QueueUri {
    pub fn parse(uri: &str) -> Result<Self, TransferError> {
        let invalid = |reason: &str| TransferError::configuration(format!("invalid queue uri '{uri}': {reason}"));

        let url = Url::parse(uri.trim()).map_err(|e| invalid(&e.to_string()))?;
        // Url keeps spaces and non-ASCII percent-encoded
        let path = percent_decode_str(url.path())
            .decode_utf8()
            .map_err(|e| invalid(&format!("path is not valid UTF-8: {e}")))?;
        if path.is_empty() {
            return Err(invalid("missing path"));
        }
        let path = PathBuf::from(path.as_ref());

        match url.scheme() {
            "sled" => {
                let queue = url
                    .query_pairs()
                    .find(|(k, _)| k == "queue")
                    .map(|(_, v)| v.into_owned())
                    .filter(|v| !v.is_empty())
                    .ok_or_else(|| invalid("missing 'queue' parameter"))?;
                Ok(Self::Sled { path, queue })
            }
            "folder" => Ok(Self::Folder { path }),
            other => Err(invalid(&format!("unsupported scheme '{other}'"))),
        }
    }

    pub fn supports_fetch(&self) -> bool {
        matches!(self, Self::Sled { .. })
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Sled { path, .. } | Self::Folder { path } => path,
        }
    }

    /// Same endpoint on disk, however the path was spelled
    pub fn same_endpoint(&self, other: &QueueUri) -> bool {
        let same_queue = match (self, other) {
            (Self::Sled { queue: a, .. }, Self::Sled { queue: b, .. }) => a == b,
            (Self::Folder { .. }, Self::Folder { .. }) => true,
            _ => false,
        };
        same_queue && normalized_path(self.path()) == normalized_path(other.path())
    }
}

/// Canonical form of `path` when it exists, else its absolute form.
///
/// Also the key under which a database is opened, so two spellings of one
/// path share a single `sled::Db`.
pub fn normalized_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

impl fmt::Display for QueueUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sled { path, queue } => write!(f, "sled:{}?queue={}", path.display(), queue),
            Self::Folder { path } => write!(f, "folder:{}", path.display()),
        }
    }
}

/// Source and destination must not be the same endpoint
pub fn ensure_distinct(source: &QueueUri, destination: &QueueUri) -> Result<(), TransferError> {
    if source.same_endpoint(destination) {
        return Err(TransferError::configuration(
            "source queue uri cannot be the same as the destination queue uri",
        ));
    }
    Ok(())
}
