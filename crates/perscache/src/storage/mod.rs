//! Cache storage backends
//!
//! A storage persists named byte blobs and knows how old they are. Keys are
//! opaque to the storage; the engine hands it file-name-shaped keys
//! (`<name>-<hash>.<extension>`).

pub mod eviction;
mod local;
mod memory;

use std::{fmt, time::SystemTime};

pub use eviction::{enforce_size_limit, EvictionReport};
pub use local::{LocalFileStorage, DEFAULT_LOCATION};
pub use memory::MemoryStorage;

use crate::{CacheError, Result};

/// Size and recency of one stored blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobMeta {
    /// Storage key of the blob
    pub key: String,
    /// Size of the blob in bytes
    pub size: u64,
    /// Last read or write; drives LRU eviction
    pub accessed: SystemTime,
    /// Last write; drives TTL expiry
    pub modified: SystemTime,
}

/// Cache storage trait
///
/// Implementations must replace blobs whole: a reader sees either the old
/// payload or the new one, never a mix. No locking is provided across keys or
/// processes; concurrent writers of one key race and the last rename wins.
pub trait Storage: Send + Sync + fmt::Debug {
    /// Read a blob
    ///
    /// Fails with [`CacheError::NotFound`] when the blob is absent and with
    /// [`CacheError::Expired`] when it was last written strictly before
    /// `deadline`. A `None` deadline never expires.
    fn read(&self, key: &str, deadline: Option<SystemTime>) -> Result<Vec<u8>>;

    /// Persist a blob, durable before returning; may evict other blobs
    fn write(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Remove a blob; absent blobs are not an error
    fn delete(&self, key: &str) -> Result<()>;

    /// Check if a blob exists, regardless of its age
    fn exists(&self, key: &str) -> Result<bool>;

    /// Enumerate stored blobs with their size and timestamps
    fn entries(&self) -> Result<Vec<BlobMeta>>;

    /// Remove every blob
    fn clear(&self) -> Result<()> {
        for entry in self.entries()? {
            self.delete(&entry.key)?;
        }
        Ok(())
    }

    /// Total size of all blobs in bytes
    fn total_size(&self) -> Result<u64> {
        Ok(self.entries()?.iter().map(|e| e.size).sum())
    }
}

/// Shared expiry rule: a blob last written strictly before the deadline is gone
pub fn check_deadline(key: &str, modified: SystemTime, deadline: Option<SystemTime>) -> Result<()> {
    match deadline {
        Some(deadline) if modified < deadline => Err(CacheError::Expired {
            key: key.to_string(),
        }),
        _ => Ok(()),
    }
}
