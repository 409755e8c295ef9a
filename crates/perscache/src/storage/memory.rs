use std::{collections::HashMap, sync::Arc, time::SystemTime};

use parking_lot::RwLock;

use super::{check_deadline, enforce_size_limit, BlobMeta, Storage};
use crate::{CacheError, Result};

#[derive(Debug, Clone)]
struct MemoryBlob {
    data: Arc<[u8]>,
    accessed: SystemTime,
    modified: SystemTime,
}

/// In-memory cache storage
///
/// Follows the same recency convention and size bound as
/// [`LocalFileStorage`](super::LocalFileStorage), but lives only as long as
/// the process. Clones share the same blobs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    blobs: Arc<RwLock<HashMap<String, MemoryBlob>>>,
    max_size: Option<u64>,
}

impl MemoryStorage {
    /// Create new in-memory storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the total size of stored blobs, evicting least recently used ones
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = Some(max_size);
        self
    }

    pub fn max_size(&self) -> Option<u64> {
        self.max_size
    }

    /// Number of stored blobs
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str, deadline: Option<SystemTime>) -> Result<Vec<u8>> {
        let mut blobs = self.blobs.write();
        let blob = blobs.get_mut(key).ok_or_else(|| CacheError::NotFound {
            key: key.to_string(),
        })?;

        check_deadline(key, blob.modified, deadline)?;
        blob.accessed = SystemTime::now();
        Ok(blob.data.to_vec())
    }

    fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        let mut blobs = self.blobs.write();

        if let Some(max_size) = self.max_size {
            let listing = blobs
                .iter()
                .map(|(k, b)| BlobMeta {
                    key: k.clone(),
                    size: b.data.len() as u64,
                    accessed: b.accessed,
                    modified: b.modified,
                })
                .collect();
            enforce_size_limit(listing, key, data.len() as u64, max_size, |victim| {
                blobs.remove(&victim.key);
                Ok(())
            });
        }

        let now = SystemTime::now();
        blobs.insert(
            key.to_string(),
            MemoryBlob {
                data: Arc::from(data),
                accessed: now,
                modified: now,
            },
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.blobs.write().remove(key);
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.blobs.read().contains_key(key))
    }

    fn entries(&self) -> Result<Vec<BlobMeta>> {
        let blobs = self.blobs.read();
        let mut entries: Vec<BlobMeta> = blobs
            .iter()
            .map(|(key, blob)| BlobMeta {
                key: key.clone(),
                size: blob.data.len() as u64,
                accessed: blob.accessed,
                modified: blob.modified,
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    fn clear(&self) -> Result<()> {
        self.blobs.write().clear();
        Ok(())
    }
}
