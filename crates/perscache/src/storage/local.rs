//! Directory-backed storage with an optional size bound
//!
//! Recency convention: a blob's access time is its LRU position and its
//! modification time is its age. `write` sets both to now, `read` refreshes
//! only the access time, so reading an entry keeps it from being evicted but
//! never extends its TTL.

use std::{
    fs::{self, FileTimes, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    time::SystemTime,
};

use tracing::{debug, warn};

use super::{check_deadline, enforce_size_limit, BlobMeta, Storage};
use crate::{error::IoOperation, CacheError, Result};

/// Default cache directory, relative to the working directory
pub const DEFAULT_LOCATION: &str = ".cache";

/// File-per-entry storage rooted at a directory
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    location: PathBuf,
    max_size: Option<u64>,
}

impl LocalFileStorage {
    /// Create storage rooted at `location`; the directory is created on first write
    pub fn new<P: AsRef<Path>>(location: P) -> Self {
        Self {
            location: location.as_ref().to_path_buf(),
            max_size: None,
        }
    }

    /// Bound the total size of stored blobs, evicting least recently used ones
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = Some(max_size);
        self
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn max_size(&self) -> Option<u64> {
        self.max_size
    }

    /// Get file path for a key
    fn blob_path(&self, key: &str) -> Result<PathBuf> {
        let reason = if key.is_empty() {
            Some("key is empty")
        } else if key.contains(['/', '\\']) {
            Some("key contains a path separator")
        } else if key.starts_with('.') {
            Some("key starts with a dot")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(CacheError::InvalidKey {
                key: key.to_string(),
                reason: reason.to_string(),
            }),
            None => Ok(self.location.join(key)),
        }
    }

    /// Ensure base directory exists
    fn ensure_location(&self) -> Result<()> {
        if !self.location.exists() {
            fs::create_dir_all(&self.location)
                .map_err(|e| CacheError::io(&self.location, IoOperation::CreateDir, e))?;
            debug!("Created cache directory: {}", self.location.display());
        }
        Ok(())
    }

    fn evict_for(&self, key: &str, incoming: u64, max_size: u64) -> Result<()> {
        let report = enforce_size_limit(self.entries()?, key, incoming, max_size, |blob| {
            let path = self.location.join(&blob.key);
            match fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(CacheError::Eviction { path, source: e }),
            }
        });

        if !report.evicted.is_empty() || report.failed > 0 {
            debug!(
                "Evicted {} blobs from {} ({} failed), {} bytes after write",
                report.evicted.len(),
                self.location.display(),
                report.failed,
                report.total_after
            );
        }
        Ok(())
    }
}

impl Default for LocalFileStorage {
    fn default() -> Self {
        Self::new(DEFAULT_LOCATION)
    }
}

fn touch_accessed(path: &Path) -> std::io::Result<()> {
    let file = OpenOptions::new().write(true).open(path)?;
    file.set_times(FileTimes::new().set_accessed(SystemTime::now()))
}

fn blob_meta(key: String, metadata: &fs::Metadata) -> std::io::Result<BlobMeta> {
    let modified = metadata.modified()?;
    let accessed = metadata.accessed().unwrap_or(modified);
    Ok(BlobMeta {
        key,
        size: metadata.len(),
        accessed,
        modified,
    })
}

impl Storage for LocalFileStorage {
    fn read(&self, key: &str, deadline: Option<SystemTime>) -> Result<Vec<u8>> {
        let path = self.blob_path(key)?;

        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CacheError::NotFound { key: key.to_string() })
            }
            Err(e) => return Err(CacheError::io(&path, IoOperation::Metadata, e)),
        };

        let modified = metadata
            .modified()
            .map_err(|e| CacheError::io(&path, IoOperation::Metadata, e))?;
        check_deadline(key, modified, deadline)?;

        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CacheError::NotFound { key: key.to_string() })
            }
            Err(e) => return Err(CacheError::io(&path, IoOperation::Read, e)),
        };

        if let Err(e) = touch_accessed(&path) {
            debug!("Could not refresh access time of {}: {}", path.display(), e);
        }

        Ok(data)
    }

    fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.blob_path(key)?;
        self.ensure_location()?;

        if let Some(max_size) = self.max_size {
            self.evict_for(key, data.len() as u64, max_size)?;
        }

        let mut tmp = tempfile::Builder::new()
            .prefix(".")
            .suffix(".tmp")
            .tempfile_in(&self.location)
            .map_err(|e| CacheError::io(&self.location, IoOperation::Write, e))?;

        let now = SystemTime::now();
        tmp.write_all(data)
            .and_then(|_| tmp.as_file().sync_all())
            .and_then(|_| {
                tmp.as_file()
                    .set_times(FileTimes::new().set_accessed(now).set_modified(now))
            })
            .map_err(|e| CacheError::io(tmp.path(), IoOperation::Write, e))?;

        tmp.persist(&path)
            .map_err(|e| CacheError::io(&path, IoOperation::Write, e.error))?;

        debug!("Wrote {} bytes to {}", data.len(), path.display());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let path = self.blob_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::io(&path, IoOperation::Delete, e)),
        }
    }

    fn exists(&self, key: &str) -> Result<bool> {
        let path = self.blob_path(key)?;
        path.try_exists()
            .map_err(|e| CacheError::io(&path, IoOperation::Metadata, e))
    }

    fn entries(&self) -> Result<Vec<BlobMeta>> {
        let dir = match fs::read_dir(&self.location) {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CacheError::io(&self.location, IoOperation::List, e)),
        };

        let mut entries = Vec::new();
        for entry in dir {
            let entry = entry.map_err(|e| CacheError::io(&self.location, IoOperation::List, e))?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }

            // Blobs can vanish between listing and stat under concurrent eviction
            let metadata = match entry.metadata() {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(CacheError::io(entry.path(), IoOperation::Metadata, e)),
            };

            match blob_meta(name, &metadata) {
                Ok(meta) => entries.push(meta),
                Err(e) => warn!("Skipping {} without timestamps: {}", entry.path().display(), e),
            }
        }

        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }
}

/// Pin a blob's timestamps so recency-dependent tests are deterministic
#[cfg(test)]
pub(crate) fn set_blob_times(path: &Path, accessed: SystemTime, modified: SystemTime) {
    let file = OpenOptions::new().write(true).open(path).unwrap();
    file.set_times(FileTimes::new().set_accessed(accessed).set_modified(modified))
        .unwrap();
}
