//! Cache-related error types

use std::{fmt, path::PathBuf};

use thiserror::Error;

/// Storage operation that failed, for error context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOperation {
    Read,
    Write,
    Delete,
    List,
    Metadata,
    CreateDir,
}

impl fmt::Display for IoOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IoOperation::Read => "read",
            IoOperation::Write => "write",
            IoOperation::Delete => "delete",
            IoOperation::List => "list",
            IoOperation::Metadata => "metadata",
            IoOperation::CreateDir => "create dir",
        };
        f.write_str(name)
    }
}

/// Cache operation errors
///
/// Most of these never reach the caller of a cached function: the engine
/// treats them as misses or logs them and keeps the freshly computed value.
/// They surface directly only from storage, serializer and configuration APIs.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache entry not found: {key}")]
    NotFound { key: String },

    #[error("Cache entry expired: {key}")]
    Expired { key: String },

    #[error("Serialization error ({format}): {message}")]
    Serialization { format: String, message: String },

    #[error("Deserialization error ({format}): {message}")]
    Deserialization { format: String, message: String },

    #[error("Storage IO error on {path} ({operation}): {source}")]
    StorageIo {
        path: PathBuf,
        operation: IoOperation,
        source: std::io::Error,
    },

    #[error("Failed to evict {path}: {source}")]
    Eviction {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid cache key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Cannot derive cache key from argument {argument}: {message}")]
    KeyDerivation { argument: String, message: String },

    #[error("Invalid cache configuration for {field}: {message}")]
    InvalidConfig { field: String, message: String },

    #[error("Storage task failed: {message}")]
    Task { message: String },
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, operation: IoOperation, source: std::io::Error) -> Self {
        CacheError::StorageIo {
            path: path.into(),
            operation,
            source,
        }
    }

    pub(crate) fn serialization(format: &str, message: impl fmt::Display) -> Self {
        CacheError::Serialization {
            format: format.to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn deserialization(format: &str, message: impl fmt::Display) -> Self {
        CacheError::Deserialization {
            format: format.to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn invalid_config(field: &str, message: impl fmt::Display) -> Self {
        CacheError::InvalidConfig {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    /// Whether the error means "no usable entry" rather than a broken medium.
    ///
    /// Missing, expired and undecodable entries are all recomputed.
    pub fn is_miss(&self) -> bool {
        matches!(
            self,
            CacheError::NotFound { .. } | CacheError::Expired { .. } | CacheError::Deserialization { .. }
        )
    }
}

/// Re-export commonly used Result type
pub type Result<T> = std::result::Result<T, CacheError>;
