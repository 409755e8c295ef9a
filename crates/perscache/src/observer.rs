//! Cache event sink
//!
//! The engine reports every lookup outcome to the observers attached to its
//! [`Cache`](crate::Cache). Observers are attached and detached explicitly;
//! nothing here is process-global.

use std::{fmt, time::Duration};

/// Why a lookup did not produce a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MissReason {
    /// No blob for the key
    NotFound,
    /// The blob is older than the TTL deadline
    Expired,
    /// The blob could not be decoded
    Corrupt,
    /// The storage failed to read the blob
    ReadFailed,
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            MissReason::NotFound => "not found",
            MissReason::Expired => "expired",
            MissReason::Corrupt => "corrupt",
            MissReason::ReadFailed => "read failed",
        };
        f.write_str(reason)
    }
}

/// One observable step of a cached call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// A stored value was decoded and returned
    Hit {
        function: String,
        key: String,
        elapsed: Duration,
    },
    /// The callable had to run
    Miss {
        function: String,
        key: String,
        reason: MissReason,
    },
    /// A fresh result was persisted
    Stored {
        function: String,
        key: String,
        bytes: u64,
        elapsed: Duration,
    },
    /// A fresh result could not be persisted; it was still returned
    StoreFailed {
        function: String,
        key: String,
        error: String,
    },
    /// No key could be derived for the arguments; the call ran uncached
    KeyFailed { function: String, error: String },
    /// Caching is disabled; the callable ran directly
    Bypassed { function: String },
}

impl CacheEvent {
    /// Short name of the callable the event belongs to
    pub fn function(&self) -> &str {
        match self {
            CacheEvent::Hit { function, .. }
            | CacheEvent::Miss { function, .. }
            | CacheEvent::Stored { function, .. }
            | CacheEvent::StoreFailed { function, .. }
            | CacheEvent::KeyFailed { function, .. }
            | CacheEvent::Bypassed { function } => function,
        }
    }
}

/// Receives cache events
pub trait CacheObserver: Send + Sync {
    fn on_event(&self, event: &CacheEvent);
}

impl<F> CacheObserver for F
where
    F: Fn(&CacheEvent) + Send + Sync,
{
    fn on_event(&self, event: &CacheEvent) {
        self(event)
    }
}
