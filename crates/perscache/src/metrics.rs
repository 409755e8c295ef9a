//! Cache performance counters

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant, SystemTime},
};

use serde::{Deserialize, Serialize};

use crate::observer::{CacheEvent, CacheObserver, MissReason};

/// Cache performance statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups answered from storage
    pub hits: u64,
    /// Lookups that ran the callable, including expired and corrupt entries
    pub misses: u64,
    /// Misses caused by a TTL deadline
    pub expirations: u64,
    /// Misses caused by a payload that failed to decode
    pub corrupt: u64,
    /// Results persisted
    pub stores: u64,
    /// Results computed but not persisted
    pub store_failures: u64,
    /// Calls that ran uncached because no key could be derived
    pub key_failures: u64,
    /// Calls made while caching was disabled
    pub bypassed: u64,
    /// Payload bytes written
    pub bytes_written: u64,
    /// Average time to read and decode a hit (milliseconds)
    pub avg_retrieval_time_ms: f64,
    /// Average time to encode and write a result (milliseconds)
    pub avg_store_time_ms: f64,
    /// Timestamp of cache creation
    pub created_at: SystemTime,
}

impl CacheStats {
    /// Hit rate as a percentage (0.0 to 100.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }

    /// Miss rate as a percentage (0.0 to 100.0)
    pub fn miss_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            100.0 - self.hit_rate()
        }
    }

    pub fn uptime(&self) -> Duration {
        SystemTime::now()
            .duration_since(self.created_at)
            .unwrap_or(Duration::ZERO)
    }
}

/// Thread-safe cache metrics tracker
///
/// Clones share counters. Attached to every [`Cache`](crate::Cache) as an
/// observer.
#[derive(Debug, Clone)]
pub struct CacheMetrics {
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    expirations: Arc<AtomicU64>,
    corrupt: Arc<AtomicU64>,
    stores: Arc<AtomicU64>,
    store_failures: Arc<AtomicU64>,
    key_failures: Arc<AtomicU64>,
    bypassed: Arc<AtomicU64>,
    bytes_written: Arc<AtomicU64>,
    total_retrieval_time_us: Arc<AtomicU64>,
    total_store_time_us: Arc<AtomicU64>,
    created_at: SystemTime,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self {
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
            expirations: Arc::new(AtomicU64::new(0)),
            corrupt: Arc::new(AtomicU64::new(0)),
            stores: Arc::new(AtomicU64::new(0)),
            store_failures: Arc::new(AtomicU64::new(0)),
            key_failures: Arc::new(AtomicU64::new(0)),
            bypassed: Arc::new(AtomicU64::new(0)),
            bytes_written: Arc::new(AtomicU64::new(0)),
            total_retrieval_time_us: Arc::new(AtomicU64::new(0)),
            total_store_time_us: Arc::new(AtomicU64::new(0)),
            created_at: SystemTime::now(),
        }
    }

    /// Record a cache hit with timing
    pub fn record_hit(&self, retrieval_time: Duration) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        self.total_retrieval_time_us
            .fetch_add(retrieval_time.as_micros() as u64, Ordering::Relaxed);
    }

    /// Record a cache miss
    pub fn record_miss(&self, reason: MissReason) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        match reason {
            MissReason::Expired => {
                self.expirations.fetch_add(1, Ordering::Relaxed);
            }
            MissReason::Corrupt => {
                self.corrupt.fetch_add(1, Ordering::Relaxed);
            }
            MissReason::NotFound | MissReason::ReadFailed => {}
        }
    }

    /// Record a persisted result with timing
    pub fn record_store(&self, store_time: Duration, bytes: u64) {
        self.stores.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
        self.total_store_time_us
            .fetch_add(store_time.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_key_failure(&self) {
        self.key_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bypass(&self) {
        self.bypassed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current statistics snapshot
    pub fn snapshot(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let stores = self.stores.load(Ordering::Relaxed);
        let retrieval_us = self.total_retrieval_time_us.load(Ordering::Relaxed);
        let store_us = self.total_store_time_us.load(Ordering::Relaxed);

        let average_ms = |total_us: u64, count: u64| {
            if count > 0 {
                total_us as f64 / count as f64 / 1000.0
            } else {
                0.0
            }
        };

        CacheStats {
            hits,
            misses: self.misses.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            corrupt: self.corrupt.load(Ordering::Relaxed),
            stores,
            store_failures: self.store_failures.load(Ordering::Relaxed),
            key_failures: self.key_failures.load(Ordering::Relaxed),
            bypassed: self.bypassed.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            avg_retrieval_time_ms: average_ms(retrieval_us, hits),
            avg_store_time_ms: average_ms(store_us, stores),
            created_at: self.created_at,
        }
    }

    /// Reset all counters
    pub fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.expirations,
            &self.corrupt,
            &self.stores,
            &self.store_failures,
            &self.key_failures,
            &self.bypassed,
            &self.bytes_written,
            &self.total_retrieval_time_us,
            &self.total_store_time_us,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Get a formatted summary of cache metrics
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "Cache Metrics:\n  Hits: {}\n  Misses: {}\n  Hit Rate: {:.2}%\n  Expired: {}\n  Stores: {}\n  Store Failures: {}\n  Bytes Written: {}\n  Avg Retrieval: {:.2}ms\n  Avg Store: {:.2}ms",
            stats.hits,
            stats.misses,
            stats.hit_rate(),
            stats.expirations,
            stats.stores,
            stats.store_failures,
            stats.bytes_written,
            stats.avg_retrieval_time_ms,
            stats.avg_store_time_ms,
        )
    }
}

impl Default for CacheMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheObserver for CacheMetrics {
    fn on_event(&self, event: &CacheEvent) {
        match event {
            CacheEvent::Hit { elapsed, .. } => self.record_hit(*elapsed),
            CacheEvent::Miss { reason, .. } => self.record_miss(*reason),
            CacheEvent::Stored { bytes, elapsed, .. } => self.record_store(*elapsed, *bytes),
            CacheEvent::StoreFailed { .. } => self.record_store_failure(),
            CacheEvent::KeyFailed { .. } => self.record_key_failure(),
            CacheEvent::Bypassed { .. } => self.record_bypass(),
        }
    }
}

/// Operation timing helper
#[derive(Debug)]
pub struct OperationTimer {
    start_time: Instant,
}

impl OperationTimer {
    /// Start timing an operation
    pub fn start() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }
}
