//! # Perscache
//!
//! Persistent memoization: the result of an expensive function is stored on
//! disk (or in any other [`Storage`]) under a key derived from the function's
//! name, its source text, its arguments and the serializer used, and served
//! from there on later calls, in this process or the next one.
//!
//! ## Features
//!
//! - **Code-aware keys**: editing a function body invalidates its entries
//! - **Pluggable serializers**: bincode (default), JSON, YAML, gzip-able CSV tables
//! - **Pluggable storage**: local directory or in-memory, with LRU size bounds
//! - **TTL expiry** per function or per cache
//! - **Sync and async** functions, free functions and methods
//! - **Observability**: `tracing` logs, counters and an attachable event sink
//!
//! ```no_run
//! use perscache::{callable, Cache};
//!
//! let cache = Cache::new();
//! let slow_square = cache
//!     .function(callable!(slow_square, |x: u64| {
//!         std::thread::sleep(std::time::Duration::from_secs(1));
//!         x * x
//!     }))
//!     .build()?;
//!
//! assert_eq!(slow_square.call((12,)), 144);
//! assert_eq!(slow_square.call((12,)), 144); // served from .cache/
//! # Ok::<(), perscache::CacheError>(())
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod key;
pub mod logging;
pub mod metrics;
pub mod observer;
pub mod serializer;
pub mod storage;

pub use cache::{Cache, CachedFn, CachedFnBuilder};
pub use config::CacheConfig;
pub use error::{CacheError, IoOperation};
pub use key::{
    Arguments, CacheKey, CacheKeyBuilder, Callable, FnIdentity, InstanceId, InstanceKey, InstanceTag, NamedArgs,
};
pub use metrics::{CacheMetrics, CacheStats, OperationTimer};
pub use observer::{CacheEvent, CacheObserver, MissReason};
pub use serializer::{
    BincodeSerializer, Compression, CsvSerializer, FnSerializer, JsonSerializer, Serializer, Table, YamlSerializer,
};
pub use storage::{BlobMeta, LocalFileStorage, MemoryStorage, Storage};

/// Re-export commonly used types
pub type Result<T> = std::result::Result<T, CacheError>;
