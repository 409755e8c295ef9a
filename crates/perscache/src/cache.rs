//! Memoizing call engine
//!
//! [`Cache`] holds what cached functions share: the storage, a default TTL,
//! metrics and the observer slot. [`Cache::function`] starts the
//! registration of one callable; the resulting [`CachedFn`] runs the
//! check, hit, miss and store cycle on every call.
//!
//! Failures inside the caching machinery never reach the caller: a value that
//! cannot be keyed, read, decoded, encoded or written is simply computed
//! (and, where possible, still returned). Errors raised by the callable
//! itself propagate and are never stored.

use std::{
    collections::BTreeSet,
    convert::Infallible,
    fmt,
    future::Future,
    sync::Arc,
    time::{Duration, SystemTime},
};

use parking_lot::RwLock;
use tokio::runtime::Handle;
use tracing::{debug, trace, warn, Level};

use crate::{
    config::CacheConfig,
    key::{Arguments, CacheKey, CacheKeyBuilder, Callable, FnIdentity, InstanceKey, InstanceTag},
    logging::{preview, preview_args},
    metrics::{CacheMetrics, CacheStats, OperationTimer},
    observer::{CacheEvent, CacheObserver, MissReason},
    serializer::{BincodeSerializer, Serializer},
    storage::{LocalFileStorage, MemoryStorage, Storage},
    CacheError, Result,
};

/// Shared context of cached functions
///
/// Clones share the storage, the metrics and the observer slot, so an
/// observer attached to any clone sees calls made through all of them.
#[derive(Clone)]
pub struct Cache {
    storage: Arc<dyn Storage>,
    default_ttl: Option<Duration>,
    metrics: CacheMetrics,
    observer: Arc<RwLock<Option<Arc<dyn CacheObserver>>>>,
    bypass: bool,
}

impl Cache {
    /// Cache in the default local directory (`.cache`)
    pub fn new() -> Self {
        Self::with_storage(LocalFileStorage::default())
    }

    pub fn with_storage<S: Storage + 'static>(storage: S) -> Self {
        Self::from_shared(Arc::new(storage))
    }

    pub fn from_shared(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            default_ttl: None,
            metrics: CacheMetrics::new(),
            observer: Arc::new(RwLock::new(None)),
            bypass: false,
        }
    }

    /// A cache that never caches
    ///
    /// Every registered function runs directly on every call, whatever its
    /// registration says. Swapping this in disables caching without touching
    /// call sites.
    pub fn no_cache() -> Self {
        Self {
            bypass: true,
            ..Self::with_storage(MemoryStorage::new())
        }
    }

    /// Local file cache described by a configuration
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        config.validate()?;
        if config.disabled {
            return Ok(Self::no_cache());
        }

        let mut storage = LocalFileStorage::new(&config.location);
        if let Some(max_size) = config.max_size {
            storage = storage.with_max_size(max_size);
        }

        let mut cache = Self::with_storage(storage);
        cache.default_ttl = config.default_ttl();
        Ok(cache)
    }

    /// TTL for functions registered without one
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Attach an observer, replacing any previous one
    pub fn with_observer(self, observer: Arc<dyn CacheObserver>) -> Self {
        self.attach_observer(observer);
        self
    }

    /// Detach the observer
    pub fn without_observer(self) -> Self {
        self.detach_observer();
        self
    }

    /// Attach an observer to this cache and every function registered with it
    pub fn attach_observer(&self, observer: Arc<dyn CacheObserver>) {
        *self.observer.write() = Some(observer);
    }

    /// Detach the observer, returning it
    pub fn detach_observer(&self) -> Option<Arc<dyn CacheObserver>> {
        self.observer.write().take()
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypass
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Snapshot of the counters shared by all functions of this cache
    pub fn stats(&self) -> CacheStats {
        self.metrics.snapshot()
    }

    /// Remove every entry from the default storage
    pub fn clear(&self) -> Result<()> {
        self.storage.clear()?;
        debug!("Cleared all cache entries");
        Ok(())
    }

    /// Start registering a callable
    pub fn function<F>(&self, callable: Callable<F>) -> CachedFnBuilder<F> {
        let (identity, func) = callable.into_parts();
        CachedFnBuilder {
            cache: self.clone(),
            identity,
            func,
            serializer: BincodeSerializer::new(),
            storage: None,
            ttl: None,
            ignore: BTreeSet::new(),
            shared_across_instances: false,
        }
    }

    fn emit(&self, event: CacheEvent) {
        self.metrics.on_event(&event);
        let observer = self.observer.read().clone();
        if let Some(observer) = observer {
            observer.on_event(&event);
        }
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("storage", &self.storage)
            .field("default_ttl", &self.default_ttl)
            .field("bypass", &self.bypass)
            .field("observer", &self.observer.read().is_some())
            .finish()
    }
}

/// Registration-time settings of one cached function
///
/// Everything set here is fixed once [`build`](Self::build) returns.
pub struct CachedFnBuilder<F, S = BincodeSerializer> {
    cache: Cache,
    identity: FnIdentity,
    func: F,
    serializer: S,
    storage: Option<Arc<dyn Storage>>,
    ttl: Option<Duration>,
    ignore: BTreeSet<String>,
    shared_across_instances: bool,
}

impl<F, S> CachedFnBuilder<F, S> {
    /// Store results with another serializer
    pub fn serializer<S2>(self, serializer: S2) -> CachedFnBuilder<F, S2> {
        CachedFnBuilder {
            cache: self.cache,
            identity: self.identity,
            func: self.func,
            serializer,
            storage: self.storage,
            ttl: self.ttl,
            ignore: self.ignore,
            shared_across_instances: self.shared_across_instances,
        }
    }

    /// Store results somewhere other than the cache's storage
    pub fn storage<St: Storage + 'static>(self, storage: St) -> Self {
        self.shared_storage(Arc::new(storage))
    }

    pub fn shared_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Treat entries older than `ttl` as absent
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Leave these parameters out of the key
    pub fn ignore<I, N>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.ignore.extend(names.into_iter().map(Into::into));
        self
    }

    /// Let all receivers of a method share entries
    pub fn shared_across_instances(mut self) -> Self {
        self.shared_across_instances = true;
        self
    }

    /// Validate the settings and finish the registration
    pub fn build(self) -> Result<CachedFn<F, S>> {
        let ttl = self.ttl.or(self.cache.default_ttl);
        if ttl == Some(Duration::ZERO) {
            return Err(CacheError::invalid_config("ttl", "must be positive"));
        }

        let params = self.identity.params();
        if !params.is_empty() {
            if let Some(unknown) = self.ignore.iter().find(|name| !params.contains(*name)) {
                return Err(CacheError::invalid_config(
                    "ignore",
                    format!("{} has no parameter named {unknown:?}", self.identity.name()),
                ));
            }
        }

        let storage = self
            .storage
            .unwrap_or_else(|| Arc::clone(&self.cache.storage));

        Ok(CachedFn {
            cache: self.cache,
            storage,
            identity: self.identity,
            func: self.func,
            serializer: self.serializer,
            ttl,
            ignore: self.ignore,
            shared_across_instances: self.shared_across_instances,
        })
    }
}

impl<F, S: fmt::Debug> fmt::Debug for CachedFnBuilder<F, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedFnBuilder")
            .field("identity", &self.identity)
            .field("serializer", &self.serializer)
            .field("ttl", &self.ttl)
            .field("ignore", &self.ignore)
            .finish_non_exhaustive()
    }
}

/// A memoized function
///
/// Arguments are passed as one tuple (or [`NamedArgs`](crate::NamedArgs)).
/// The callable's own errors and panics pass through untouched and nothing
/// is stored for them. Concurrent calls with the same key may all miss and
/// all compute; the last write wins.
pub struct CachedFn<F, S = BincodeSerializer> {
    cache: Cache,
    storage: Arc<dyn Storage>,
    identity: FnIdentity,
    func: F,
    serializer: S,
    ttl: Option<Duration>,
    ignore: BTreeSet<String>,
    shared_across_instances: bool,
}

impl<F, S> CachedFn<F, S> {
    pub fn identity(&self) -> &FnIdentity {
        &self.identity
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub fn ignored(&self) -> &BTreeSet<String> {
        &self.ignore
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn serializer(&self) -> &S {
        &self.serializer
    }

    /// Call through the cache
    pub fn call<A, T>(&self, args: A) -> T
    where
        F: Fn(A) -> T,
        A: Arguments,
        S: Serializer<T>,
        T: fmt::Debug,
    {
        match self.run(args, None, |args| Ok::<T, Infallible>((self.func)(args))) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Call a fallible function through the cache; only `Ok` results are stored
    pub fn try_call<A, T, E>(&self, args: A) -> std::result::Result<T, E>
    where
        F: Fn(A) -> std::result::Result<T, E>,
        A: Arguments,
        S: Serializer<T>,
        T: fmt::Debug,
        E: fmt::Debug,
    {
        self.run(args, None, |args| (self.func)(args))
    }

    /// Await an async function through the cache
    ///
    /// Storage I/O runs on Tokio's blocking pool when called inside a runtime.
    pub async fn call_async<A, T, Fut>(&self, args: A) -> T
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = T>,
        A: Arguments,
        S: Serializer<T>,
        T: fmt::Debug,
    {
        let outcome = self
            .run_async(args, None, |args| {
                let computation = (self.func)(args);
                async move { Ok::<T, Infallible>(computation.await) }
            })
            .await;
        match outcome {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Await a fallible async function through the cache
    pub async fn try_call_async<A, T, E, Fut>(&self, args: A) -> std::result::Result<T, E>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        A: Arguments,
        S: Serializer<T>,
        T: fmt::Debug,
        E: fmt::Debug,
    {
        self.run_async(args, None, |args| (self.func)(args)).await
    }

    /// Call a method through the cache
    ///
    /// Entries are scoped to `receiver` unless the function was registered
    /// with [`shared_across_instances`](CachedFnBuilder::shared_across_instances).
    pub fn call_method<R, A, T>(&self, receiver: &R, args: A) -> T
    where
        R: InstanceKey + ?Sized,
        F: Fn(&R, A) -> T,
        A: Arguments,
        S: Serializer<T>,
        T: fmt::Debug,
    {
        let instance = self.instance_tag(receiver);
        match self.run(args, instance, |args| Ok::<T, Infallible>((self.func)(receiver, args))) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Await an async method through the cache
    ///
    /// The returned future must not borrow the receiver; copy what it needs
    /// out of the receiver before the `async` block.
    pub async fn call_method_async<R, A, T, Fut>(&self, receiver: &R, args: A) -> T
    where
        R: InstanceKey + ?Sized,
        F: Fn(&R, A) -> Fut,
        Fut: Future<Output = T>,
        A: Arguments,
        S: Serializer<T>,
        T: fmt::Debug,
    {
        let instance = self.instance_tag(receiver);
        let outcome = self
            .run_async(args, instance, |args| {
                let computation = (self.func)(receiver, args);
                async move { Ok::<T, Infallible>(computation.await) }
            })
            .await;
        match outcome {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    fn instance_tag<R: InstanceKey + ?Sized>(&self, receiver: &R) -> Option<InstanceTag> {
        if self.shared_across_instances {
            None
        } else {
            Some(InstanceTag::of(receiver))
        }
    }

    fn run<A, T, E>(
        &self,
        args: A,
        instance: Option<InstanceTag>,
        compute: impl FnOnce(A) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        A: Arguments,
        S: Serializer<T>,
        T: fmt::Debug,
        E: fmt::Debug,
    {
        let Some(key) = self.prepare::<A, T>(&args, instance) else {
            return self.compute_uncached(args, compute);
        };

        let timer = OperationTimer::start();
        let read = self.storage.read(&key, self.deadline());
        if let Some(value) = self.accept(&key, read, &timer) {
            return Ok(value);
        }

        let value = self.compute_traced(args, compute)?;
        if let Some(payload) = self.encode(&key, &value) {
            let timer = OperationTimer::start();
            let written = self.storage.write(&key, &payload);
            self.record_write(&key, written, payload.len(), &timer);
        }
        Ok(value)
    }

    async fn run_async<A, T, E, Fut>(
        &self,
        args: A,
        instance: Option<InstanceTag>,
        compute: impl FnOnce(A) -> Fut,
    ) -> std::result::Result<T, E>
    where
        A: Arguments,
        S: Serializer<T>,
        T: fmt::Debug,
        E: fmt::Debug,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let Some(key) = self.prepare::<A, T>(&args, instance) else {
            if !self.cache.bypass {
                trace!("{} running uncached", self.identity.name());
            }
            return self.trace_outcome(compute(args).await);
        };

        let timer = OperationTimer::start();
        let read = {
            let storage = Arc::clone(&self.storage);
            let key = key.clone();
            let deadline = self.deadline();
            offload(move || storage.read(&key, deadline)).await
        };
        if let Some(value) = self.accept(&key, read, &timer) {
            return Ok(value);
        }

        let outcome = compute(args).await;
        let value = self.trace_outcome(outcome)?;
        if let Some(payload) = self.encode(&key, &value) {
            let timer = OperationTimer::start();
            let size = payload.len();
            let storage = Arc::clone(&self.storage);
            let target = key.clone();
            let written = offload(move || storage.write(&target, &payload)).await;
            self.record_write(&key, written, size, &timer);
        }
        Ok(value)
    }

    /// Storage key for this call, or `None` when the call must run uncached
    fn prepare<A: Arguments, T>(&self, args: &A, instance: Option<InstanceTag>) -> Option<String>
    where
        S: Serializer<T>,
    {
        let function = self.identity.name();
        if self.cache.bypass {
            trace!("{} called with caching disabled", function);
            self.cache.emit(CacheEvent::Bypassed {
                function: function.to_string(),
            });
            return None;
        }

        if tracing::enabled!(Level::TRACE) {
            if let Ok(bound) = args.bind(self.identity.params()) {
                trace!("{}({})", function, preview_args(&bound));
            }
        }

        let derived: Result<CacheKey> = CacheKeyBuilder::new(
            &self.identity,
            self.serializer.format_id(),
            self.serializer.extension(),
        )
        .ignore(&self.ignore)
        .instance(instance)
        .build(args);

        match derived {
            Ok(key) => Some(key.file_name()),
            Err(e) => {
                warn!("Cannot derive cache key for {}, calling uncached: {}", function, e);
                self.cache.emit(CacheEvent::KeyFailed {
                    function: function.to_string(),
                    error: e.to_string(),
                });
                None
            }
        }
    }

    fn deadline(&self) -> Option<SystemTime> {
        self.ttl.and_then(|ttl| SystemTime::now().checked_sub(ttl))
    }

    /// Decode a read result into a hit, reporting the miss otherwise
    fn accept<T>(&self, key: &str, read: Result<Vec<u8>>, timer: &OperationTimer) -> Option<T>
    where
        S: Serializer<T>,
        T: fmt::Debug,
    {
        let function = self.identity.name();
        let reason = match read {
            Ok(bytes) => match self.serializer.decode(&bytes) {
                Ok(value) => {
                    debug!("Cache hit for key: {}", key);
                    trace!("{} returned {} from cache", function, preview(&value));
                    self.cache.emit(CacheEvent::Hit {
                        function: function.to_string(),
                        key: key.to_string(),
                        elapsed: timer.elapsed(),
                    });
                    return Some(value);
                }
                Err(e) => {
                    warn!("Discarding undecodable cache entry {}: {}", key, e);
                    MissReason::Corrupt
                }
            },
            Err(CacheError::NotFound { .. }) => {
                debug!("Cache miss for key: {}", key);
                MissReason::NotFound
            }
            Err(CacheError::Expired { .. }) => {
                debug!("Cache expired for key: {}", key);
                MissReason::Expired
            }
            Err(e) => {
                warn!("Failed to read cache entry {}: {}", key, e);
                MissReason::ReadFailed
            }
        };

        self.cache.emit(CacheEvent::Miss {
            function: function.to_string(),
            key: key.to_string(),
            reason,
        });
        None
    }

    fn encode<T>(&self, key: &str, value: &T) -> Option<Vec<u8>>
    where
        S: Serializer<T>,
    {
        match self.serializer.encode(value) {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!("Not caching result for {}: {}", key, e);
                self.cache.emit(CacheEvent::StoreFailed {
                    function: self.identity.name().to_string(),
                    key: key.to_string(),
                    error: e.to_string(),
                });
                None
            }
        }
    }

    fn record_write(&self, key: &str, written: Result<()>, size: usize, timer: &OperationTimer) {
        let function = self.identity.name().to_string();
        match written {
            Ok(()) => {
                debug!("Cached value for key: {}", key);
                self.cache.emit(CacheEvent::Stored {
                    function,
                    key: key.to_string(),
                    bytes: size as u64,
                    elapsed: timer.elapsed(),
                });
            }
            Err(e) => {
                warn!("Failed to store cache entry {}: {}", key, e);
                self.cache.emit(CacheEvent::StoreFailed {
                    function,
                    key: key.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    fn compute_uncached<A, T, E>(
        &self,
        args: A,
        compute: impl FnOnce(A) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        T: fmt::Debug,
        E: fmt::Debug,
    {
        if !self.cache.bypass {
            trace!("{} running uncached", self.identity.name());
        }
        self.trace_outcome(compute(args))
    }

    fn compute_traced<A, T, E>(
        &self,
        args: A,
        compute: impl FnOnce(A) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        T: fmt::Debug,
        E: fmt::Debug,
    {
        self.trace_outcome(compute(args))
    }

    fn trace_outcome<T: fmt::Debug, E: fmt::Debug>(
        &self,
        outcome: std::result::Result<T, E>,
    ) -> std::result::Result<T, E> {
        match &outcome {
            Ok(value) => trace!("{} returned {}", self.identity.name(), preview(value)),
            Err(e) => trace!("{} failed, nothing cached: {}", self.identity.name(), preview(e)),
        }
        outcome
    }
}

impl<F, S: fmt::Debug> fmt::Debug for CachedFn<F, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedFn")
            .field("identity", &self.identity)
            .field("serializer", &self.serializer)
            .field("storage", &self.storage)
            .field("ttl", &self.ttl)
            .field("ignore", &self.ignore)
            .field("shared_across_instances", &self.shared_across_instances)
            .finish_non_exhaustive()
    }
}

/// Run blocking storage work off the async scheduler when a runtime is present
async fn offload<R, Op>(op: Op) -> Result<R>
where
    R: Send + 'static,
    Op: FnOnce() -> Result<R> + Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) => handle
            .spawn_blocking(op)
            .await
            .map_err(|e| CacheError::Task {
                message: e.to_string(),
            })?,
        Err(_) => op(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    use super::*;
    use crate::{callable, serializer::JsonSerializer, NamedArgs};

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    #[derive(Debug, Default)]
    struct Recorder(Mutex<Vec<CacheEvent>>);

    impl CacheObserver for Recorder {
        fn on_event(&self, event: &CacheEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    impl Recorder {
        fn kinds(&self) -> Vec<&'static str> {
            self.0
                .lock()
                .unwrap()
                .iter()
                .map(|e| match e {
                    CacheEvent::Hit { .. } => "hit",
                    CacheEvent::Miss { .. } => "miss",
                    CacheEvent::Stored { .. } => "stored",
                    CacheEvent::StoreFailed { .. } => "store_failed",
                    CacheEvent::KeyFailed { .. } => "key_failed",
                    CacheEvent::Bypassed { .. } => "bypassed",
                })
                .collect()
        }
    }

    #[test]
    fn test_second_call_is_a_hit() {
        let calls = counter();
        let seen = Arc::clone(&calls);
        let cache = Cache::with_storage(MemoryStorage::new());
        let square = cache
            .function(callable!(square, |x: u64| {
                seen.fetch_add(1, Ordering::SeqCst);
                x * x
            }))
            .build()
            .unwrap();

        assert_eq!(square.call((7,)), 49);
        assert_eq!(square.call((7,)), 49);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(square.call((8,)), 64);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.stores, 2);
    }

    #[test]
    fn test_observer_lifecycle() {
        let recorder = Arc::new(Recorder::default());
        let cache = Cache::with_storage(MemoryStorage::new()).with_observer(recorder.clone());
        let echo = cache.function(callable!(echo, |s: String| s)).build().unwrap();

        echo.call(("a".to_string(),));
        echo.call(("a".to_string(),));
        assert_eq!(recorder.kinds(), vec!["miss", "stored", "hit"]);

        assert!(cache.detach_observer().is_some());
        echo.call(("b".to_string(),));
        assert_eq!(recorder.kinds().len(), 3);
        assert_eq!(cache.stats().stores, 2);
    }

    #[test]
    fn test_errors_propagate_and_are_not_cached() {
        let calls = counter();
        let seen = Arc::clone(&calls);
        let cache = Cache::with_storage(MemoryStorage::new());
        let parse = cache
            .function(callable!(parse, |text: String| {
                seen.fetch_add(1, Ordering::SeqCst);
                text.parse::<i64>().map_err(|e| e.to_string())
            }))
            .build()
            .unwrap();

        assert!(parse.try_call(("nope".to_string(),)).is_err());
        assert!(parse.try_call(("nope".to_string(),)).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.storage().entries().unwrap().is_empty());

        assert_eq!(parse.try_call(("12".to_string(),)), Ok(12));
        assert_eq!(parse.try_call(("12".to_string(),)), Ok(12));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_bypass_always_runs() {
        let calls = counter();
        let seen = Arc::clone(&calls);
        let cache = Cache::no_cache();
        let tick = cache
            .function(callable!(tick, || seen.fetch_add(1, Ordering::SeqCst)))
            .ttl(Duration::from_secs(60))
            .build()
            .unwrap();

        assert_eq!(tick.call(()), 0);
        assert_eq!(tick.call(()), 1);
        assert_eq!(tick.call(()), 2);
        assert_eq!(cache.stats().bypassed, 3);
        assert!(cache.storage().entries().unwrap().is_empty());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let cache = Cache::with_storage(MemoryStorage::new());
        let err = cache
            .function(callable!(f, |x: u8| x))
            .ttl(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(err, CacheError::InvalidConfig { ref field, .. } if field == "ttl"));
    }

    #[test]
    fn test_unknown_ignored_parameter_rejected() {
        let cache = Cache::with_storage(MemoryStorage::new());
        let err = cache
            .function(callable!(f, |x: u8, verbose: bool| if verbose { x } else { 0 }))
            .ignore(["verbos"])
            .build()
            .unwrap_err();
        assert!(matches!(err, CacheError::InvalidConfig { ref field, .. } if field == "ignore"));
    }

    #[test]
    fn test_default_ttl_applies() {
        let cache = Cache::with_storage(MemoryStorage::new()).with_default_ttl(Duration::from_secs(5));
        let f = cache.function(callable!(f, |x: u8| x)).build().unwrap();
        assert_eq!(f.ttl(), Some(Duration::from_secs(5)));

        let g = cache
            .function(callable!(g, |x: u8| x))
            .ttl(Duration::from_secs(1))
            .build()
            .unwrap();
        assert_eq!(g.ttl(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_named_arguments() {
        let calls = counter();
        let seen = Arc::clone(&calls);
        let cache = Cache::with_storage(MemoryStorage::new());
        let search = cache
            .function(callable!(search, |args: NamedArgs| {
                seen.fetch_add(1, Ordering::SeqCst);
                args.get::<String>("query").unwrap_or_default()
            }))
            .serializer(JsonSerializer::new())
            .build()
            .unwrap();

        let first = NamedArgs::new().with("query", "rust").with("page", &1);
        let reordered = NamedArgs::new().with("page", &1).with("query", "rust");
        assert_eq!(search.call(first), "rust");
        assert_eq!(search.call(reordered), "rust");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_corrupt_entry_is_recomputed() {
        let storage = MemoryStorage::new();
        let cache = Cache::with_storage(storage.clone());
        let double = cache
            .function(callable!(double, |x: u32| x * 2))
            .serializer(JsonSerializer::new())
            .build()
            .unwrap();

        assert_eq!(double.call((4,)), 8);
        let key = storage.entries().unwrap()[0].key.clone();
        storage.write(&key, b"{ not json").unwrap();

        assert_eq!(double.call((4,)), 8);
        assert_eq!(cache.stats().corrupt, 1);
        assert_eq!(storage.read(&key, None).unwrap(), b"8");
    }

    #[tokio::test]
    async fn test_async_call_hits_after_first_await() {
        let calls = counter();
        let seen = Arc::clone(&calls);
        let cache = Cache::with_storage(MemoryStorage::new());
        let fetch = cache
            .function(callable!(fetch, |id: u32| {
                seen.fetch_add(1, Ordering::SeqCst);
                async move { format!("item-{id}") }
            }))
            .build()
            .unwrap();

        assert_eq!(fetch.call_async((3,)).await, "item-3");
        assert_eq!(fetch.call_async((3,)).await, "item-3");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_async_call_outside_runtime_runs_inline() {
        let cache = Cache::with_storage(MemoryStorage::new());
        let fetch = cache
            .function(callable!(fetch, |id: u32| async move { id + 1 }))
            .build()
            .unwrap();

        assert_eq!(futures::executor::block_on(fetch.call_async((1,))), 2);
        assert_eq!(futures::executor::block_on(fetch.call_async((1,))), 2);
        assert_eq!(cache.stats().hits, 1);
    }
}
