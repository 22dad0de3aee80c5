//! Metadata cache
//!
//! A byte-bounded cache in front of the metadata store. It holds three kinds
//! of values in one capacity budget:
//!
//! - tablet metadata snapshots and txn logs, keyed by store location
//! - schema descriptors, keyed by schema id
//! - the resolved schema of a tablet, keyed by tablet id
//!
//! plus an unbounded namespace of "global" schemas resolved through the
//! shard catalog, which have no version boundary to evict on.
//!
//! Values are `Arc`s of immutable objects. Eviction only drops the cache's
//! own reference; anything already handed to a caller stays valid.
//!
//! # Single-flight loading
//!
//! `get_or_load` collapses concurrent misses on one key into one loader
//! call. The first caller runs the loader, later callers park on a condvar
//! until it finishes and then share its result, error included. A failed
//! load is not cached, so the next miss starts a new episode.
//!
//! An `insert` or `erase` on a key with a load in progress marks that load
//! stale: its waiters still get the loaded value, but it is not published
//! over the newer state.

use dashmap::DashMap;
use lakeio_common::{Error, Result, SchemaDescriptor, SchemaId, TabletId, TabletMetadata, TxnLog};
use parking_lot::{Condvar, Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::mem::size_of;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use tracing::debug;

/// Cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// A store object (tablet metadata or txn log) by location
    Location(String),
    /// A schema descriptor by schema id
    Schema(SchemaId),
    /// The resolved schema of a tablet
    TabletSchema(TabletId),
}

impl CacheKey {
    fn memory_usage(&self) -> usize {
        size_of::<Self>()
            + match self {
                Self::Location(location) => location.capacity(),
                Self::Schema(_) | Self::TabletSchema(_) => 0,
            }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Location(location) => write!(f, "{location}"),
            Self::Schema(id) => write!(f, "schema:{id}"),
            Self::TabletSchema(id) => write!(f, "tablet_schema:{id}"),
        }
    }
}

/// A shared, immutable cached value
#[derive(Debug, Clone)]
pub enum CacheValue {
    Metadata(Arc<TabletMetadata>),
    Schema(Arc<SchemaDescriptor>),
    TxnLog(Arc<TxnLog>),
}

impl CacheValue {
    fn memory_usage(&self) -> usize {
        match self {
            Self::Metadata(m) => m.memory_usage(),
            Self::Schema(s) => s.memory_usage(),
            Self::TxnLog(t) => t.memory_usage(),
        }
    }
}

/// Types that can live in the metacache
pub trait CacheItem: Send + Sync + Sized + 'static {
    fn into_value(item: Arc<Self>) -> CacheValue;
    fn from_value(value: CacheValue) -> Option<Arc<Self>>;
}

impl CacheItem for TabletMetadata {
    fn into_value(item: Arc<Self>) -> CacheValue {
        CacheValue::Metadata(item)
    }

    fn from_value(value: CacheValue) -> Option<Arc<Self>> {
        match value {
            CacheValue::Metadata(m) => Some(m),
            _ => None,
        }
    }
}

impl CacheItem for SchemaDescriptor {
    fn into_value(item: Arc<Self>) -> CacheValue {
        CacheValue::Schema(item)
    }

    fn from_value(value: CacheValue) -> Option<Arc<Self>> {
        match value {
            CacheValue::Schema(s) => Some(s),
            _ => None,
        }
    }
}

impl CacheItem for TxnLog {
    fn into_value(item: Arc<Self>) -> CacheValue {
        CacheValue::TxnLog(item)
    }

    fn from_value(value: CacheValue) -> Option<Arc<Self>> {
        match value {
            CacheValue::TxnLog(t) => Some(t),
            _ => None,
        }
    }
}

/// Cache statistics
#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub evictions: AtomicU64,
    /// Loader invocations (one per miss episode)
    pub loads: AtomicU64,
    pub load_failures: AtomicU64,
}

impl CacheStats {
    /// Calculate hit ratio (0.0 to 1.0)
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            return 0.0;
        }
        hits as f64 / total as f64
    }

    /// Reset all statistics
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.loads.store(0, Ordering::Relaxed);
        self.load_failures.store(0, Ordering::Relaxed);
    }
}

struct CacheEntry {
    value: CacheValue,
    charge: usize,
    /// Logical clock of the last access, for LRU ordering
    last_access: AtomicU64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    usage: usize,
}

impl CacheState {
    fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.usage -= entry.charge;
        Some(entry)
    }

    fn lru_key(&self) -> Option<CacheKey> {
        self.entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access.load(Ordering::Relaxed))
            .map(|(key, _)| key.clone())
    }
}

/// One in-progress load, shared by everyone who missed on the key
#[derive(Default)]
struct Flight {
    result: Mutex<Option<Result<CacheValue>>>,
    done: Condvar,
    /// Set when the key was written or erased while loading
    stale: AtomicBool,
}

impl Flight {
    fn wait(&self) -> Result<CacheValue> {
        let mut result = self.result.lock();
        loop {
            if let Some(result) = result.as_ref() {
                return result.clone();
            }
            self.done.wait(&mut result);
        }
    }

    fn complete(&self, result: Result<CacheValue>) {
        *self.result.lock() = Some(result);
        self.done.notify_all();
    }
}

/// Finishes a flight even if the loader unwinds, so waiters never hang
struct FlightGuard<'a> {
    cache: &'a Metacache,
    key: &'a CacheKey,
    flight: Arc<Flight>,
    finished: bool,
}

impl FlightGuard<'_> {
    fn finish(mut self, result: Result<CacheValue>) -> Result<CacheValue> {
        self.cache.inflight.lock().remove(self.key);
        self.flight.complete(result.clone());
        self.finished = true;
        result
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.cache.inflight.lock().remove(self.key);
            self.flight
                .complete(Err(Error::internal(format!("load of {} was abandoned", self.key))));
        }
    }
}

/// Byte-bounded LRU cache with single-flight loading
pub struct Metacache {
    state: RwLock<CacheState>,
    capacity: AtomicUsize,
    clock: AtomicU64,
    stats: CacheStats,
    inflight: Mutex<HashMap<CacheKey, Arc<Flight>>>,
    global_schemas: DashMap<SchemaId, Arc<SchemaDescriptor>>,
}

impl Metacache {
    /// Create a cache holding at most `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            capacity: AtomicUsize::new(capacity),
            clock: AtomicU64::new(0),
            stats: CacheStats::default(),
            inflight: Mutex::new(HashMap::new()),
            global_schemas: DashMap::new(),
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Byte budget
    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Relaxed)
    }

    /// Bytes currently charged to cached entries
    pub fn memory_usage(&self) -> usize {
        self.state.read().usage
    }

    /// Number of cached entries (global schemas not included)
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Advance the logical clock and return the new value
    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Look up a value without refreshing its recency
    pub fn lookup(&self, key: &CacheKey) -> Option<CacheValue> {
        self.state.read().entries.get(key).map(|e| e.value.clone())
    }

    /// Look up a value and mark it recently used
    fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        let state = self.state.read();
        let entry = state.entries.get(key)?;
        entry.last_access.store(self.tick(), Ordering::Relaxed);
        Some(entry.value.clone())
    }

    /// Insert or replace a value, then evict until usage fits the capacity.
    ///
    /// A value larger than the whole capacity is not retained.
    pub fn insert(&self, key: CacheKey, value: CacheValue) {
        let mut state = self.state.write();
        self.mark_stale(&key);
        self.insert_locked(&mut state, key, value);
    }

    fn insert_locked(&self, state: &mut CacheState, key: CacheKey, value: CacheValue) {
        let charge = key.memory_usage() + value.memory_usage();
        let capacity = self.capacity();
        let clock = self.tick();
        state.remove(&key);
        if charge > capacity {
            debug!("metacache: {} ({} bytes) exceeds capacity {}", key, charge, capacity);
            return;
        }
        state.usage += charge;
        state.entries.insert(
            key,
            CacheEntry {
                value,
                charge,
                last_access: AtomicU64::new(clock),
            },
        );
        self.evict_to(state, capacity);
    }

    /// Remove a value. A load of `key` already in progress will not publish.
    pub fn erase(&self, key: &CacheKey) -> Option<CacheValue> {
        let mut state = self.state.write();
        self.mark_stale(key);
        state.remove(key).map(|e| e.value)
    }

    /// Lock order is `state` then `inflight`.
    fn mark_stale(&self, key: &CacheKey) {
        if let Some(flight) = self.inflight.lock().get(key) {
            flight.stale.store(true, Ordering::Release);
        }
    }

    /// Publish a loaded value unless the key changed while it was loading
    fn publish(&self, key: &CacheKey, value: &CacheValue, flight: &Flight) {
        let mut state = self.state.write();
        if flight.stale.load(Ordering::Acquire) {
            debug!("metacache: dropping stale load of {}", key);
            return;
        }
        self.insert_locked(&mut state, key.clone(), value.clone());
    }

    /// Drop every cached entry. References held by callers stay valid.
    pub fn prune(&self) {
        let mut state = self.state.write();
        let evicted = state.entries.len() as u64;
        state.entries.clear();
        state.usage = 0;
        self.stats.evictions.fetch_add(evicted, Ordering::Relaxed);
        debug!("metacache: pruned {} entries", evicted);
    }

    /// Change the byte budget, evicting as needed
    pub fn set_capacity(&self, capacity: usize) {
        self.capacity.store(capacity, Ordering::Relaxed);
        let mut state = self.state.write();
        self.evict_to(&mut state, capacity);
    }

    fn evict_to(&self, state: &mut CacheState, capacity: usize) {
        while state.usage > capacity {
            let Some(key) = state.lru_key() else {
                break;
            };
            state.remove(&key);
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Return the cached value for `key`, or run `loader` once for every
    /// concurrent caller that misses on it.
    pub fn get_or_load_value(
        &self,
        key: &CacheKey,
        loader: impl FnOnce() -> Result<CacheValue>,
    ) -> Result<CacheValue> {
        if let Some(value) = self.get(key) {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value);
        }
        self.stats.misses.fetch_add(1, Ordering::Relaxed);

        let (flight, leader) = {
            let mut inflight = self.inflight.lock();
            if let Some(flight) = inflight.get(key) {
                (flight.clone(), false)
            } else {
                let flight = Arc::new(Flight::default());
                inflight.insert(key.clone(), flight.clone());
                (flight, true)
            }
        };
        if !leader {
            return flight.wait();
        }

        let guard = FlightGuard {
            cache: self,
            key,
            flight: flight.clone(),
            finished: false,
        };
        // The previous flight may have published between our miss and our
        // registration; don't load twice.
        if let Some(value) = self.get(key) {
            return guard.finish(Ok(value));
        }

        self.stats.loads.fetch_add(1, Ordering::Relaxed);
        let result = loader();
        match &result {
            Ok(value) => self.publish(key, value, &flight),
            Err(e) => {
                self.stats.load_failures.fetch_add(1, Ordering::Relaxed);
                debug!("metacache: load of {} failed: {}", key, e);
            }
        }
        guard.finish(result)
    }

    /// Typed `get_or_load_value`
    pub fn get_or_load<T: CacheItem>(
        &self,
        key: &CacheKey,
        loader: impl FnOnce() -> Result<Arc<T>>,
    ) -> Result<Arc<T>> {
        let value = self.get_or_load_value(key, || loader().map(T::into_value))?;
        T::from_value(value)
            .ok_or_else(|| Error::internal(format!("metacache entry {key} holds another type")))
    }

    /// Typed `insert`
    pub fn insert_item<T: CacheItem>(&self, key: CacheKey, item: Arc<T>) {
        self.insert(key, T::into_value(item));
    }

    /// Typed `lookup`
    pub fn lookup_item<T: CacheItem>(&self, key: &CacheKey) -> Option<Arc<T>> {
        self.lookup(key).and_then(T::from_value)
    }

    pub fn lookup_tablet_metadata(&self, location: &str) -> Option<Arc<TabletMetadata>> {
        self.lookup_item(&CacheKey::Location(location.to_string()))
    }

    pub fn lookup_txn_log(&self, location: &str) -> Option<Arc<TxnLog>> {
        self.lookup_item(&CacheKey::Location(location.to_string()))
    }

    pub fn lookup_schema(&self, schema_id: SchemaId) -> Option<Arc<SchemaDescriptor>> {
        self.lookup_item(&CacheKey::Schema(schema_id))
    }

    pub fn lookup_tablet_schema(&self, tablet_id: TabletId) -> Option<Arc<SchemaDescriptor>> {
        self.lookup_item(&CacheKey::TabletSchema(tablet_id))
    }

    /// Remember a schema resolved through the shard catalog. Never evicted.
    pub fn cache_global_schema(&self, index_id: SchemaId, schema: Arc<SchemaDescriptor>) {
        self.global_schemas.insert(index_id, schema);
    }

    pub fn lookup_global_schema(&self, index_id: SchemaId) -> Option<Arc<SchemaDescriptor>> {
        self.global_schemas.get(&index_id).map(|s| s.value().clone())
    }

    pub fn global_schema_count(&self) -> usize {
        self.global_schemas.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lakeio_common::Column;
    use std::sync::Barrier;
    use std::time::Duration;

    fn schema(id: SchemaId) -> Arc<SchemaDescriptor> {
        Arc::new(SchemaDescriptor::with_columns(
            id,
            vec![Column::new(0, "c0", "INT").key(), Column::new(1, "c1", "VARCHAR(64)")],
        ))
    }

    fn charge(id: SchemaId) -> usize {
        CacheKey::Schema(id).memory_usage() + schema(id).memory_usage()
    }

    #[test]
    fn test_insert_lookup_erase() {
        let cache = Metacache::new(1 << 20);
        cache.insert_item(CacheKey::Schema(10), schema(10));

        assert_eq!(cache.lookup_schema(10).unwrap().id, 10);
        assert!(cache.lookup_schema(11).is_none());
        assert_eq!(cache.memory_usage(), charge(10));

        assert!(cache.erase(&CacheKey::Schema(10)).is_some());
        assert!(cache.lookup_schema(10).is_none());
        assert_eq!(cache.memory_usage(), 0);
    }

    #[test]
    fn test_lookup_wrong_type() {
        let cache = Metacache::new(1 << 20);
        cache.insert_item(CacheKey::Location("lake/meta/x".into()), schema(1));
        assert!(cache.lookup_tablet_metadata("lake/meta/x").is_none());
    }

    #[test]
    fn test_eviction_lru_by_bytes() {
        // Room for exactly two schemas
        let cache = Metacache::new(charge(1) * 2);
        cache.insert_item(CacheKey::Schema(1), schema(1));
        cache.insert_item(CacheKey::Schema(2), schema(2));

        // Touch 1 through a hit so 2 becomes least recently used
        let hit: Arc<SchemaDescriptor> = cache
            .get_or_load(&CacheKey::Schema(1), || panic!("must hit"))
            .unwrap();
        assert_eq!(hit.id, 1);

        cache.insert_item(CacheKey::Schema(3), schema(3));
        assert!(cache.lookup_schema(1).is_some());
        assert!(cache.lookup_schema(2).is_none());
        assert!(cache.lookup_schema(3).is_some());
        assert_eq!(cache.stats().evictions.load(Ordering::Relaxed), 1);
        assert!(cache.memory_usage() <= cache.capacity());
    }

    #[test]
    fn test_oversized_value_not_retained() {
        let cache = Metacache::new(16);
        cache.insert_item(CacheKey::Schema(1), schema(1));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_prune_keeps_outstanding_references() {
        let cache = Metacache::new(1 << 20);
        cache.insert_item(CacheKey::Schema(1), schema(1));
        let held = cache.lookup_schema(1).unwrap();

        cache.prune();
        assert!(cache.is_empty());
        assert_eq!(cache.memory_usage(), 0);
        // The caller's reference is untouched
        assert_eq!(held.num_columns(), 2);
    }

    #[test]
    fn test_set_capacity_evicts() {
        let cache = Metacache::new(1 << 20);
        for id in 0..4 {
            cache.insert_item(CacheKey::Schema(id), schema(id));
        }
        cache.set_capacity(charge(0));
        assert_eq!(cache.len(), 1);
        assert!(cache.lookup_schema(3).is_some(), "most recent entry survives");
    }

    #[test]
    fn test_get_or_load_caches_success() {
        let cache = Metacache::new(1 << 20);
        let key = CacheKey::Schema(7);
        let first: Arc<SchemaDescriptor> = cache.get_or_load(&key, || Ok(schema(7))).unwrap();
        let second: Arc<SchemaDescriptor> =
            cache.get_or_load(&key, || panic!("loaded twice")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.stats().loads.load(Ordering::Relaxed), 1);
        assert_eq!(cache.stats().hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_get_or_load_does_not_cache_failure() {
        let cache = Metacache::new(1 << 20);
        let key = CacheKey::Schema(7);
        let err = cache
            .get_or_load::<SchemaDescriptor>(&key, || Err(Error::store_io("timeout")))
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(cache.lookup(&key).is_none());

        let loaded: Arc<SchemaDescriptor> = cache.get_or_load(&key, || Ok(schema(7))).unwrap();
        assert_eq!(loaded.id, 7);
        assert_eq!(cache.stats().load_failures.load(Ordering::Relaxed), 1);
        assert_eq!(cache.stats().loads.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_single_flight_collapses_concurrent_misses() {
        let cache = Metacache::new(1 << 20);
        let key = CacheKey::Schema(42);
        let calls = AtomicUsize::new(0);
        let barrier = Barrier::new(8);

        let results: Vec<Arc<SchemaDescriptor>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        cache
                            .get_or_load(&key, || {
                                calls.fetch_add(1, Ordering::SeqCst);
                                std::thread::sleep(Duration::from_millis(50));
                                Ok(schema(42))
                            })
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for r in &results {
            assert!(Arc::ptr_eq(r, &results[0]));
        }
    }

    #[test]
    fn test_single_flight_shares_failure() {
        let cache = Metacache::new(1 << 20);
        let key = CacheKey::Schema(5);
        let calls = AtomicUsize::new(0);
        let barrier = Barrier::new(4);

        let errors: Vec<Error> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        cache
                            .get_or_load::<SchemaDescriptor>(&key, || {
                                calls.fetch_add(1, Ordering::SeqCst);
                                std::thread::sleep(Duration::from_millis(50));
                                Err(Error::not_found("SCHEMA_5"))
                            })
                            .unwrap_err()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(errors.iter().all(Error::is_not_found));
    }

    #[test]
    fn test_abandoned_load_releases_waiters() {
        let cache = Metacache::new(1 << 20);
        let key = CacheKey::Schema(9);
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = cache.get_or_load::<SchemaDescriptor>(&key, || panic!("loader blew up"));
        }));
        assert!(outcome.is_err());
        // The key is loadable again afterwards
        let loaded: Arc<SchemaDescriptor> = cache.get_or_load(&key, || Ok(schema(9))).unwrap();
        assert_eq!(loaded.id, 9);
    }

    #[test]
    fn test_erase_during_load_is_not_undone() {
        let cache = Metacache::new(1 << 20);
        let key = CacheKey::Schema(3);
        let loading = Barrier::new(2);
        let erased = Barrier::new(2);

        let loaded: Arc<SchemaDescriptor> = std::thread::scope(|s| {
            let loader = s.spawn(|| {
                cache
                    .get_or_load(&key, || {
                        loading.wait();
                        erased.wait();
                        Ok(schema(3))
                    })
                    .unwrap()
            });
            loading.wait();
            cache.erase(&key);
            erased.wait();
            loader.join().unwrap()
        });

        // The caller that loaded still gets its value, the cache does not keep it
        assert_eq!(loaded.id, 3);
        assert!(cache.lookup_schema(3).is_none());
        let reloaded: Arc<SchemaDescriptor> = cache.get_or_load(&key, || Ok(schema(3))).unwrap();
        assert!(!Arc::ptr_eq(&loaded, &reloaded));
        assert_eq!(cache.stats().loads.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_insert_during_load_wins() {
        let cache = Metacache::new(1 << 20);
        let key = CacheKey::Schema(4);
        let loading = Barrier::new(2);
        let inserted = Barrier::new(2);
        let newer = schema(4);

        std::thread::scope(|s| {
            let loader = s.spawn(|| {
                let _: Arc<SchemaDescriptor> = cache
                    .get_or_load(&key, || {
                        loading.wait();
                        inserted.wait();
                        Ok(schema(4))
                    })
                    .unwrap();
            });
            loading.wait();
            cache.insert_item(key.clone(), newer.clone());
            inserted.wait();
            loader.join().unwrap();
        });

        assert!(Arc::ptr_eq(&cache.lookup_schema(4).unwrap(), &newer));
    }

    #[test]
    fn test_global_schemas_survive_prune() {
        let cache = Metacache::new(1 << 20);
        cache.cache_global_schema(10086, schema(10));
        cache.prune();
        assert_eq!(cache.lookup_global_schema(10086).unwrap().id, 10);
        assert!(cache.lookup_global_schema(1).is_none());
        assert_eq!(cache.global_schema_count(), 1);
    }

    #[test]
    fn test_hit_ratio() {
        let cache = Metacache::new(1 << 20);
        let key = CacheKey::Schema(1);
        let _: Arc<SchemaDescriptor> = cache.get_or_load(&key, || Ok(schema(1))).unwrap();
        let _: Arc<SchemaDescriptor> = cache.get_or_load(&key, || Ok(schema(1))).unwrap();
        assert!((cache.stats().hit_ratio() - 0.5).abs() < 0.01);
    }
}
