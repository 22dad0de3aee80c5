//! In-memory metadata store
//!
//! Backs tests and single-process tools. Keeps per-operation counters so
//! callers can assert how many round trips reached the store.

use crate::store::MetadataStore;
use bytes::Bytes;
use lakeio_common::{Error, Result};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Store operation counters
#[derive(Debug, Default)]
pub struct StoreStats {
    pub puts: AtomicU64,
    pub gets: AtomicU64,
    pub deletes: AtomicU64,
    pub lists: AtomicU64,
}

impl StoreStats {
    /// Reset all counters
    pub fn reset(&self) {
        self.puts.store(0, Ordering::Relaxed);
        self.gets.store(0, Ordering::Relaxed);
        self.deletes.store(0, Ordering::Relaxed);
        self.lists.store(0, Ordering::Relaxed);
    }
}

/// Ordered in-memory object store
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, Bytes>>,
    stats: StoreStats,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get operation counters
    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    /// Number of stored objects
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Check if the store holds no objects
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

impl MetadataStore for MemoryStore {
    fn put(&self, key: &str, value: Bytes) -> Result<()> {
        self.stats.puts.fetch_add(1, Ordering::Relaxed);
        self.objects.write().insert(key.to_string(), value);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Bytes> {
        self.stats.gets.fetch_add(1, Ordering::Relaxed);
        self.objects
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::not_found(key))
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.stats.deletes.fetch_add(1, Ordering::Relaxed);
        self.objects.write().remove(key);
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        self.stats.lists.fetch_add(1, Ordering::Relaxed);
        let objects = self.objects.read();
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.objects.read().contains_key(key))
    }
}
