//! Shared fixture for tablet manager tests

#![allow(dead_code)]

use bytes::Bytes;
use lakeio_common::{
    Column, Error, Result, RowsetMetadata, SchemaDescriptor, TabletId, TabletMetadata, Version,
};
use lakeio_store::{FixedLocationProvider, LocationProvider, MemoryStore, MetadataStore, join_path};
use lakeio_tablet::{ColumnSpec, CreateTabletRequest, SchemaSpec, TabletManager};
use parking_lot::Mutex;
use rand::Rng;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Barrier};

pub const ROOT: &str = "test_lake";

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub manager: TabletManager,
    next_id: AtomicI64,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_capacity(16 * 1024 * 1024)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let store = Arc::new(MemoryStore::new());
        let manager = TabletManager::new(
            store.clone(),
            Arc::new(FixedLocationProvider::new(ROOT)),
            capacity,
        );
        Self::from_parts(store, manager)
    }

    pub fn from_parts(store: Arc<MemoryStore>, manager: TabletManager) -> Self {
        // Random base so ids from different tests never line up by accident
        let base = rand::thread_rng().gen_range(1_000..1_000_000);
        Self {
            store,
            manager,
            next_id: AtomicI64::new(base),
        }
    }

    pub fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// Two INT columns: c0 (key, id 0) and c1 (id 1)
pub fn two_column_spec(schema_id: i64) -> SchemaSpec {
    SchemaSpec::new(
        schema_id,
        vec![
            ColumnSpec::new("c0", "INT").with_unique_id(0).key(),
            ColumnSpec::new("c1", "INT").with_unique_id(1),
        ],
    )
}

pub fn create_request(tablet_id: TabletId, schema_id: i64) -> CreateTabletRequest {
    CreateTabletRequest::new(tablet_id, two_column_spec(schema_id))
}

pub fn schema(id: i64, columns: &[&str]) -> SchemaDescriptor {
    SchemaDescriptor::with_columns(
        id,
        columns
            .iter()
            .zip(0..)
            .map(|(name, uid)| Column::new(uid, *name, "INT"))
            .collect(),
    )
}

/// Metadata with `num_rowsets` rowsets, ids 1..=num_rowsets
pub fn metadata_with_rowsets(
    tablet_id: TabletId,
    version: Version,
    num_rowsets: u32,
) -> TabletMetadata {
    let mut metadata = TabletMetadata::new(tablet_id, version);
    metadata.schema = schema(1, &["c0", "c1"]);
    for id in 1..=num_rowsets {
        metadata.rowsets.push(RowsetMetadata::new(id, 10, 1024));
    }
    metadata.next_rowset_id = num_rowsets + 1;
    metadata
}

/// Spreads tablets over `partitions` roots by tablet id
pub struct PartitionedLocationProvider {
    root: String,
    partitions: i64,
}

impl PartitionedLocationProvider {
    pub fn new(root: impl Into<String>, partitions: i64) -> Self {
        Self {
            root: root.into(),
            partitions,
        }
    }
}

impl LocationProvider for PartitionedLocationProvider {
    fn root_location(&self, tablet_id: TabletId) -> String {
        join_path(&self.root, &(tablet_id % self.partitions).to_string())
    }
}

/// Rendezvous for one paused `get`: `read` is reached once the bytes have
/// been read, the call returns after `release`.
#[derive(Clone)]
pub struct GetGate {
    key: String,
    pub read: Arc<Barrier>,
    pub release: Arc<Barrier>,
}

/// A `MemoryStore` with injectable I/O failures and a pausable `get`
#[derive(Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    failing_keys: Mutex<Vec<String>>,
    puts_before_failure: Mutex<Option<usize>>,
    gate: Mutex<Option<GetGate>>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    /// Every operation on `key` fails with `StoreIo` until `heal`
    pub fn fail_key(&self, key: impl Into<String>) {
        self.failing_keys.lock().push(key.into());
    }

    /// Let `n` more puts through, then fail every put until `heal`
    pub fn fail_puts_after(&self, n: usize) {
        *self.puts_before_failure.lock() = Some(n);
    }

    pub fn heal(&self) {
        self.failing_keys.lock().clear();
        *self.puts_before_failure.lock() = None;
    }

    /// Pause the next `get` of `key` after it has read the object
    pub fn pause_get(&self, key: impl Into<String>) -> GetGate {
        let gate = GetGate {
            key: key.into(),
            read: Arc::new(Barrier::new(2)),
            release: Arc::new(Barrier::new(2)),
        };
        *self.gate.lock() = Some(gate.clone());
        gate
    }

    fn check(&self, key: &str) -> Result<()> {
        if self.failing_keys.lock().iter().any(|k| k == key) {
            return Err(Error::store_io(format!("injected failure on {key}")));
        }
        Ok(())
    }
}

impl MetadataStore for FaultyStore {
    fn put(&self, key: &str, value: Bytes) -> Result<()> {
        self.check(key)?;
        {
            let mut budget = self.puts_before_failure.lock();
            match budget.as_mut() {
                Some(0) => {
                    return Err(Error::store_io(format!("injected put failure on {key}")));
                }
                Some(n) => *n -= 1,
                None => {}
            }
        }
        self.inner.put(key, value)
    }

    fn get(&self, key: &str) -> Result<Bytes> {
        self.check(key)?;
        let bytes = self.inner.get(key);
        let gate = {
            let mut gate = self.gate.lock();
            if gate.as_ref().is_some_and(|g| g.key == key) {
                gate.take()
            } else {
                None
            }
        };
        if let Some(gate) = gate {
            gate.read.wait();
            gate.release.wait();
        }
        bytes
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.check(key)?;
        self.inner.delete(key)
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        self.inner.list(prefix)
    }
}

/// A manager over a `FaultyStore` rooted at `ROOT`
pub fn faulty_manager(store: &Arc<FaultyStore>) -> TabletManager {
    TabletManager::new(
        store.clone(),
        Arc::new(FixedLocationProvider::new(ROOT)),
        16 * 1024 * 1024,
    )
}
