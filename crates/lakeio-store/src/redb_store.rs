//! Persistent metadata store backed by redb.
//!
//! Every object lives in one table keyed by its location string, so a
//! prefix listing is an ordered range scan. Each `put` and `delete` is its
//! own write transaction; there is no multi-key atomicity.

use crate::store::MetadataStore;
use crate::tables;
use bytes::Bytes;
use lakeio_common::{Error, Result};
use redb::{Database, ReadableTable};
use std::path::Path;
use tracing::{debug, info};

/// Error type for redb operations, folded into `Error::StoreIo` at the trait boundary
#[derive(Debug, thiserror::Error)]
enum RedbError {
    #[error("redb error: {0}")]
    Database(#[from] redb::DatabaseError),
    #[error("redb storage error: {0}")]
    Storage(#[from] redb::StorageError),
    #[error("redb table error: {0}")]
    Table(#[from] redb::TableError),
    #[error("redb transaction error: {0}")]
    Transaction(Box<redb::TransactionError>),
    #[error("redb commit error: {0}")]
    Commit(#[from] redb::CommitError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<redb::TransactionError> for RedbError {
    fn from(e: redb::TransactionError) -> Self {
        Self::Transaction(Box::new(e))
    }
}

impl From<RedbError> for Error {
    fn from(e: RedbError) -> Self {
        Self::StoreIo(e.to_string())
    }
}

/// Metadata store persisted in a local redb database.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open (or create) the redb database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::open_inner(path.as_ref())?)
    }

    fn open_inner(path: &Path) -> std::result::Result<Self, RedbError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Create the table eagerly so later read txns don't fail
        let write_txn = db.begin_write()?;
        {
            let _t = write_txn.open_table(tables::OBJECTS)?;
        }
        write_txn.commit()?;

        info!("Opened redb metadata store at {:?}", path);
        Ok(Self { db })
    }

    fn put_bytes(&self, key: &str, value: &[u8]) -> std::result::Result<(), RedbError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(tables::OBJECTS)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_bytes(&self, key: &str) -> std::result::Result<Option<Vec<u8>>, RedbError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(tables::OBJECTS)?;
        Ok(table.get(key)?.map(|v| v.value().to_vec()))
    }

    fn delete_key(&self, key: &str) -> std::result::Result<(), RedbError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(tables::OBJECTS)?;
            table.remove(key)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn list_keys(&self, prefix: &str) -> std::result::Result<Vec<String>, RedbError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(tables::OBJECTS)?;
        let mut keys = Vec::new();
        for entry in table.range(prefix..)? {
            let entry = entry?;
            let k = entry.0.value();
            if !k.starts_with(prefix) {
                break;
            }
            keys.push(k.to_string());
        }
        Ok(keys)
    }
}

impl MetadataStore for RedbStore {
    fn put(&self, key: &str, value: Bytes) -> Result<()> {
        debug!("redb put {} ({} bytes)", key, value.len());
        Ok(self.put_bytes(key, &value)?)
    }

    fn get(&self, key: &str) -> Result<Bytes> {
        self.get_bytes(key)?
            .map(Bytes::from)
            .ok_or_else(|| Error::not_found(key))
    }

    fn delete(&self, key: &str) -> Result<()> {
        debug!("redb delete {}", key);
        Ok(self.delete_key(key)?)
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self.list_keys(prefix)?)
    }
}
