//! Metadata store abstraction
//!
//! A durable key-value object store with last-writer-wins semantics per key.
//! Keys are opaque strings produced by a `LocationProvider`; values are whole
//! encoded objects. A single `put` is atomic at the store level, nothing
//! spans more than one key.

use bytes::Bytes;
use lakeio_common::Result;

/// Durable object store holding tablet metadata, schema files and txn logs
pub trait MetadataStore: Send + Sync {
    /// Write an object, replacing any previous value under the key
    fn put(&self, key: &str, value: Bytes) -> Result<()>;

    /// Read an object. Returns `Error::NotFound` if the key is absent.
    fn get(&self, key: &str) -> Result<Bytes>;

    /// Remove an object. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> Result<()>;

    /// List the keys starting with `prefix`, in ascending key order
    fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Check whether an object exists
    fn exists(&self, key: &str) -> Result<bool> {
        match self.get(key) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
