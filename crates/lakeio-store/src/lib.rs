//! lakeio Store - Metadata object storage
//!
//! This crate provides the pieces the tablet layer consumes but does not own:
//! - the `MetadataStore` trait (put/get/delete/list by prefix, last writer wins)
//!   with an in-memory and a redb-backed implementation
//! - the `LocationProvider` trait mapping tablet ids and versions to object keys
//! - the `Codec` turning metadata values into bytes and back

pub mod codec;
pub mod location;
pub mod memory;
pub mod redb_store;
pub mod store;
mod tables;

// Re-exports
pub use codec::Codec;
pub use location::{
    FixedLocationProvider, LocationProvider, MetadataFileName, join_path, schema_filename,
    tablet_initial_metadata_filename, tablet_metadata_filename, txn_log_filename,
};
pub use memory::{MemoryStore, StoreStats};
pub use redb_store::RedbStore;
pub use store::MetadataStore;
