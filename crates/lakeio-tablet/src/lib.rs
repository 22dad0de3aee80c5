//! lakeio Tablet - Tablet metadata management
//!
//! This crate provides:
//! - `TabletManager`: creation, persistence, listing, bundle writes,
//!   version-range capture and output-schema selection for tablet metadata
//! - `Metacache`: byte-bounded LRU cache with single-flight loading
//! - Schema evolution for tablets derived from a base tablet
//! - `VersionedTablet`: a read handle bound to one metadata snapshot

pub mod fault;
pub mod in_writing;
pub mod metacache;
pub mod metadata_iter;
pub mod resolver;
pub mod schema_evolution;
mod stored;
pub mod tablet_manager;
pub mod versioned_tablet;

pub use fault::{FaultRegistry, SCHEMA_NOT_FOUND_IN_BUNDLE};
pub use metacache::{CacheItem, CacheKey, CacheStats, CacheValue, Metacache};
pub use metadata_iter::TabletMetadataIter;
pub use resolver::{INDEX_ID_PROPERTY, ShardInfo, ShardResolver};
pub use schema_evolution::{ColumnSpec, SchemaSpec, build_schema, evolve};
pub use tablet_manager::{CreateTabletRequest, TabletAndRowsets, TabletManager};
pub use versioned_tablet::VersionedTablet;
