//! Read handle bound to one tablet metadata snapshot

use crate::tablet_manager::TabletManager;
use lakeio_common::{
    Result, RowsetMetadata, SchemaDescriptor, SchemaId, TabletId, TabletMetadata, Version,
};
use std::sync::Arc;

/// A tablet at one version.
///
/// Holds a strong reference to its snapshot, so the snapshot stays readable
/// even if the metacache evicts it. Anything not in the snapshot is loaded
/// through the owning manager.
#[derive(Clone)]
pub struct VersionedTablet<'a> {
    manager: &'a TabletManager,
    metadata: Arc<TabletMetadata>,
}

impl<'a> VersionedTablet<'a> {
    pub const fn new(manager: &'a TabletManager, metadata: Arc<TabletMetadata>) -> Self {
        Self { manager, metadata }
    }

    pub fn id(&self) -> TabletId {
        self.metadata.id
    }

    pub fn version(&self) -> Version {
        self.metadata.version
    }

    pub const fn metadata(&self) -> &Arc<TabletMetadata> {
        &self.metadata
    }

    pub const fn tablet_manager(&self) -> &'a TabletManager {
        self.manager
    }

    /// Current schema of the snapshot, shared through the metacache
    pub fn get_schema(&self) -> Result<Arc<SchemaDescriptor>> {
        self.get_schema_by_id(self.metadata.schema.id)
    }

    /// Resolve a schema id against the snapshot, then the schema file
    pub fn get_schema_by_id(&self, schema_id: SchemaId) -> Result<Arc<SchemaDescriptor>> {
        self.manager.snapshot_schema(&self.metadata, schema_id)
    }

    pub fn get_rowsets(&self) -> &[RowsetMetadata] {
        &self.metadata.rowsets
    }

    /// Metadata of the same tablet at another version
    pub fn get_metadata(&self, version: Version) -> Result<Arc<TabletMetadata>> {
        self.manager.get_tablet_metadata(self.id(), version)
    }
}

impl std::fmt::Debug for VersionedTablet<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionedTablet")
            .field("id", &self.metadata.id)
            .field("version", &self.metadata.version)
            .finish_non_exhaustive()
    }
}
