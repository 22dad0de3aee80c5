//! Persisted form of tablet metadata
//!
//! A single `put` stores every schema inline, so reading it back yields the
//! exact value that was written. A bundle write stores each shared schema
//! in full only once, in the member with the lowest tablet id that uses it;
//! the other members keep the location of that holder object instead.

use lakeio_common::{
    CompactionStrategy, DelvecMeta, Error, PersistentIndexType, Result, RowsetId,
    RowsetMetadata, SchemaDescriptor, SchemaId, TabletId, TabletMetadata, Version,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct StoredTabletMetadata {
    pub id: TabletId,
    pub version: Version,
    pub schema_id: SchemaId,
    /// `None` when the current schema is held by a sibling object
    pub schema: Option<SchemaDescriptor>,
    pub historical_schemas: BTreeMap<SchemaId, SchemaDescriptor>,
    /// Schema id -> location of the object holding it inline
    pub schema_holders: BTreeMap<SchemaId, String>,
    /// Written as part of a bundle
    pub bundled: bool,
    pub rowset_to_schema: BTreeMap<RowsetId, SchemaId>,
    pub rowsets: Vec<RowsetMetadata>,
    pub next_rowset_id: RowsetId,
    pub cumulative_point: u32,
    pub delvec_meta: Option<DelvecMeta>,
    pub enable_persistent_index: bool,
    pub persistent_index_type: PersistentIndexType,
    pub compaction_strategy: CompactionStrategy,
    pub commit_time: Option<i64>,
}

impl StoredTabletMetadata {
    /// Self-contained form of one snapshot
    pub fn inline(metadata: &TabletMetadata) -> Self {
        Self::with_schemas(
            metadata,
            Some(metadata.schema.clone()),
            metadata.historical_schemas.clone(),
            BTreeMap::new(),
            false,
        )
    }

    fn with_schemas(
        metadata: &TabletMetadata,
        schema: Option<SchemaDescriptor>,
        historical_schemas: BTreeMap<SchemaId, SchemaDescriptor>,
        schema_holders: BTreeMap<SchemaId, String>,
        bundled: bool,
    ) -> Self {
        Self {
            id: metadata.id,
            version: metadata.version,
            schema_id: metadata.schema.id,
            schema,
            historical_schemas,
            schema_holders,
            bundled,
            rowset_to_schema: metadata.rowset_to_schema.clone(),
            rowsets: metadata.rowsets.clone(),
            next_rowset_id: metadata.next_rowset_id,
            cumulative_point: metadata.cumulative_point,
            delvec_meta: metadata.delvec_meta.clone(),
            enable_persistent_index: metadata.enable_persistent_index,
            persistent_index_type: metadata.persistent_index_type,
            compaction_strategy: metadata.compaction_strategy,
            commit_time: metadata.commit_time,
        }
    }

    /// A schema this object holds in full
    pub fn inline_schema(&self, schema_id: SchemaId) -> Option<&SchemaDescriptor> {
        match &self.schema {
            Some(schema) if schema.id == schema_id => Some(schema),
            _ => self.historical_schemas.get(&schema_id),
        }
    }

    /// Rebuild the in-memory snapshot. `resolve` fetches each schema held by
    /// a sibling, given its id and the holder location.
    pub fn into_metadata(
        self,
        mut resolve: impl FnMut(SchemaId, &str) -> Result<SchemaDescriptor>,
    ) -> Result<TabletMetadata> {
        let mut historical_schemas = self.historical_schemas;
        for (schema_id, holder) in &self.schema_holders {
            historical_schemas.insert(*schema_id, resolve(*schema_id, holder)?);
        }
        let schema = match self.schema {
            Some(schema) => schema,
            None => historical_schemas.get(&self.schema_id).cloned().ok_or_else(|| {
                Error::schema_resolution(
                    self.schema_id,
                    format!("current schema of tablet {} version {}", self.id, self.version),
                )
            })?,
        };
        if self.bundled {
            // Bundle readers see every schema the member references
            historical_schemas.insert(schema.id, schema.clone());
        }

        Ok(TabletMetadata {
            id: self.id,
            version: self.version,
            schema,
            historical_schemas,
            rowset_to_schema: self.rowset_to_schema,
            rowsets: self.rowsets,
            next_rowset_id: self.next_rowset_id,
            cumulative_point: self.cumulative_point,
            delvec_meta: self.delvec_meta,
            enable_persistent_index: self.enable_persistent_index,
            persistent_index_type: self.persistent_index_type,
            compaction_strategy: self.compaction_strategy,
            commit_time: self.commit_time,
        })
    }
}

/// Lay out a bundle write: one stored object per member, each shared schema
/// held inline by exactly one member.
///
/// Validates every member before anything is written.
pub(crate) fn plan_bundle(
    members: &BTreeMap<TabletId, TabletMetadata>,
    location: impl Fn(TabletId, Version) -> String,
) -> Result<Vec<(String, StoredTabletMetadata)>> {
    for (tablet_id, metadata) in members {
        if *tablet_id != metadata.id {
            return Err(Error::invalid_argument(format!(
                "bundle entry {tablet_id} carries metadata of tablet {}",
                metadata.id
            )));
        }
        if metadata.version < 1 {
            return Err(Error::invalid_argument(format!(
                "tablet {tablet_id}: invalid version {}",
                metadata.version
            )));
        }
        metadata.validate_schema_refs()?;
    }

    // BTreeMap iteration is by tablet id, so the first member to claim a
    // schema is the lowest one referencing it
    let mut holders: BTreeMap<SchemaId, (TabletId, String)> = BTreeMap::new();
    for metadata in members.values() {
        for schema_id in referenced_schemas(metadata) {
            holders
                .entry(schema_id)
                .or_insert_with(|| (metadata.id, location(metadata.id, metadata.version)));
        }
    }

    let mut planned = Vec::with_capacity(members.len());
    for metadata in members.values() {
        let mut schema = None;
        let mut historical = BTreeMap::new();
        let mut schema_holders = BTreeMap::new();
        for schema_id in referenced_schemas(metadata) {
            let Some((holder_id, holder_location)) = holders.get(&schema_id) else {
                continue;
            };
            if *holder_id != metadata.id {
                schema_holders.insert(schema_id, holder_location.clone());
            } else if schema_id == metadata.schema.id {
                schema = Some(metadata.schema.clone());
            } else if let Some(s) = metadata.historical_schemas.get(&schema_id) {
                historical.insert(schema_id, s.clone());
            }
        }
        planned.push((
            location(metadata.id, metadata.version),
            StoredTabletMetadata::with_schemas(metadata, schema, historical, schema_holders, true),
        ));
    }
    Ok(planned)
}

/// Current schema id plus every historical schema id
fn referenced_schemas(metadata: &TabletMetadata) -> BTreeSet<SchemaId> {
    std::iter::once(metadata.schema.id)
        .chain(metadata.historical_schemas.keys().copied())
        .collect()
}
