//! Core type definitions for lakeio
//!
//! This module defines the tablet metadata data model: schema descriptors,
//! rowset metadata, versioned tablet metadata and transaction logs. All of
//! these are plain values; once a snapshot is published it is never mutated,
//! a new version is produced instead.

use crate::error::{Error, Result};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::mem::size_of;

/// Identifier of a tablet
pub type TabletId = i64;
/// Tablet metadata version, positive and append-only per tablet
pub type Version = i64;
/// Identifier of a schema descriptor (the index id for table-level schemas)
pub type SchemaId = i64;
/// Identifier of a rowset inside a tablet, never reused
pub type RowsetId = u32;
/// Permanent identity of a column
pub type ColumnUid = u32;
/// Identifier of a load transaction
pub type TxnId = i64;

/// Key model of a table
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum KeysType {
    #[default]
    #[display("DUP_KEYS")]
    DupKeys,
    #[display("UNIQUE_KEYS")]
    UniqueKeys,
    #[display("AGG_KEYS")]
    AggKeys,
    #[display("PRIMARY_KEYS")]
    PrimaryKeys,
}

/// Where the primary key index of a tablet is persisted
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum PersistentIndexType {
    #[default]
    #[display("LOCAL")]
    Local,
    #[display("CLOUD_NATIVE")]
    CloudNative,
}

/// Compaction policy recorded for a tablet
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum CompactionStrategy {
    #[default]
    #[display("DEFAULT")]
    Default,
    #[display("REAL_TIME")]
    RealTime,
}

/// A column of a schema
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Permanent identity, independent of name and position
    pub unique_id: ColumnUid,
    pub name: String,
    /// Type name, e.g. `INT`, `BIGINT`, `VARCHAR(64)`
    #[serde(rename = "type")]
    pub column_type: String,
    pub is_key: bool,
    pub is_nullable: bool,
    pub default_value: Option<String>,
}

impl Column {
    /// Create a non-key, non-nullable column
    pub fn new(
        unique_id: ColumnUid,
        name: impl Into<String>,
        column_type: impl Into<String>,
    ) -> Self {
        Self {
            unique_id,
            name: name.into(),
            column_type: column_type.into(),
            is_key: false,
            is_nullable: false,
            default_value: None,
        }
    }

    /// Mark this column as part of the key
    #[must_use]
    pub fn key(mut self) -> Self {
        self.is_key = true;
        self
    }

    /// Allow nulls in this column
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }

    /// Set the default value
    #[must_use]
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    fn memory_usage(&self) -> usize {
        size_of::<Self>()
            + self.name.capacity()
            + self.column_type.capacity()
            + self.default_value.as_ref().map_or(0, String::capacity)
    }
}

/// Versioned schema descriptor
///
/// `unique_id` values are unique within a schema and are never handed out
/// again once retired; `next_column_unique_id` is always above every id the
/// schema lineage has used.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    pub id: SchemaId,
    /// Increases on every structural change
    pub schema_version: i32,
    pub keys_type: KeysType,
    pub num_short_key_columns: u32,
    pub columns: Vec<Column>,
    pub next_column_unique_id: ColumnUid,
}

impl SchemaDescriptor {
    /// Create an empty schema with the given id
    #[must_use]
    pub fn new(id: SchemaId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Build a schema from columns, deriving `next_column_unique_id`.
    /// The counter saturates at the top of the id space.
    #[must_use]
    pub fn with_columns(id: SchemaId, columns: Vec<Column>) -> Self {
        let next_column_unique_id = columns
            .iter()
            .map(|c| c.unique_id.saturating_add(1))
            .max()
            .unwrap_or(0);
        Self {
            id,
            columns,
            next_column_unique_id,
            ..Default::default()
        }
    }

    /// Number of columns
    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Column at a position
    #[must_use]
    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Find a column by name
    #[must_use]
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Find a column by its unique id
    #[must_use]
    pub fn column_by_unique_id(&self, unique_id: ColumnUid) -> Option<&Column> {
        self.columns.iter().find(|c| c.unique_id == unique_id)
    }

    /// Check that column ids and names are unique
    pub fn validate(&self) -> Result<()> {
        validate_columns(self.columns.iter().map(|c| (Some(c.unique_id), c.name.as_str())))?;
        if let Some(max) = self.columns.iter().map(|c| c.unique_id).max()
            && max >= self.next_column_unique_id
        {
            return Err(Error::invalid_argument(format!(
                "schema {}: next_column_unique_id {} is not above column id {max}",
                self.id, self.next_column_unique_id
            )));
        }
        Ok(())
    }

    /// Estimated heap footprint in bytes
    #[must_use]
    pub fn memory_usage(&self) -> usize {
        size_of::<Self>() + self.columns.iter().map(Column::memory_usage).sum::<usize>()
    }
}

/// Reject duplicate column ids or names.
///
/// Columns without an id yet (`None`) only take part in the name check.
pub fn validate_columns<'a>(
    columns: impl IntoIterator<Item = (Option<ColumnUid>, &'a str)>,
) -> Result<()> {
    let mut ids = HashSet::new();
    let mut names = HashSet::new();
    for (unique_id, name) in columns {
        if let Some(id) = unique_id
            && !ids.insert(id)
        {
            return Err(Error::invalid_argument(format!("Duplicate column id {id}")));
        }
        if !names.insert(name) {
            return Err(Error::invalid_argument(format!("Duplicate column name {name}")));
        }
    }
    Ok(())
}

/// Metadata of one rowset. Segment references are opaque here.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowsetMetadata {
    pub id: RowsetId,
    pub overlapped: bool,
    pub data_size: u64,
    pub num_rows: u64,
    pub segments: Vec<String>,
}

impl RowsetMetadata {
    /// Create rowset metadata with the given id and sizes
    #[must_use]
    pub fn new(id: RowsetId, num_rows: u64, data_size: u64) -> Self {
        Self {
            id,
            num_rows,
            data_size,
            ..Default::default()
        }
    }

    fn memory_usage(&self) -> usize {
        size_of::<Self>() + self.segments.iter().map(String::capacity).sum::<usize>()
    }
}

/// Delete vector bookkeeping (version -> delvec file)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelvecMeta {
    pub version_to_file: BTreeMap<Version, String>,
}

/// Immutable snapshot of a tablet at one version
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabletMetadata {
    pub id: TabletId,
    pub version: Version,
    /// Current schema
    pub schema: SchemaDescriptor,
    /// Schemas still referenced by some rowset of this snapshot
    pub historical_schemas: BTreeMap<SchemaId, SchemaDescriptor>,
    /// Rowset -> schema; rowsets without an entry use the current schema
    pub rowset_to_schema: BTreeMap<RowsetId, SchemaId>,
    pub rowsets: Vec<RowsetMetadata>,
    pub next_rowset_id: RowsetId,
    /// Compaction watermark
    pub cumulative_point: u32,
    pub delvec_meta: Option<DelvecMeta>,
    pub enable_persistent_index: bool,
    pub persistent_index_type: PersistentIndexType,
    pub compaction_strategy: CompactionStrategy,
    /// Commit time in seconds since the epoch
    pub commit_time: Option<i64>,
}

impl TabletMetadata {
    /// Create an empty snapshot for a tablet at a version
    #[must_use]
    pub fn new(id: TabletId, version: Version) -> Self {
        Self {
            id,
            version,
            next_rowset_id: 1,
            ..Default::default()
        }
    }

    /// Look up a schema by id in the current schema and historical schemas.
    ///
    /// The current schema wins when both carry the id.
    #[must_use]
    pub fn resolve_schema(&self, schema_id: SchemaId) -> Option<&SchemaDescriptor> {
        if self.schema.id == schema_id {
            Some(&self.schema)
        } else {
            self.historical_schemas.get(&schema_id)
        }
    }

    /// Schema id a rowset was written with
    #[must_use]
    pub fn rowset_schema_id(&self, rowset_id: RowsetId) -> SchemaId {
        self.rowset_to_schema
            .get(&rowset_id)
            .copied()
            .unwrap_or(self.schema.id)
    }

    /// Check that every schema id referenced by a rowset can be resolved
    pub fn validate_schema_refs(&self) -> Result<()> {
        for (rowset_id, schema_id) in &self.rowset_to_schema {
            if self.resolve_schema(*schema_id).is_none() {
                return Err(Error::schema_resolution(
                    *schema_id,
                    format!(
                        "tablet {} version {} rowset {rowset_id} references an unknown schema",
                        self.id, self.version
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Find a rowset by id
    #[must_use]
    pub fn rowset(&self, rowset_id: RowsetId) -> Option<&RowsetMetadata> {
        self.rowsets.iter().find(|r| r.id == rowset_id)
    }

    /// Estimated heap footprint in bytes
    #[must_use]
    pub fn memory_usage(&self) -> usize {
        size_of::<Self>()
            + self.schema.memory_usage()
            + self
                .historical_schemas
                .values()
                .map(|s| size_of::<SchemaId>() + s.memory_usage())
                .sum::<usize>()
            + self.rowset_to_schema.len() * (size_of::<RowsetId>() + size_of::<SchemaId>())
            + self.rowsets.iter().map(RowsetMetadata::memory_usage).sum::<usize>()
            + self.delvec_meta.as_ref().map_or(0, |d| {
                d.version_to_file
                    .values()
                    .map(|f| size_of::<Version>() + f.capacity())
                    .sum()
            })
    }
}

/// A write operation: one new rowset
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpWrite {
    pub rowset: RowsetMetadata,
}

/// A compaction operation: inputs replaced by one output rowset
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpCompaction {
    pub input_rowsets: Vec<RowsetId>,
    pub output_rowset: Option<RowsetMetadata>,
}

/// Transaction log of one tablet for one load transaction
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxnLog {
    pub tablet_id: TabletId,
    pub txn_id: TxnId,
    pub op_write: Option<OpWrite>,
    pub op_compaction: Option<OpCompaction>,
}

impl TxnLog {
    /// Create an empty txn log
    #[must_use]
    pub fn new(tablet_id: TabletId, txn_id: TxnId) -> Self {
        Self {
            tablet_id,
            txn_id,
            ..Default::default()
        }
    }

    /// Estimated heap footprint in bytes
    #[must_use]
    pub fn memory_usage(&self) -> usize {
        size_of::<Self>()
            + self.op_write.as_ref().map_or(0, |w| w.rowset.memory_usage())
            + self.op_compaction.as_ref().map_or(0, |c| {
                c.input_rowsets.len() * size_of::<RowsetId>()
                    + c.output_rowset.as_ref().map_or(0, RowsetMetadata::memory_usage)
            })
    }
}
