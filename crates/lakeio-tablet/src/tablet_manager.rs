//! Tablet manager
//!
//! The entry point for everything that reads or writes tablet metadata.
//! Every read consults the metacache before the store, and every load that
//! misses goes through the cache's single-flight path, so concurrent readers
//! of one object cause one store round trip.
//!
//! Writes are last-writer-wins per object key. Nothing here coordinates
//! writers across processes; one writer per (tablet, version) is assumed.

use crate::fault::{FaultRegistry, SCHEMA_NOT_FOUND_IN_BUNDLE};
use crate::in_writing::InWritingSizes;
use crate::metacache::{CacheKey, Metacache};
use crate::metadata_iter::TabletMetadataIter;
use crate::resolver::ShardResolver;
use crate::schema_evolution::{SchemaSpec, build_schema, evolve};
use crate::stored::{StoredTabletMetadata, plan_bundle};
use crate::versioned_tablet::VersionedTablet;
use lakeio_common::config::TabletConfig;
use lakeio_common::{
    CompactionStrategy, Error, LakeConfig, PersistentIndexType, Result, RowsetId, RowsetMetadata,
    SchemaDescriptor, SchemaId, TabletId, TabletMetadata, TxnId, TxnLog, Version,
};
use lakeio_store::{
    Codec, FixedLocationProvider, LocationProvider, MetadataFileName, MetadataStore, join_path,
    tablet_initial_metadata_filename,
};
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Request to create a tablet at version 1
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateTabletRequest {
    pub tablet_id: TabletId,
    /// Derive the schema from this tablet instead of trusting request ids
    pub base_tablet_id: Option<TabletId>,
    pub schema: SchemaSpec,
    pub enable_persistent_index: bool,
    pub persistent_index_type: PersistentIndexType,
    pub compaction_strategy: CompactionStrategy,
    /// Materialize a schema file shared by tablets under the same root
    pub create_schema_file: bool,
    /// Write to the initial-metadata location instead of version 1
    pub enable_tablet_creation_optimization: bool,
}

impl CreateTabletRequest {
    pub fn new(tablet_id: TabletId, schema: SchemaSpec) -> Self {
        let defaults = TabletConfig::default();
        Self {
            tablet_id,
            base_tablet_id: None,
            schema,
            enable_persistent_index: false,
            persistent_index_type: PersistentIndexType::default(),
            compaction_strategy: CompactionStrategy::default(),
            create_schema_file: defaults.create_schema_file,
            enable_tablet_creation_optimization: defaults.enable_creation_optimization,
        }
    }

    /// Apply configured creation defaults
    #[must_use]
    pub const fn with_tablet_config(mut self, config: &TabletConfig) -> Self {
        self.create_schema_file = config.create_schema_file;
        self.enable_tablet_creation_optimization = config.enable_creation_optimization;
        self
    }

    #[must_use]
    pub const fn with_base_tablet(mut self, base_tablet_id: TabletId) -> Self {
        self.base_tablet_id = Some(base_tablet_id);
        self
    }
}

/// Result of `capture_tablet_and_rowsets`
#[derive(Debug)]
pub struct TabletAndRowsets<'a> {
    pub tablet: VersionedTablet<'a>,
    pub rowsets: Vec<RowsetMetadata>,
}

/// Tablet metadata manager
pub struct TabletManager {
    store: Arc<dyn MetadataStore>,
    location_provider: RwLock<Arc<dyn LocationProvider>>,
    metacache: Metacache,
    codec: Codec,
    faults: Arc<FaultRegistry>,
    shard_resolver: Option<Arc<dyn ShardResolver>>,
    in_writing: InWritingSizes,
}

impl TabletManager {
    /// Create a manager over a store and location layout with a metacache
    /// of `cache_capacity` bytes
    pub fn new(
        store: Arc<dyn MetadataStore>,
        location_provider: Arc<dyn LocationProvider>,
        cache_capacity: usize,
    ) -> Self {
        Self {
            store,
            location_provider: RwLock::new(location_provider),
            metacache: Metacache::new(cache_capacity),
            codec: Codec::default(),
            faults: Arc::new(FaultRegistry::new()),
            shard_resolver: None,
            in_writing: InWritingSizes::new(),
        }
    }

    /// Create a manager with all tablets under `config.store.root`
    pub fn from_config(config: &LakeConfig, store: Arc<dyn MetadataStore>) -> Self {
        Self::new(
            store,
            Arc::new(FixedLocationProvider::new(config.store.root.clone())),
            config.metacache.capacity_bytes,
        )
    }

    #[must_use]
    pub const fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    #[must_use]
    pub fn with_fault_registry(mut self, faults: Arc<FaultRegistry>) -> Self {
        self.faults = faults;
        self
    }

    #[must_use]
    pub fn with_shard_resolver(mut self, resolver: Arc<dyn ShardResolver>) -> Self {
        self.shard_resolver = Some(resolver);
        self
    }

    pub const fn metacache(&self) -> &Metacache {
        &self.metacache
    }

    pub fn fault_registry(&self) -> &Arc<FaultRegistry> {
        &self.faults
    }

    pub fn store(&self) -> &Arc<dyn MetadataStore> {
        &self.store
    }

    // ---- Locations ----

    pub fn location_provider(&self) -> Arc<dyn LocationProvider> {
        self.location_provider.read().clone()
    }

    /// Swap the location layout. Cached entries keyed by old locations are
    /// left to age out.
    pub fn set_location_provider(&self, location_provider: Arc<dyn LocationProvider>) {
        *self.location_provider.write() = location_provider;
    }

    pub fn tablet_root_location(&self, tablet_id: TabletId) -> String {
        self.location_provider().root_location(tablet_id)
    }

    pub fn tablet_metadata_location(&self, tablet_id: TabletId, version: Version) -> String {
        self.location_provider()
            .tablet_metadata_location(tablet_id, version)
    }

    pub fn tablet_initial_metadata_location(&self, tablet_id: TabletId) -> String {
        self.location_provider()
            .tablet_initial_metadata_location(tablet_id)
    }

    pub fn txn_log_location(&self, tablet_id: TabletId, txn_id: TxnId) -> String {
        self.location_provider().txn_log_location(tablet_id, txn_id)
    }

    pub fn schema_file_location(&self, tablet_id: TabletId, schema_id: SchemaId) -> String {
        self.location_provider()
            .schema_file_location(tablet_id, schema_id)
    }

    // ---- Creation ----

    /// Create a tablet at version 1.
    ///
    /// Column validation happens before anything is written.
    pub fn create_tablet(&self, request: &CreateTabletRequest) -> Result<Arc<TabletMetadata>> {
        let tablet_id = request.tablet_id;
        let schema = match request.base_tablet_id {
            Some(base_tablet_id) => {
                let base = self.get_tablet(base_tablet_id, None)?;
                evolve(&base.metadata().schema, &request.schema)?
            }
            None => build_schema(&request.schema)?,
        };

        let mut metadata = TabletMetadata::new(tablet_id, 1);
        metadata.schema = schema;
        metadata.enable_persistent_index = request.enable_persistent_index;
        metadata.persistent_index_type = request.persistent_index_type;
        metadata.compaction_strategy = request.compaction_strategy;
        let metadata = Arc::new(metadata);

        if request.create_schema_file {
            self.create_schema_file(tablet_id, &metadata.schema)?;
        }

        let location = if request.enable_tablet_creation_optimization {
            self.tablet_initial_metadata_location(tablet_id)
        } else {
            self.tablet_metadata_location(tablet_id, 1)
        };
        self.put_tablet_metadata_at(metadata.clone(), &location)?;

        self.metacache.insert_item(
            CacheKey::Schema(metadata.schema.id),
            Arc::new(metadata.schema.clone()),
        );
        info!(
            "Created tablet {} (schema {} v{}, {} columns) at {}",
            tablet_id,
            metadata.schema.id,
            metadata.schema.schema_version,
            metadata.schema.num_columns(),
            location
        );
        Ok(metadata)
    }

    /// Write the schema file for `schema` under the tablet's root unless one
    /// is already there
    fn create_schema_file(&self, tablet_id: TabletId, schema: &SchemaDescriptor) -> Result<()> {
        let location = self.schema_file_location(tablet_id, schema.id);
        if self.store.exists(&location)? {
            debug!("Schema file {} already exists", location);
            return Ok(());
        }
        self.store.put(&location, self.codec.encode(schema)?)?;
        debug!("Wrote schema file {}", location);
        Ok(())
    }

    fn read_schema_file(
        &self,
        tablet_id: TabletId,
        schema_id: SchemaId,
    ) -> Result<Arc<SchemaDescriptor>> {
        let location = self.schema_file_location(tablet_id, schema_id);
        let bytes = self.store.get(&location)?;
        debug!("Loaded schema file {}", location);
        Ok(Arc::new(self.codec.decode(&bytes)?))
    }

    // ---- Reads ----

    /// Resolve a tablet at a version, or at its newest known version.
    ///
    /// Without a version the initial-metadata object is tried first, so a
    /// freshly created tablet resolves without a listing.
    pub fn get_tablet(
        &self,
        tablet_id: TabletId,
        version: Option<Version>,
    ) -> Result<VersionedTablet<'_>> {
        let metadata = match version {
            Some(version) => self.get_tablet_metadata(tablet_id, version)?,
            None => match self
                .get_tablet_metadata_by_location(&self.tablet_initial_metadata_location(tablet_id))
            {
                Ok(metadata) => metadata,
                Err(e) if e.is_not_found() => self.get_latest_tablet_metadata(tablet_id)?,
                Err(e) => return Err(e),
            },
        };
        Ok(VersionedTablet::new(self, metadata))
    }

    pub fn get_tablet_metadata(
        &self,
        tablet_id: TabletId,
        version: Version,
    ) -> Result<Arc<TabletMetadata>> {
        self.get_tablet_metadata_by_location(&self.tablet_metadata_location(tablet_id, version))
    }

    /// Load metadata by location.
    ///
    /// A missing version-1 object falls back to the initial-metadata object
    /// in the same directory.
    pub fn get_tablet_metadata_by_location(&self, location: &str) -> Result<Arc<TabletMetadata>> {
        match self.load_tablet_metadata(location) {
            Err(e) if e.is_not_found() => match initial_fallback(location) {
                Some(initial) => self.load_tablet_metadata(&initial),
                None => Err(e),
            },
            result => result,
        }
    }

    fn load_tablet_metadata(&self, location: &str) -> Result<Arc<TabletMetadata>> {
        self.metacache
            .get_or_load(&CacheKey::Location(location.to_string()), || {
                let bytes = self.store.get(location)?;
                debug!("Loaded tablet metadata {} ({} bytes)", location, bytes.len());
                let metadata = self.decode_tablet_metadata(location, &bytes)?;
                metadata.validate_schema_refs()?;
                Ok(Arc::new(metadata))
            })
    }

    fn decode_tablet_metadata(&self, location: &str, bytes: &[u8]) -> Result<TabletMetadata> {
        let stored: StoredTabletMetadata = self.codec.decode(bytes)?;
        if let Some(schema_id) = stored.schema_holders.keys().next()
            && self.faults.enabled(SCHEMA_NOT_FOUND_IN_BUNDLE)
        {
            return Err(Error::schema_resolution(
                *schema_id,
                format!("not found in bundle metadata {location}"),
            ));
        }

        let mut holders: HashMap<String, StoredTabletMetadata> = HashMap::new();
        stored.into_metadata(|schema_id, holder| {
            let held = match holders.entry(holder.to_string()) {
                Entry::Occupied(e) => e.into_mut(),
                Entry::Vacant(e) => {
                    let bytes = self.store.get(holder).map_err(|err| {
                        if err.is_not_found() {
                            Error::schema_resolution(
                                schema_id,
                                format!("bundle metadata {holder} is missing"),
                            )
                        } else {
                            err
                        }
                    })?;
                    e.insert(self.codec.decode(&bytes)?)
                }
            };
            held.inline_schema(schema_id).cloned().ok_or_else(|| {
                Error::schema_resolution(
                    schema_id,
                    format!("not found in bundle metadata {holder}"),
                )
            })
        })
    }

    /// Newest persisted metadata of a tablet, found by listing
    pub fn get_latest_tablet_metadata(&self, tablet_id: TabletId) -> Result<Arc<TabletMetadata>> {
        let locations = self.list_metadata_locations(tablet_id)?;
        let location = locations
            .last()
            .ok_or_else(|| Error::not_found(format!("tablet {tablet_id} has no metadata")))?;
        self.get_tablet_metadata_by_location(location)
    }

    /// Metadata locations of a tablet in version order. The initial object
    /// stands in for version 1 when there is no canonical version 1.
    fn list_metadata_locations(&self, tablet_id: TabletId) -> Result<Vec<String>> {
        let prefix = self.location_provider().tablet_metadata_prefix(tablet_id);
        let mut versions: Vec<(Version, String)> = Vec::new();
        let mut initial = None;
        for key in self.store.list(&prefix)? {
            match MetadataFileName::parse(&key) {
                Some(MetadataFileName::Versioned { tablet_id: id, version }) if id == tablet_id => {
                    versions.push((version, key));
                }
                Some(MetadataFileName::Initial { tablet_id: id }) if id == tablet_id => {
                    initial = Some(key);
                }
                _ => debug!("Skipping unrecognized metadata object {}", key),
            }
        }
        if let Some(initial) = initial
            && !versions.iter().any(|(v, _)| *v == 1)
        {
            versions.push((1, initial));
        }
        versions.sort_by_key(|(v, _)| *v);
        Ok(versions.into_iter().map(|(_, key)| key).collect())
    }

    /// Every persisted version of a tablet, oldest first, loaded lazily
    pub fn list_tablet_metadata(&self, tablet_id: TabletId) -> Result<TabletMetadataIter<'_>> {
        Ok(TabletMetadataIter::new(
            self,
            self.list_metadata_locations(tablet_id)?,
        ))
    }

    // ---- Writes ----

    /// Write metadata at its canonical location
    pub fn put_tablet_metadata(&self, metadata: impl Into<Arc<TabletMetadata>>) -> Result<()> {
        let metadata = metadata.into();
        let location = self.tablet_metadata_location(metadata.id, metadata.version);
        self.put_tablet_metadata_at(metadata, &location)
    }

    /// Write metadata at an explicit location
    pub fn put_tablet_metadata_at(
        &self,
        metadata: impl Into<Arc<TabletMetadata>>,
        location: &str,
    ) -> Result<()> {
        let metadata = metadata.into();
        if metadata.version < 1 {
            return Err(Error::invalid_argument(format!(
                "tablet {}: invalid version {}",
                metadata.id, metadata.version
            )));
        }
        let bytes = self.codec.encode(&StoredTabletMetadata::inline(&metadata))?;
        self.store.put(location, bytes)?;
        debug!("Wrote tablet metadata {}", location);
        self.metacache
            .insert_item(CacheKey::Location(location.to_string()), metadata);
        Ok(())
    }

    /// Write several tablets' metadata, storing each shared schema once.
    ///
    /// Each member is its own object write. On failure the members written
    /// before the failing one stay visible.
    pub fn put_bundle_tablet_metadata(
        &self,
        metadatas: &BTreeMap<TabletId, TabletMetadata>,
    ) -> Result<()> {
        let planned = plan_bundle(metadatas, |id, version| {
            self.tablet_metadata_location(id, version)
        })?;
        let total = planned.len();
        for (written, (location, stored)) in planned.into_iter().enumerate() {
            let result = self
                .codec
                .encode(&stored)
                .and_then(|bytes| self.store.put(&location, bytes));
            // The cached value of a location may predate this write
            self.metacache.erase(&CacheKey::Location(location.clone()));
            if let Err(e) = result {
                warn!(
                    "Bundle write failed at {} after {}/{} members: {}",
                    location, written, total, e
                );
                return Err(e);
            }
        }
        info!("Wrote bundle metadata for {} tablets", total);
        Ok(())
    }

    /// Insert metadata into the cache under its canonical location without
    /// writing the store
    pub fn cache_tablet_metadata(&self, metadata: impl Into<Arc<TabletMetadata>>) {
        let metadata = metadata.into();
        let location = self.tablet_metadata_location(metadata.id, metadata.version);
        self.metacache
            .insert_item(CacheKey::Location(location), metadata);
    }

    /// Remove one version. Removing an absent version is not an error.
    pub fn delete_tablet_metadata(&self, tablet_id: TabletId, version: Version) -> Result<()> {
        let location = self.tablet_metadata_location(tablet_id, version);
        self.store.delete(&location)?;
        self.metacache.erase(&CacheKey::Location(location));
        Ok(())
    }

    // ---- Txn logs ----

    pub fn put_txn_log(&self, log: impl Into<Arc<TxnLog>>) -> Result<()> {
        let log = log.into();
        let location = self.txn_log_location(log.tablet_id, log.txn_id);
        self.store.put(&location, self.codec.encode(log.as_ref())?)?;
        self.metacache.insert_item(CacheKey::Location(location), log);
        Ok(())
    }

    pub fn get_txn_log(&self, tablet_id: TabletId, txn_id: TxnId) -> Result<Arc<TxnLog>> {
        let location = self.txn_log_location(tablet_id, txn_id);
        self.metacache
            .get_or_load(&CacheKey::Location(location.clone()), || {
                let bytes = self.store.get(&location)?;
                Ok(Arc::new(self.codec.decode(&bytes)?))
            })
    }

    pub fn delete_txn_log(&self, tablet_id: TabletId, txn_id: TxnId) -> Result<()> {
        let location = self.txn_log_location(tablet_id, txn_id);
        self.store.delete(&location)?;
        self.metacache.erase(&CacheKey::Location(location));
        Ok(())
    }

    // ---- Version ranges and schemas ----

    /// The tablet at `to_version` and the rowsets it gained in the inclusive
    /// window `[from_version, to_version]`.
    ///
    /// A rowset is new in the window when it is absent at `from_version - 1`;
    /// `from_version` 0 or 1 therefore captures every rowset at `to_version`.
    /// Both ends of the window must exist (`from_version` 0 excepted).
    pub fn capture_tablet_and_rowsets(
        &self,
        tablet_id: TabletId,
        from_version: Version,
        to_version: Version,
    ) -> Result<TabletAndRowsets<'_>> {
        if from_version > to_version {
            return Err(Error::invalid_argument(format!(
                "tablet {tablet_id}: from version {from_version} is above to version {to_version}"
            )));
        }
        let tablet = self.get_tablet(tablet_id, Some(to_version))?;
        if from_version >= 1 && from_version < to_version {
            self.get_tablet_metadata(tablet_id, from_version)?;
        }
        let baseline: HashSet<RowsetId> = if from_version <= 1 {
            HashSet::new()
        } else {
            self.get_tablet_metadata(tablet_id, from_version - 1)?
                .rowsets
                .iter()
                .map(|r| r.id)
                .collect()
        };
        let rowsets = tablet
            .get_rowsets()
            .iter()
            .filter(|r| !baseline.contains(&r.id))
            .cloned()
            .collect();
        Ok(TabletAndRowsets { tablet, rowsets })
    }

    /// Schema a compaction of `input_rowsets` must write with: the newest
    /// (by `schema_version`) schema among the inputs. Inputs without a
    /// mapping entry count as the current schema.
    pub fn get_output_rowset_schema(
        &self,
        input_rowsets: &[RowsetId],
        metadata: &TabletMetadata,
    ) -> Result<Arc<SchemaDescriptor>> {
        if metadata.rowset_to_schema.is_empty() {
            return self.shared_schema(&metadata.schema);
        }
        let mut output: Option<&SchemaDescriptor> = None;
        for rowset_id in input_rowsets {
            let schema_id = metadata.rowset_schema_id(*rowset_id);
            let schema = metadata
                .historical_schemas
                .get(&schema_id)
                .or_else(|| (metadata.schema.id == schema_id).then_some(&metadata.schema))
                .ok_or_else(|| {
                    Error::schema_resolution(
                        schema_id,
                        format!("rowset {rowset_id} of tablet {}", metadata.id),
                    )
                })?;
            if output.is_none_or(|o| schema.schema_version > o.schema_version) {
                output = Some(schema);
            }
        }
        self.shared_schema(output.unwrap_or(&metadata.schema))
    }

    /// One shared `Arc` per schema id
    fn shared_schema(&self, schema: &SchemaDescriptor) -> Result<Arc<SchemaDescriptor>> {
        self.metacache
            .get_or_load(&CacheKey::Schema(schema.id), || Ok(Arc::new(schema.clone())))
    }

    /// Schema `schema_id` as seen from a snapshot: the snapshot's own copy,
    /// or the schema file under the tablet's root
    pub(crate) fn snapshot_schema(
        &self,
        metadata: &TabletMetadata,
        schema_id: SchemaId,
    ) -> Result<Arc<SchemaDescriptor>> {
        self.metacache
            .get_or_load(&CacheKey::Schema(schema_id), || {
                if let Some(schema) = metadata.resolve_schema(schema_id) {
                    return Ok(Arc::new(schema.clone()));
                }
                self.read_schema_file(metadata.id, schema_id)
                    .map_err(|e| {
                        if e.is_not_found() {
                            Error::schema_resolution(
                                schema_id,
                                format!(
                                    "not in tablet {} version {} and no schema file",
                                    metadata.id, metadata.version
                                ),
                            )
                        } else {
                            e
                        }
                    })
            })
    }

    /// Current schema of a tablet without a version at hand.
    ///
    /// Tries the initial metadata, then the shard catalog's index id (global
    /// schema, then schema file), then the newest listed metadata.
    pub fn get_tablet_schema(&self, tablet_id: TabletId) -> Result<Arc<SchemaDescriptor>> {
        self.metacache
            .get_or_load(&CacheKey::TabletSchema(tablet_id), || {
                self.load_tablet_schema(tablet_id)
            })
    }

    fn load_tablet_schema(&self, tablet_id: TabletId) -> Result<Arc<SchemaDescriptor>> {
        let initial = self.tablet_initial_metadata_location(tablet_id);
        match self.get_tablet_metadata_by_location(&initial) {
            Ok(metadata) => return self.shared_schema(&metadata.schema),
            Err(e) if !e.is_not_found() => return Err(e),
            Err(_) => {}
        }

        if let Some(resolver) = &self.shard_resolver {
            match resolver.fetch_shard_info(tablet_id) {
                Ok(info) => {
                    if let Some(index_id) = info.index_id() {
                        if let Some(schema) = self.metacache.lookup_global_schema(index_id) {
                            return Ok(schema);
                        }
                        match self.read_schema_file(tablet_id, index_id) {
                            Ok(schema) => {
                                self.metacache.cache_global_schema(index_id, schema.clone());
                                return Ok(schema);
                            }
                            Err(e) if !e.is_not_found() => return Err(e),
                            Err(_) => debug!("No schema file for index {}", index_id),
                        }
                    }
                }
                Err(e) => warn!("Failed to fetch shard info of tablet {}: {}", tablet_id, e),
            }
        }

        let metadata = self.get_latest_tablet_metadata(tablet_id)?;
        self.shared_schema(&metadata.schema)
    }

    // ---- In-writing data size ----

    pub fn add_in_writing_data_size(&self, tablet_id: TabletId, size: i64) {
        self.in_writing.add(tablet_id, size);
    }

    pub fn in_writing_data_size(&self, tablet_id: TabletId) -> i64 {
        self.in_writing.get(tablet_id)
    }

    /// Drop counters of tablets this node no longer serves. Without a shard
    /// resolver there is nothing to check against and nothing is dropped.
    pub fn clean_in_writing_data_size(&self) {
        let Some(resolver) = &self.shard_resolver else {
            return;
        };
        let removed = self.in_writing.retain(|tablet_id| resolver.is_local_shard(tablet_id));
        debug!("Cleaned in-writing data size of {} tablets", removed);
    }
}

/// Location of the initial-metadata object to try when a version-1 object
/// is missing
fn initial_fallback(location: &str) -> Option<String> {
    match MetadataFileName::parse(location)? {
        MetadataFileName::Versioned {
            tablet_id,
            version: 1,
        } => {
            let dir = location.rsplit_once('/').map_or("", |(dir, _)| dir);
            Some(join_path(dir, &tablet_initial_metadata_filename(tablet_id)))
        }
        _ => None,
    }
}
