//! Object location layout
//!
//! Maps (tablet id, version, object kind) to store keys. Versioned metadata
//! file names use fixed-width upper-case hex for both the tablet id and the
//! version, so a lexicographic prefix listing is also ordered by version:
//!
//! ```text
//! {root}/meta/{tablet_id:016X}_{version:016X}.meta   versioned tablet metadata
//! {root}/meta/{tablet_id:016X}_initial.meta          initial tablet metadata
//! {root}/log/{tablet_id:016X}_{txn_id:016X}.log      transaction log
//! {root}/SCHEMA_{schema_id:016X}                     shared schema file
//! {root}/data/                                       segment files
//! ```

use lakeio_common::{SchemaId, TabletId, TxnId, Version};

pub const METADATA_DIRECTORY_NAME: &str = "meta";
pub const TXN_LOG_DIRECTORY_NAME: &str = "log";
pub const SEGMENT_DIRECTORY_NAME: &str = "data";

const METADATA_SUFFIX: &str = ".meta";
const INITIAL_METADATA_SUFFIX: &str = "_initial.meta";

/// Join two path components with exactly one `/` between them
#[must_use]
pub fn join_path(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        return child.to_string();
    }
    format!("{}/{}", parent.trim_end_matches('/'), child.trim_start_matches('/'))
}

/// File name of a versioned tablet metadata object
#[must_use]
pub fn tablet_metadata_filename(tablet_id: TabletId, version: Version) -> String {
    format!("{tablet_id:016X}_{version:016X}{METADATA_SUFFIX}")
}

/// File name of the initial metadata object of a tablet
#[must_use]
pub fn tablet_initial_metadata_filename(tablet_id: TabletId) -> String {
    format!("{tablet_id:016X}{INITIAL_METADATA_SUFFIX}")
}

/// File name of a transaction log
#[must_use]
pub fn txn_log_filename(tablet_id: TabletId, txn_id: TxnId) -> String {
    format!("{tablet_id:016X}_{txn_id:016X}.log")
}

/// File name of a shared schema file
#[must_use]
pub fn schema_filename(schema_id: SchemaId) -> String {
    format!("SCHEMA_{schema_id:016X}")
}

/// A parsed metadata file name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataFileName {
    Versioned { tablet_id: TabletId, version: Version },
    Initial { tablet_id: TabletId },
}

impl MetadataFileName {
    /// Parse the last path component of a metadata key.
    ///
    /// Returns `None` for anything that is not a metadata file name.
    #[must_use]
    pub fn parse(location: &str) -> Option<Self> {
        let name = location.rsplit('/').next()?;
        if let Some(id) = name.strip_suffix(INITIAL_METADATA_SUFFIX) {
            return Some(Self::Initial {
                tablet_id: parse_hex(id)?,
            });
        }
        let (id, version) = name.strip_suffix(METADATA_SUFFIX)?.split_once('_')?;
        Some(Self::Versioned {
            tablet_id: parse_hex(id)?,
            version: parse_hex(version)?,
        })
    }

    /// Tablet the file belongs to
    #[must_use]
    pub const fn tablet_id(&self) -> TabletId {
        match self {
            Self::Versioned { tablet_id, .. } | Self::Initial { tablet_id } => *tablet_id,
        }
    }
}

#[allow(clippy::cast_possible_wrap)]
fn parse_hex(s: &str) -> Option<i64> {
    if s.len() != 16 {
        return None;
    }
    u64::from_str_radix(s, 16).ok().map(|v| v as i64)
}

/// Maps tablet identifiers to storage locations.
///
/// Only `root_location` is required; the rest of the layout derives from it.
pub trait LocationProvider: Send + Sync {
    /// Root directory holding everything of a tablet
    fn root_location(&self, tablet_id: TabletId) -> String;

    fn metadata_root_location(&self, tablet_id: TabletId) -> String {
        join_path(&self.root_location(tablet_id), METADATA_DIRECTORY_NAME)
    }

    fn txn_log_root_location(&self, tablet_id: TabletId) -> String {
        join_path(&self.root_location(tablet_id), TXN_LOG_DIRECTORY_NAME)
    }

    fn segment_root_location(&self, tablet_id: TabletId) -> String {
        join_path(&self.root_location(tablet_id), SEGMENT_DIRECTORY_NAME)
    }

    fn tablet_metadata_location(&self, tablet_id: TabletId, version: Version) -> String {
        join_path(
            &self.metadata_root_location(tablet_id),
            &tablet_metadata_filename(tablet_id, version),
        )
    }

    fn tablet_initial_metadata_location(&self, tablet_id: TabletId) -> String {
        join_path(
            &self.metadata_root_location(tablet_id),
            &tablet_initial_metadata_filename(tablet_id),
        )
    }

    /// Prefix shared by every metadata object of one tablet
    fn tablet_metadata_prefix(&self, tablet_id: TabletId) -> String {
        join_path(
            &self.metadata_root_location(tablet_id),
            &format!("{tablet_id:016X}_"),
        )
    }

    fn txn_log_location(&self, tablet_id: TabletId, txn_id: TxnId) -> String {
        join_path(
            &self.txn_log_root_location(tablet_id),
            &txn_log_filename(tablet_id, txn_id),
        )
    }

    /// Schema files sit under the tablet root, so tablets sharing a root
    /// share one copy per schema id.
    fn schema_file_location(&self, tablet_id: TabletId, schema_id: SchemaId) -> String {
        join_path(&self.root_location(tablet_id), &schema_filename(schema_id))
    }

    fn segment_location(&self, tablet_id: TabletId, segment_name: &str) -> String {
        join_path(&self.segment_root_location(tablet_id), segment_name)
    }
}

/// All tablets under one root
#[derive(Debug, Clone)]
pub struct FixedLocationProvider {
    root: String,
}

impl FixedLocationProvider {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }
}

impl LocationProvider for FixedLocationProvider {
    fn root_location(&self, _tablet_id: TabletId) -> String {
        self.root.clone()
    }
}
