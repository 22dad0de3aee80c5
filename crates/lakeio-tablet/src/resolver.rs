//! Shard catalog seam
//!
//! The surrounding engine knows which tablets this node serves and which
//! index (schema) id a tablet belongs to. The tablet manager only sees that
//! knowledge through `ShardResolver`.

use lakeio_common::{Result, SchemaId, TabletId};
use std::collections::HashMap;

/// Shard property carrying the index id of a tablet
pub const INDEX_ID_PROPERTY: &str = "indexId";

/// Catalog information about one shard (tablet)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardInfo {
    pub id: TabletId,
    pub properties: HashMap<String, String>,
}

impl ShardInfo {
    #[must_use]
    pub fn new(id: TabletId) -> Self {
        Self {
            id,
            properties: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Index id, if the shard carries a parseable `indexId` property
    #[must_use]
    pub fn index_id(&self) -> Option<SchemaId> {
        self.properties.get(INDEX_ID_PROPERTY)?.parse().ok()
    }
}

/// Remote shard/catalog lookups
pub trait ShardResolver: Send + Sync {
    /// Fetch catalog information for a tablet
    fn fetch_shard_info(&self, tablet_id: TabletId) -> Result<ShardInfo>;

    /// Whether this node currently serves the tablet
    fn is_local_shard(&self, tablet_id: TabletId) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_id() {
        let info = ShardInfo::new(5).with_property(INDEX_ID_PROPERTY, "10086");
        assert_eq!(info.index_id(), Some(10086));

        let info = ShardInfo::new(5).with_property(INDEX_ID_PROPERTY, "ten");
        assert_eq!(info.index_id(), None);
        assert_eq!(ShardInfo::new(5).index_id(), None);
    }
}
