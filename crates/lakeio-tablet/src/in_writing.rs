//! Best-effort accounting of bytes being written per tablet
//!
//! Writers add to a tablet's counter before their data lands; flow control
//! reads it. Counters are never authoritative space usage and are swept
//! periodically for tablets this node no longer serves.

use dashmap::DashMap;
use lakeio_common::TabletId;

#[derive(Debug, Default)]
pub struct InWritingSizes {
    sizes: DashMap<TabletId, i64>,
}

impl InWritingSizes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, tablet_id: TabletId, size: i64) {
        *self.sizes.entry(tablet_id).or_insert(0) += size;
    }

    /// Current counter, 0 for unknown tablets
    pub fn get(&self, tablet_id: TabletId) -> i64 {
        self.sizes.get(&tablet_id).map_or(0, |v| *v)
    }

    /// Drop counters of tablets that fail `keep`
    pub fn retain(&self, mut keep: impl FnMut(TabletId) -> bool) -> usize {
        let before = self.sizes.len();
        self.sizes.retain(|tablet_id, _| keep(*tablet_id));
        before - self.sizes.len()
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}
