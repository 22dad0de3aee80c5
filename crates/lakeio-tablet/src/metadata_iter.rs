//! Lazy iteration over the persisted versions of a tablet

use crate::tablet_manager::TabletManager;
use lakeio_common::{Result, TabletMetadata};
use std::sync::Arc;

/// Iterator over the metadata objects found by one prefix listing.
///
/// The listing is taken once; each object is loaded (through the metacache)
/// only when the iterator reaches it. `restart` rewinds without listing
/// again.
#[derive(Clone)]
pub struct TabletMetadataIter<'a> {
    manager: &'a TabletManager,
    locations: Arc<[String]>,
    pos: usize,
}

impl<'a> TabletMetadataIter<'a> {
    pub(crate) fn new(manager: &'a TabletManager, locations: Vec<String>) -> Self {
        Self {
            manager,
            locations: locations.into(),
            pos: 0,
        }
    }

    pub fn has_next(&self) -> bool {
        self.pos < self.locations.len()
    }

    pub fn restart(&mut self) {
        self.pos = 0;
    }

    /// Locations in iteration order
    pub fn locations(&self) -> &[String] {
        &self.locations
    }
}

impl Iterator for TabletMetadataIter<'_> {
    type Item = Result<Arc<TabletMetadata>>;

    fn next(&mut self) -> Option<Self::Item> {
        let location = self.locations.get(self.pos)?;
        self.pos += 1;
        Some(self.manager.get_tablet_metadata_by_location(location))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.locations.len() - self.pos;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TabletMetadataIter<'_> {}
