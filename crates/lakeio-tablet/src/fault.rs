//! Named fault-injection switches
//!
//! A `FaultRegistry` is handed to the tablet manager at construction and
//! consulted at fixed checkpoints. Tests flip switches on one instance;
//! nothing here is global.

use parking_lot::RwLock;
use std::collections::HashSet;

/// Forces schema resolution of bundle metadata to fail as if a shared
/// schema were missing from every sibling object.
pub const SCHEMA_NOT_FOUND_IN_BUNDLE: &str = "tablet_schema_not_found_in_bundle_metadata";

/// Set of enabled fault points
#[derive(Debug, Default)]
pub struct FaultRegistry {
    enabled: RwLock<HashSet<String>>,
}

impl FaultRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&self, name: impl Into<String>) {
        self.enabled.write().insert(name.into());
    }

    pub fn disable(&self, name: &str) {
        self.enabled.write().remove(name);
    }

    /// Check whether a fault point is enabled
    pub fn enabled(&self, name: &str) -> bool {
        self.enabled.read().contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enable_disable() {
        let faults = FaultRegistry::new();
        assert!(!faults.enabled(SCHEMA_NOT_FOUND_IN_BUNDLE));
        faults.enable(SCHEMA_NOT_FOUND_IN_BUNDLE);
        assert!(faults.enabled(SCHEMA_NOT_FOUND_IN_BUNDLE));
        assert!(!faults.enabled("other"));
        faults.disable(SCHEMA_NOT_FOUND_IN_BUNDLE);
        assert!(!faults.enabled(SCHEMA_NOT_FOUND_IN_BUNDLE));
    }
}
