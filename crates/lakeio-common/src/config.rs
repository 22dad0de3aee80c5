//! Configuration types for lakeio
//!
//! This module defines configuration structures used across components.
//! Every section has a `Default`, so a config file only needs to name the
//! values it changes.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides (`LAKEIO_METACACHE__CAPACITY_BYTES=...`)
pub const ENV_PREFIX: &str = "LAKEIO";

/// Root configuration for lakeio
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LakeConfig {
    /// Metadata cache configuration
    pub metacache: MetacacheConfig,
    /// Tablet creation defaults
    pub tablet: TabletConfig,
    /// Metadata store configuration
    pub store: StoreConfig,
}

impl LakeConfig {
    /// Load configuration from a file, overlaid with `LAKEIO_*` environment
    /// variables. A missing file is not an error; defaults apply.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(config::Config::try_deserialize)
            .map_err(|e| Error::Configuration(format!("{}: {e}", path.display())))
    }
}

/// Metadata cache configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetacacheConfig {
    /// Byte budget shared by metadata snapshots, schemas and txn logs
    pub capacity_bytes: usize,
}

impl Default for MetacacheConfig {
    fn default() -> Self {
        Self {
            capacity_bytes: 64 * 1024 * 1024, // 64 MB
        }
    }
}

/// Tablet creation defaults
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabletConfig {
    /// Materialize a standalone schema file when creating a tablet
    pub create_schema_file: bool,
    /// Write version 1 to the initial-metadata location instead of the
    /// canonical versioned location
    pub enable_creation_optimization: bool,
}

impl Default for TabletConfig {
    fn default() -> Self {
        Self {
            create_schema_file: true,
            enable_creation_optimization: false,
        }
    }
}

/// Metadata store configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Root prefix under which tablet objects are laid out
    pub root: String,
    /// Path of the local redb database file
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: "lake".to_string(),
            path: PathBuf::from("./lake-meta.redb"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = LakeConfig::default();
        assert_eq!(config.metacache.capacity_bytes, 64 * 1024 * 1024);
        assert!(config.tablet.create_schema_file);
        assert!(!config.tablet.enable_creation_optimization);
        assert_eq!(config.store.root, "lake");
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[metacache]\ncapacity_bytes = 4096\n\n[store]\nroot = \"s3://bucket/lake\""
        )
        .unwrap();

        let config = LakeConfig::load(file.path()).unwrap();
        assert_eq!(config.metacache.capacity_bytes, 4096);
        assert_eq!(config.store.root, "s3://bucket/lake");
        // Untouched sections keep their defaults
        assert!(config.tablet.create_schema_file);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = LakeConfig::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, LakeConfig::default());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = LakeConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: LakeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
