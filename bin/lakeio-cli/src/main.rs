//! lakeio CLI - Tablet metadata admin tool
//!
//! Inspects and creates tablet metadata in a local redb-backed store.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lakeio_common::{LakeConfig, TabletId, Version};
use lakeio_store::{Codec, RedbStore};
use lakeio_tablet::{CreateTabletRequest, SchemaSpec, TabletManager, VersionedTablet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "lakeio-cli")]
#[command(about = "lakeio tablet metadata admin CLI")]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = "lakeio.toml")]
    config: PathBuf,

    /// Metadata store file (overrides the config)
    #[arg(long, env = "LAKEIO_STORE_PATH")]
    store_path: Option<PathBuf>,

    /// Location root (overrides the config)
    #[arg(long)]
    root: Option<String>,

    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print tablet metadata as JSON
    Show {
        /// Tablet ID
        tablet_id: TabletId,
        /// Version (newest listed version if omitted)
        #[arg(short, long)]
        version: Option<Version>,
    },
    /// List the persisted versions of a tablet
    List {
        /// Tablet ID
        tablet_id: TabletId,
    },
    /// Print the schema of a tablet
    Schema {
        /// Tablet ID
        tablet_id: TabletId,
        /// Version (newest listed version if omitted)
        #[arg(short, long)]
        version: Option<Version>,
    },
    /// Create a tablet from a JSON schema description
    Create {
        /// Tablet ID
        tablet_id: TabletId,
        /// JSON file with `id`, `keys_type` and `columns`
        #[arg(short, long)]
        schema: PathBuf,
        /// Derive column ids from this tablet
        #[arg(long)]
        base_tablet: Option<TabletId>,
        /// Skip the shared schema file
        #[arg(long)]
        no_schema_file: bool,
        /// Write to the initial-metadata location
        #[arg(long)]
        creation_optimization: bool,
    },
    /// Show the rowsets a tablet gained in a version window
    Capture {
        /// Tablet ID
        tablet_id: TabletId,
        /// First version of the window
        from: Version,
        /// Last version of the window
        to: Version,
    },
}

/// The tablet at `version`, or at the newest version found by listing
fn resolve_tablet(
    manager: &TabletManager,
    tablet_id: TabletId,
    version: Option<Version>,
) -> Result<VersionedTablet<'_>> {
    let metadata = match version {
        Some(version) => manager.get_tablet_metadata(tablet_id, version)?,
        None => manager.get_latest_tablet_metadata(tablet_id)?,
    };
    Ok(VersionedTablet::new(manager, metadata))
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = LakeConfig::load(&args.config)?;
    if let Some(path) = args.store_path {
        config.store.path = path;
    }
    if let Some(root) = args.root {
        config.store.root = root;
    }
    info!("Using metadata store {:?}", config.store.path);

    let store = Arc::new(RedbStore::open(&config.store.path)?);
    let manager = TabletManager::from_config(&config, store);

    match args.command {
        Commands::Show { tablet_id, version } => {
            let tablet = resolve_tablet(&manager, tablet_id, version)?;
            println!("{}", Codec::to_json_pretty(tablet.metadata().as_ref())?);
        }
        Commands::List { tablet_id } => {
            println!("{:<20} {:>10} {:>16}", "VERSION", "ROWSETS", "SCHEMA");
            for metadata in manager.list_tablet_metadata(tablet_id)? {
                let metadata = metadata?;
                println!(
                    "{:<20} {:>10} {:>16}",
                    metadata.version,
                    metadata.rowsets.len(),
                    metadata.schema.id
                );
            }
        }
        Commands::Schema { tablet_id, version } => {
            let tablet = resolve_tablet(&manager, tablet_id, version)?;
            let schema = tablet.get_schema()?;
            println!(
                "Schema {} (version {}, {}, next column id {})",
                schema.id, schema.schema_version, schema.keys_type, schema.next_column_unique_id
            );
            for column in &schema.columns {
                println!(
                    "  {:>4}  {:<24} {:<16}{}{}",
                    column.unique_id,
                    column.name,
                    column.column_type,
                    if column.is_key { " KEY" } else { "" },
                    if column.is_nullable { " NULL" } else { "" }
                );
            }
        }
        Commands::Create {
            tablet_id,
            schema,
            base_tablet,
            no_schema_file,
            creation_optimization,
        } => {
            let contents = std::fs::read_to_string(&schema)
                .with_context(|| format!("reading {}", schema.display()))?;
            let spec: SchemaSpec = serde_json::from_str(&contents)
                .with_context(|| format!("parsing {}", schema.display()))?;

            let mut request =
                CreateTabletRequest::new(tablet_id, spec).with_tablet_config(&config.tablet);
            request.base_tablet_id = base_tablet;
            if no_schema_file {
                request.create_schema_file = false;
            }
            if creation_optimization {
                request.enable_tablet_creation_optimization = true;
            }
            let metadata = manager.create_tablet(&request)?;
            println!(
                "Created tablet {} with schema {} ({} columns)",
                metadata.id,
                metadata.schema.id,
                metadata.schema.num_columns()
            );
        }
        Commands::Capture {
            tablet_id,
            from,
            to,
        } => {
            let captured = manager.capture_tablet_and_rowsets(tablet_id, from, to)?;
            println!(
                "Tablet {} version {}: {} rowsets in [{from}, {to}]",
                captured.tablet.id(),
                captured.tablet.version(),
                captured.rowsets.len()
            );
            for rowset in &captured.rowsets {
                println!(
                    "  rowset {:>8}  rows {:>12}  bytes {:>14}",
                    rowset.id, rowset.num_rows, rowset.data_size
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lakeio_store::{FixedLocationProvider, MemoryStore};
    use lakeio_tablet::ColumnSpec;

    #[test]
    fn test_resolve_tablet_prefers_newest_version() {
        let manager = TabletManager::new(
            Arc::new(MemoryStore::new()),
            Arc::new(FixedLocationProvider::new("lake")),
            1 << 20,
        );
        let mut request = CreateTabletRequest::new(
            7,
            SchemaSpec::new(1, vec![ColumnSpec::new("c0", "INT").key()]),
        );
        request.enable_tablet_creation_optimization = true;
        let created = manager.create_tablet(&request).unwrap();

        let mut newer = created.as_ref().clone();
        newer.version = 5;
        manager.put_tablet_metadata(newer).unwrap();

        assert_eq!(resolve_tablet(&manager, 7, None).unwrap().version(), 5);
        assert_eq!(resolve_tablet(&manager, 7, Some(1)).unwrap().version(), 1);
        assert!(resolve_tablet(&manager, 8, None).is_err());
    }
}
