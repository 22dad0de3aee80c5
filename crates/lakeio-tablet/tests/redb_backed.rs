mod common;

use common::{create_request, metadata_with_rowsets};
use lakeio_common::LakeConfig;
use lakeio_store::RedbStore;
use lakeio_tablet::TabletManager;
use std::sync::Arc;

fn manager(config: &LakeConfig) -> TabletManager {
    let store = Arc::new(RedbStore::open(&config.store.path).unwrap());
    TabletManager::from_config(config, store)
}

#[test]
fn test_metadata_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = LakeConfig::default();
    config.store.path = dir.path().join("lake-meta.redb");

    {
        let manager = manager(&config);
        manager.create_tablet(&create_request(10, 100)).unwrap();
        manager
            .put_tablet_metadata(metadata_with_rowsets(10, 2, 1))
            .unwrap();
        manager
            .put_tablet_metadata(metadata_with_rowsets(10, 3, 2))
            .unwrap();
    }

    let manager = manager(&config);
    let versions: Vec<_> = manager
        .list_tablet_metadata(10)
        .unwrap()
        .map(|m| m.unwrap().version)
        .collect();
    assert_eq!(versions, vec![1, 2, 3]);

    let tablet = manager.get_tablet(10, Some(1)).unwrap();
    assert_eq!(tablet.get_schema().unwrap().id, 100);

    let captured = manager.capture_tablet_and_rowsets(10, 3, 3).unwrap();
    assert_eq!(captured.rowsets.len(), 1);
}
