//! A complete store assembled from configuration

use crate::integration::test_utils::{dir_uri, note};
use tempfile::TempDir;
use zettelstore::config::{AuthConfig, StoreConfig};
use zettelstore::error::PlaceError;
use zettelstore::place::manager::Manager;
use zettelstore::place::{Context, Filter, Place};
use zettelstore::zettel::id::{
    CONFIGURATION_ZID, DEFAULT_HOME_ZID, PLACE_MANAGER_ZID, STARTUP_CONFIGURATION_ZID, VERSION_ZID,
};
use zettelstore::zettel::keys::KEY_TITLE;

fn store(dir: &TempDir) -> (Manager, String) {
    let uri = dir_uri(dir.path(), "worker=2");
    let config = StoreConfig {
        places: vec![uri.clone(), "mem:".to_string()],
        auth: AuthConfig {
            expert_mode: true,
            ..AuthConfig::default()
        },
        ..StoreConfig::default()
    };
    (Manager::from_config(&config).unwrap(), uri)
}

#[test]
fn test_store_from_config() {
    let dir = TempDir::new().unwrap();
    let (manager, uri) = store(&dir);
    assert_eq!(manager.locations(), vec![uri.clone(), "mem:".to_string(), "globals:".to_string()]);

    let ctx = Context::background();
    manager.start(&ctx).unwrap();

    let zid = manager.create_zettel(&ctx, note("Stored")).unwrap();
    assert!(dir.path().join(format!("{}.zettel", zid)).exists());

    assert!(manager.get_zettel(&ctx, DEFAULT_HOME_ZID).is_ok());
    assert!(manager.get_meta(&ctx, CONFIGURATION_ZID).is_ok());
    assert!(manager.get_meta(&ctx, VERSION_ZID).is_ok());

    let places = manager.get_zettel(&ctx, PLACE_MANAGER_ZID).unwrap();
    assert!(places.content.as_text().contains(&uri));
    let startup = manager.get_zettel(&ctx, STARTUP_CONFIGURATION_ZID).unwrap();
    assert!(startup.content.as_text().contains("mem:"));

    let stored: Vec<_> = manager
        .select_meta(&ctx, Some(&Filter::new().with(KEY_TITLE, "stored")), None)
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].zid(), zid);

    manager.reload(&ctx).unwrap();
    assert!(manager.get_meta(&ctx, zid).is_ok());

    manager.stop(&ctx).unwrap();
    assert!(matches!(manager.get_meta(&ctx, zid), Err(PlaceError::Stopped)));
}

#[test]
fn test_built_in_zettel_cannot_be_changed() {
    let dir = TempDir::new().unwrap();
    let (manager, _) = store(&dir);
    let ctx = Context::background();
    manager.start(&ctx).unwrap();

    assert!(!manager.can_delete_zettel(&ctx, VERSION_ZID));
    assert!(manager.delete_zettel(&ctx, VERSION_ZID).is_err());
    assert!(manager.delete_zettel(&ctx, DEFAULT_HOME_ZID).is_err());
    assert!(manager.get_meta(&ctx, DEFAULT_HOME_ZID).is_ok());
    manager.stop(&ctx).unwrap();
}

#[test]
fn test_second_start_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (manager, _) = store(&dir);
    let ctx = Context::background();
    manager.start(&ctx).unwrap();
    assert!(matches!(manager.start(&ctx), Err(PlaceError::AlreadyStarted)));
    manager.stop(&ctx).unwrap();
}
