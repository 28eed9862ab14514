//! Policy-guarded store on top of a directory place

use crate::integration::test_utils::{dir_uri, zid};
use std::fs;
use tempfile::TempDir;
use zettelstore::config::{AuthConfig, StoreConfig};
use zettelstore::error::{ErrorKind, Operation, PlaceError};
use zettelstore::place::manager::Manager;
use zettelstore::place::{Context, Place};
use zettelstore::zettel::keys::{KEY_TITLE, KEY_USER_ROLE, KEY_VISIBILITY};
use zettelstore::zettel::{Meta, Zettel, Zid};

const OWNER: u64 = 20200101000000;

fn guarded_store(dir: &TempDir, readonly: bool) -> Manager {
    let config = StoreConfig {
        places: vec![dir_uri(dir.path(), "rescan=3600")],
        readonly,
        auth: AuthConfig {
            owner: Some(OWNER.to_string()),
            ..AuthConfig::default()
        },
        ..StoreConfig::default()
    };
    let manager = Manager::from_config(&config).unwrap();
    manager.start(&Context::background()).unwrap();
    manager
}

fn owner() -> Context {
    Context::with_user(Meta::new(zid(OWNER)))
}

fn as_role(n: u64, role: &str) -> Context {
    Context::with_user(Meta::builder(zid(n)).with(KEY_USER_ROLE, role).build())
}

fn note(title: &str, visibility: &str) -> Zettel {
    Zettel::new(
        Meta::builder(Zid::INVALID)
            .with(KEY_TITLE, title)
            .with(KEY_VISIBILITY, visibility)
            .build(),
        "Some content",
    )
}

fn stored_text(dir: &TempDir, zid: Zid) -> String {
    fs::read_to_string(dir.path().join(format!("{}.zettel", zid))).unwrap()
}

#[test]
fn test_listing_is_filtered_per_user() {
    let dir = TempDir::new().unwrap();
    let store = guarded_store(&dir, false);
    let public = store.create_zettel(&owner(), note("Public", "public")).unwrap();
    let login = store.create_zettel(&owner(), note("Login", "login")).unwrap();
    let private = store.create_zettel(&owner(), note("Private", "owner")).unwrap();

    let visible = |ctx: &Context| -> Vec<Zid> {
        store
            .select_meta(ctx, None, None)
            .unwrap()
            .iter()
            .map(Meta::zid)
            .filter(|z| [public, login, private].contains(z))
            .collect()
    };
    assert_eq!(visible(&Context::background()), vec![public]);
    assert_eq!(visible(&as_role(20200101000005, "reader")), vec![login, public]);
    assert_eq!(visible(&owner()), vec![private, login, public]);
    store.stop(&Context::background()).unwrap();
}

#[test]
fn test_denied_update_leaves_the_file_untouched() {
    let dir = TempDir::new().unwrap();
    let store = guarded_store(&dir, false);
    let zid = store.create_zettel(&owner(), note("Original", "login")).unwrap();
    let before = stored_text(&dir, zid);

    let reader = as_role(20200101000005, "reader");
    let mut edit = store.get_zettel(&reader, zid).unwrap();
    edit.meta = edit.meta.to_builder().with(KEY_TITLE, "Vandalized").build();
    let err = store.update_zettel(&reader, edit.clone()).unwrap_err();
    assert!(matches!(err, PlaceError::NotAuthorized { op: Operation::Write, .. }));
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_eq!(stored_text(&dir, zid), before);

    let writer = as_role(20200101000006, "writer");
    store.update_zettel(&writer, edit).unwrap();
    assert!(stored_text(&dir, zid).contains("Vandalized"));

    assert!(matches!(
        store.delete_zettel(&writer, zid),
        Err(PlaceError::NotAuthorized { op: Operation::Delete, .. })
    ));
    store.delete_zettel(&owner(), zid).unwrap();
    assert!(!dir.path().join(format!("{}.zettel", zid)).exists());
    store.stop(&Context::background()).unwrap();
}

#[test]
fn test_read_only_store_serves_reads_only() {
    let dir = TempDir::new().unwrap();
    let n = 20210101000000;
    fs::write(
        dir.path().join(format!("{}.zettel", n)),
        "title: Existing\nvisibility: public\n\nBody\n",
    )
    .unwrap();
    let store = guarded_store(&dir, true);

    assert_eq!(
        store
            .get_meta(&Context::background(), zid(n))
            .unwrap()
            .get(KEY_TITLE),
        Some("Existing")
    );
    assert!(!store.can_create_zettel(&owner()));
    let err = store.create_zettel(&owner(), note("New", "public")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert!(matches!(
        store.delete_zettel(&owner(), zid(n)),
        Err(PlaceError::NotAuthorized { .. })
    ));
    assert!(dir.path().join(format!("{}.zettel", n)).exists());
    store.stop(&Context::background()).unwrap();
}
