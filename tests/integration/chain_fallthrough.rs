//! Lookups, listings and mutations across a chain of places

use crate::integration::test_utils::{dir_uri, note, write_zettel_file, zid};
use tempfile::TempDir;
use zettelstore::error::PlaceError;
use zettelstore::place::registry::PlaceRegistry;
use zettelstore::place::{Context, Filter, Place, Sorter};
use zettelstore::zettel::keys::KEY_TITLE;
use zettelstore::zettel::Zid;

const TAIL_ZID: u64 = 20210101000000;

fn mem_over_dir(dir: &TempDir) -> Box<dyn Place> {
    let registry = PlaceRegistry::new();
    let tail = registry
        .connect(&dir_uri(dir.path(), ""), false, None)
        .unwrap();
    let head = registry.connect("mem:", false, Some(tail)).unwrap();
    let ctx = Context::background();
    head.next().unwrap().start(&ctx).unwrap();
    head.start(&ctx).unwrap();
    head
}

fn stop(head: &dyn Place) {
    let ctx = Context::background();
    head.stop(&ctx).unwrap();
    head.next().unwrap().stop(&ctx).unwrap();
}

fn title(head: &dyn Place, n: u64) -> String {
    head.get_meta(&Context::background(), zid(n))
        .unwrap()
        .get(KEY_TITLE)
        .unwrap_or_default()
        .to_string()
}

#[test]
fn test_head_shadows_tail_until_deleted() {
    let dir = TempDir::new().unwrap();
    write_zettel_file(dir.path(), TAIL_ZID, "Tail");
    let head = mem_over_dir(&dir);
    let ctx = Context::background();

    assert_eq!(title(head.as_ref(), TAIL_ZID), "Tail");

    let mut shadow = head.get_zettel(&ctx, zid(TAIL_ZID)).unwrap();
    shadow.meta = shadow.meta.to_builder().with(KEY_TITLE, "Head").build();
    head.update_zettel(&ctx, shadow).unwrap();
    assert_eq!(title(head.as_ref(), TAIL_ZID), "Head");

    let listed: Vec<_> = head
        .select_meta(&ctx, None, None)
        .unwrap()
        .into_iter()
        .filter(|m| m.zid() == zid(TAIL_ZID))
        .collect();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].get(KEY_TITLE), Some("Head"));

    head.delete_zettel(&ctx, zid(TAIL_ZID)).unwrap();
    assert_eq!(title(head.as_ref(), TAIL_ZID), "Tail");

    head.delete_zettel(&ctx, zid(TAIL_ZID)).unwrap();
    assert!(matches!(
        head.get_meta(&ctx, zid(TAIL_ZID)),
        Err(PlaceError::UnknownId(_))
    ));
    assert!(!dir.path().join(format!("{}.zettel", TAIL_ZID)).exists());
    stop(head.as_ref());
}

#[test]
fn test_listing_merges_and_sorts_the_chain() {
    let dir = TempDir::new().unwrap();
    write_zettel_file(dir.path(), TAIL_ZID, "Tail");
    write_zettel_file(dir.path(), TAIL_ZID + 2, "Other tail");
    let head = mem_over_dir(&dir);
    let ctx = Context::background();
    let created = head.create_zettel(&ctx, note("Head")).unwrap();
    assert_ne!(created, zid(TAIL_ZID));

    let zids: Vec<Zid> = head
        .select_meta(&ctx, None, None)
        .unwrap()
        .iter()
        .map(|m| m.zid())
        .collect();
    assert_eq!(zids, vec![created, zid(TAIL_ZID + 2), zid(TAIL_ZID)]);

    let tails: Vec<Zid> = head
        .select_meta(&ctx, Some(&Filter::new().with(KEY_TITLE, "tail")), None)
        .unwrap()
        .iter()
        .map(|m| m.zid())
        .collect();
    assert_eq!(tails, vec![zid(TAIL_ZID + 2), zid(TAIL_ZID)]);

    let by_title: Vec<String> = head
        .select_meta(&ctx, None, Some(&Sorter::by(KEY_TITLE, false).page(0, 2)))
        .unwrap()
        .iter()
        .map(|m| m.get(KEY_TITLE).unwrap_or_default().to_string())
        .collect();
    assert_eq!(by_title, vec!["Head", "Other tail"]);
    stop(head.as_ref());
}

#[test]
fn test_rename_checks_the_whole_chain() {
    let dir = TempDir::new().unwrap();
    write_zettel_file(dir.path(), TAIL_ZID, "Tail");
    let head = mem_over_dir(&dir);
    let ctx = Context::background();
    let created = head.create_zettel(&ctx, note("Head")).unwrap();

    assert!(matches!(
        head.rename_zettel(&ctx, created, zid(TAIL_ZID)),
        Err(PlaceError::InvalidId(_))
    ));

    head.rename_zettel(&ctx, zid(TAIL_ZID), zid(TAIL_ZID + 1))
        .unwrap();
    assert_eq!(title(head.as_ref(), TAIL_ZID + 1), "Tail");
    assert!(dir.path().join(format!("{}.zettel", TAIL_ZID + 1)).exists());
    assert!(!dir.path().join(format!("{}.zettel", TAIL_ZID)).exists());
    stop(head.as_ref());
}
