//! Directory place against a real directory: external edits, concurrency and shutdown

use crate::integration::test_utils::{note, wait_until, write_zettel_file, zid, LIVENESS_DEADLINE};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;
use zettelstore::error::PlaceError;
use zettelstore::place::dir::{DirPlace, DirSettings};
use zettelstore::place::{ChangeInfo, Context, Place};
use zettelstore::zettel::keys::KEY_TITLE;
use zettelstore::zettel::{Meta, Zid};

fn fast_settings() -> DirSettings {
    DirSettings {
        workers: 3,
        rescan: Duration::from_secs(1),
        debounce: Duration::from_millis(50),
    }
}

fn started(dir: &TempDir) -> DirPlace {
    let place = DirPlace::new("dir:test", dir.path(), false, fast_settings(), None);
    place.start(&Context::background()).unwrap();
    place
}

fn title_of(place: &DirPlace, n: u64) -> Option<String> {
    place
        .get_meta(&Context::background(), zid(n))
        .ok()
        .and_then(|m| m.get(KEY_TITLE).map(str::to_string))
}

#[test]
fn test_external_edits_become_visible() {
    let dir = TempDir::new().unwrap();
    let place = started(&dir);
    let n = 20210301000000;

    write_zettel_file(dir.path(), n, "Outside");
    assert!(wait_until(LIVENESS_DEADLINE, || title_of(&place, n).as_deref() == Some("Outside")));

    write_zettel_file(dir.path(), n, "Edited");
    assert!(wait_until(LIVENESS_DEADLINE, || title_of(&place, n).as_deref() == Some("Edited")));

    fs::remove_file(dir.path().join(format!("{}.zettel", n))).unwrap();
    assert!(wait_until(LIVENESS_DEADLINE, || matches!(
        place.get_meta(&Context::background(), zid(n)),
        Err(PlaceError::UnknownId(_))
    )));
    place.stop(&Context::background()).unwrap();
}

#[test]
fn test_observers_hear_about_external_edits() {
    let dir = TempDir::new().unwrap();
    let place = started(&dir);
    let seen: Arc<Mutex<Vec<ChangeInfo>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    place.register_change_observer(Arc::new(move |info| sink.lock().push(info)));

    let n = 20210302000000;
    write_zettel_file(dir.path(), n, "Noticed");
    assert!(wait_until(LIVENESS_DEADLINE, || seen
        .lock()
        .iter()
        .any(|info| info.zid == zid(n) || info.is_broadcast())));
    place.stop(&Context::background()).unwrap();
}

#[test]
fn test_concurrent_creates_get_distinct_ids() {
    let dir = TempDir::new().unwrap();
    let place = Arc::new(started(&dir));

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let place = Arc::clone(&place);
            thread::spawn(move || {
                (0..5)
                    .map(|i| {
                        place
                            .create_zettel(&Context::background(), note(&format!("t{} n{}", t, i)))
                            .unwrap()
                    })
                    .collect::<Vec<Zid>>()
            })
        })
        .collect();
    let created: Vec<Zid> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();

    let distinct: HashSet<Zid> = created.iter().copied().collect();
    assert_eq!(distinct.len(), 40);

    let listed = place.select_meta(&Context::background(), None, None).unwrap();
    assert_eq!(listed.len(), 40);
    assert!(listed.windows(2).all(|w| w[0].zid() > w[1].zid()));
    for zid in &created {
        assert!(dir.path().join(format!("{}.zettel", zid)).exists());
    }
    place.stop(&Context::background()).unwrap();
}

#[test]
fn test_stop_leaves_no_thread_behind() {
    let dir = TempDir::new().unwrap();
    let place = started(&dir);
    assert!(place.live_threads() >= fast_settings().workers + 2);

    let zid = place
        .create_zettel(&Context::background(), note("Before stop"))
        .unwrap();
    place.stop(&Context::background()).unwrap();
    assert_eq!(place.live_threads(), 0);
    assert!(matches!(
        place.get_meta(&Context::background(), zid),
        Err(PlaceError::Stopped)
    ));

    place.start(&Context::background()).unwrap();
    assert_eq!(
        place
            .get_meta(&Context::background(), zid)
            .unwrap()
            .get(KEY_TITLE),
        Some("Before stop")
    );
    place.stop(&Context::background()).unwrap();
    assert_eq!(place.live_threads(), 0);
}

#[test]
fn test_reload_picks_up_files_immediately() {
    let dir = TempDir::new().unwrap();
    let place = DirPlace::new(
        "dir:test",
        dir.path(),
        false,
        DirSettings {
            rescan: Duration::from_secs(3600),
            ..fast_settings()
        },
        None,
    );
    let ctx = Context::background();
    place.start(&ctx).unwrap();

    let n = 20210303000000;
    fs::write(
        dir.path().join(format!("{}.meta", n)),
        "title: Split\nsyntax: text\n",
    )
    .unwrap();
    fs::write(dir.path().join(format!("{}.text", n)), "plain text").unwrap();
    place.reload(&ctx).unwrap();

    let zettel = place.get_zettel(&ctx, zid(n)).unwrap();
    assert_eq!(zettel.meta.get(KEY_TITLE), Some("Split"));
    assert_eq!(zettel.content.as_str(), Some("plain text"));

    let mut updated = zettel.clone();
    updated.meta = Meta::builder(zid(n))
        .with(KEY_TITLE, "Joined")
        .with("syntax", "zmk")
        .build();
    place.update_zettel(&ctx, updated).unwrap();
    assert!(dir.path().join(format!("{}.zettel", n)).exists());
    assert!(!dir.path().join(format!("{}.meta", n)).exists());
    assert!(!dir.path().join(format!("{}.text", n)).exists());
    place.stop(&ctx).unwrap();
}
