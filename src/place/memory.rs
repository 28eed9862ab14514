//! In-memory place (`mem:`)
//!
//! Holds zettel in a map that lives from `start` to `stop`. Nothing is persisted.

use crate::error::PlaceError;
use crate::place::filter::create_filter_func;
use crate::place::registry::is_readonly;
use crate::place::{
    next_delete_zettel, next_get_meta, next_get_zettel, next_has_zettel, next_reload,
    next_rename_zettel, select_chain, ChangeInfo, ChangeObserver, ChangeReason, Context, Filter,
    Observers, Place, Result, Sorter,
};
use crate::zettel::{id, Meta, Zettel, Zid};
use parking_lot::RwLock;
use std::collections::{btree_map, BTreeMap};
use tracing::{debug, info};
use url::Url;

pub const SCHEME: &str = "mem";

pub struct MemPlace {
    location: String,
    readonly: bool,
    next: Option<Box<dyn Place>>,
    zettel: RwLock<Option<BTreeMap<Zid, Zettel>>>,
    observers: Observers,
}

/// Factory for the place registry.
pub fn connect(url: &Url, next: Option<Box<dyn Place>>) -> Result<Box<dyn Place>> {
    Ok(Box::new(MemPlace::new(url.as_str(), is_readonly(url), next)))
}

impl MemPlace {
    pub fn new(location: &str, readonly: bool, next: Option<Box<dyn Place>>) -> Self {
        Self {
            location: location.to_string(),
            readonly,
            next,
            zettel: RwLock::new(None),
            observers: Observers::new(),
        }
    }

    fn next_ref(&self) -> Option<&dyn Place> {
        self.next.as_deref()
    }

    fn has_local(&self, zid: Zid) -> Result<bool> {
        let guard = self.zettel.read();
        let map = guard.as_ref().ok_or(PlaceError::Stopped)?;
        Ok(map.contains_key(&zid))
    }
}

impl Place for MemPlace {
    fn next(&self) -> Option<&dyn Place> {
        self.next_ref()
    }

    fn location(&self) -> String {
        self.location.clone()
    }

    fn start(&self, _ctx: &Context) -> Result<()> {
        let mut guard = self.zettel.write();
        if guard.is_some() {
            return Err(PlaceError::AlreadyStarted);
        }
        *guard = Some(BTreeMap::new());
        info!(location = %self.location, "Memory place started");
        Ok(())
    }

    fn stop(&self, _ctx: &Context) -> Result<()> {
        *self.zettel.write() = None;
        info!(location = %self.location, "Memory place stopped");
        Ok(())
    }

    fn can_create_zettel(&self, _ctx: &Context) -> bool {
        !self.readonly && self.zettel.read().is_some()
    }

    fn create_zettel(&self, ctx: &Context, zettel: Zettel) -> Result<Zid> {
        if self.readonly {
            return Err(PlaceError::ReadOnly);
        }
        if self.zettel.read().is_none() {
            return Err(PlaceError::Stopped);
        }
        let zid = loop {
            let candidate = id::allocate(|z| {
                self.has_local(z).unwrap_or(false) || next_has_zettel(ctx, self.next_ref(), z)
            });
            let mut guard = self.zettel.write();
            let map = guard.as_mut().ok_or(PlaceError::Stopped)?;
            // Another creator may have taken the candidate since it was checked.
            if let btree_map::Entry::Vacant(slot) = map.entry(candidate) {
                slot.insert(zettel.with_zid(candidate));
                break candidate;
            }
        };
        debug!(zid = %zid, "Created zettel in memory");
        self.observers.notify(ChangeInfo::new(ChangeReason::Update, zid));
        Ok(zid)
    }

    fn get_zettel(&self, ctx: &Context, zid: Zid) -> Result<Zettel> {
        {
            let guard = self.zettel.read();
            let map = guard.as_ref().ok_or(PlaceError::Stopped)?;
            if let Some(zettel) = map.get(&zid) {
                return Ok(zettel.clone());
            }
        }
        next_get_zettel(ctx, self.next_ref(), zid)
    }

    fn get_meta(&self, ctx: &Context, zid: Zid) -> Result<Meta> {
        {
            let guard = self.zettel.read();
            let map = guard.as_ref().ok_or(PlaceError::Stopped)?;
            if let Some(zettel) = map.get(&zid) {
                return Ok(zettel.meta.clone());
            }
        }
        next_get_meta(ctx, self.next_ref(), zid)
    }

    fn select_meta(
        &self,
        ctx: &Context,
        filter: Option<&Filter>,
        sorter: Option<&Sorter>,
    ) -> Result<Vec<Meta>> {
        let matches = create_filter_func(filter);
        let local: Vec<Meta> = {
            let guard = self.zettel.read();
            let map = guard.as_ref().ok_or(PlaceError::Stopped)?;
            map.values()
                .map(|z| &z.meta)
                .filter(|m| matches(*m))
                .cloned()
                .collect()
        };
        select_chain(ctx, local, self.next_ref(), filter, sorter)
    }

    fn can_update_zettel(&self, _ctx: &Context, zettel: &Zettel) -> bool {
        !self.readonly && zettel.zid().is_valid() && self.zettel.read().is_some()
    }

    fn update_zettel(&self, _ctx: &Context, zettel: Zettel) -> Result<()> {
        let zid = zettel.zid();
        if !zid.is_valid() {
            return Err(PlaceError::InvalidId(zid));
        }
        if self.readonly {
            return Err(PlaceError::ReadOnly);
        }
        {
            let mut guard = self.zettel.write();
            let map = guard.as_mut().ok_or(PlaceError::Stopped)?;
            map.insert(zid, zettel);
        }
        self.observers.notify(ChangeInfo::new(ChangeReason::Update, zid));
        Ok(())
    }

    fn can_rename_zettel(&self, ctx: &Context, zid: Zid) -> bool {
        match self.has_local(zid) {
            Ok(true) => !self.readonly,
            Ok(false) => self.next_ref().is_some_and(|n| n.can_rename_zettel(ctx, zid)),
            Err(_) => false,
        }
    }

    fn rename_zettel(&self, ctx: &Context, cur_zid: Zid, new_zid: Zid) -> Result<()> {
        if cur_zid == new_zid {
            return Ok(());
        }
        if !new_zid.is_valid() {
            return Err(PlaceError::InvalidId(new_zid));
        }
        if !self.has_local(cur_zid)? {
            if self.has_local(new_zid)? {
                return Err(PlaceError::InvalidId(new_zid));
            }
            return next_rename_zettel(ctx, self.next_ref(), cur_zid, new_zid);
        }
        if self.readonly {
            return Err(PlaceError::ReadOnly);
        }
        if next_has_zettel(ctx, self.next_ref(), new_zid) {
            return Err(PlaceError::InvalidId(new_zid));
        }
        {
            let mut guard = self.zettel.write();
            let map = guard.as_mut().ok_or(PlaceError::Stopped)?;
            if map.contains_key(&new_zid) {
                return Err(PlaceError::InvalidId(new_zid));
            }
            let zettel = map.remove(&cur_zid).ok_or(PlaceError::UnknownId(cur_zid))?;
            map.insert(new_zid, zettel.with_zid(new_zid));
        }
        self.observers.notify(ChangeInfo::new(ChangeReason::Delete, cur_zid));
        self.observers.notify(ChangeInfo::new(ChangeReason::Update, new_zid));
        Ok(())
    }

    fn can_delete_zettel(&self, ctx: &Context, zid: Zid) -> bool {
        match self.has_local(zid) {
            Ok(true) => !self.readonly,
            Ok(false) => self.next_ref().is_some_and(|n| n.can_delete_zettel(ctx, zid)),
            Err(_) => false,
        }
    }

    fn delete_zettel(&self, ctx: &Context, zid: Zid) -> Result<()> {
        if !self.has_local(zid)? {
            return next_delete_zettel(ctx, self.next_ref(), zid);
        }
        if self.readonly {
            return Err(PlaceError::ReadOnly);
        }
        {
            let mut guard = self.zettel.write();
            let map = guard.as_mut().ok_or(PlaceError::Stopped)?;
            map.remove(&zid);
        }
        self.observers.notify(ChangeInfo::new(ChangeReason::Delete, zid));
        Ok(())
    }

    fn register_change_observer(&self, observer: ChangeObserver) {
        self.observers.register(observer.clone());
        if let Some(next) = self.next_ref() {
            next.register_change_observer(observer);
        }
    }

    fn reload(&self, ctx: &Context) -> Result<()> {
        if self.zettel.read().is_none() {
            return Err(PlaceError::Stopped);
        }
        next_reload(ctx, self.next_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zettel::keys::KEY_TITLE;

    fn zettel(title: &str) -> Zettel {
        Zettel::new(
            Meta::builder(Zid::INVALID).with(KEY_TITLE, title).build(),
            format!("content of {}", title),
        )
    }

    fn started(next: Option<Box<dyn Place>>) -> MemPlace {
        let place = MemPlace::new("mem:", false, next);
        place.start(&Context::background()).unwrap();
        place
    }

    #[test]
    fn test_stopped_place_rejects_operations() {
        let place = MemPlace::new("mem:", false, None);
        let ctx = Context::background();
        assert!(matches!(place.get_meta(&ctx, Zid::MAX), Err(PlaceError::Stopped)));
        assert!(matches!(place.select_meta(&ctx, None, None), Err(PlaceError::Stopped)));
        place.start(&ctx).unwrap();
        assert!(matches!(place.start(&ctx), Err(PlaceError::AlreadyStarted)));
    }

    #[test]
    fn test_create_get_update_delete() {
        let ctx = Context::background();
        let place = started(None);
        let zid = place.create_zettel(&ctx, zettel("one")).unwrap();
        assert!(zid.is_valid());

        let got = place.get_zettel(&ctx, zid).unwrap();
        assert_eq!(got.zid(), zid);
        assert_eq!(got.meta.get(KEY_TITLE), Some("one"));

        let changed = Zettel::new(got.meta.to_builder().with(KEY_TITLE, "uno").build(), "new");
        place.update_zettel(&ctx, changed).unwrap();
        assert_eq!(place.get_meta(&ctx, zid).unwrap().get(KEY_TITLE), Some("uno"));

        place.delete_zettel(&ctx, zid).unwrap();
        assert!(matches!(place.get_zettel(&ctx, zid), Err(PlaceError::UnknownId(z)) if z == zid));
        assert!(matches!(place.delete_zettel(&ctx, zid), Err(PlaceError::UnknownId(_))));
    }

    #[test]
    fn test_concurrent_creates_get_distinct_ids() {
        let ctx = Context::background();
        let place = started(None);
        let first = place.create_zettel(&ctx, zettel("first")).unwrap();
        let created: Vec<Zid> = std::thread::scope(|scope| {
            let creators: Vec<_> = (0..3)
                .map(|n| {
                    let place = &place;
                    scope.spawn(move || {
                        let ctx = Context::background();
                        (0..2)
                            .map(|i| place.create_zettel(&ctx, zettel(&format!("{n}-{i}"))).unwrap())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            // Reads are served while creators wait for a free identifier.
            assert!(place.get_meta(&ctx, first).is_ok());
            creators.into_iter().flat_map(|h| h.join().unwrap()).collect()
        });
        let mut distinct = created.clone();
        distinct.push(first);
        distinct.sort();
        distinct.dedup();
        assert_eq!(distinct.len(), 7);
        assert_eq!(place.select_meta(&ctx, None, None).unwrap().len(), 7);
    }

    #[test]
    fn test_update_rejects_invalid_id() {
        let place = started(None);
        let err = place.update_zettel(&Context::background(), zettel("x")).unwrap_err();
        assert!(matches!(err, PlaceError::InvalidId(_)));
    }

    #[test]
    fn test_rename_within_place() {
        let ctx = Context::background();
        let place = started(None);
        let a = place.create_zettel(&ctx, zettel("a")).unwrap();
        let b = place.create_zettel(&ctx, zettel("b")).unwrap();
        let target = Zid::new(20000101000000).unwrap();

        assert!(matches!(place.rename_zettel(&ctx, a, b), Err(PlaceError::InvalidId(_))));
        place.rename_zettel(&ctx, a, a).unwrap();
        place.rename_zettel(&ctx, a, target).unwrap();
        assert_eq!(place.get_meta(&ctx, target).unwrap().get(KEY_TITLE), Some("a"));
        assert_eq!(place.get_meta(&ctx, target).unwrap().zid(), target);
        assert!(place.get_meta(&ctx, a).is_err());
    }

    #[test]
    fn test_observers_are_notified() {
        use std::sync::{Arc, Mutex};

        let ctx = Context::background();
        let place = started(None);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        place.register_change_observer(Arc::new(move |info: ChangeInfo| sink.lock().unwrap().push(info)));

        let zid = place.create_zettel(&ctx, zettel("a")).unwrap();
        place.delete_zettel(&ctx, zid).unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                ChangeInfo::new(ChangeReason::Update, zid),
                ChangeInfo::new(ChangeReason::Delete, zid)
            ]
        );
    }

    #[test]
    fn test_stop_discards_content() {
        let ctx = Context::background();
        let place = started(None);
        let zid = place.create_zettel(&ctx, zettel("a")).unwrap();
        place.stop(&ctx).unwrap();
        place.start(&ctx).unwrap();
        assert!(matches!(place.get_meta(&ctx, zid), Err(PlaceError::UnknownId(_))));
    }
}
