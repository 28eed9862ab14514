//! Metadata cache of a directory place

use crate::place::ChangeInfo;
use crate::zettel::{Meta, Zid};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
struct CacheState {
    metas: HashMap<Zid, Meta>,
    /// Bumped by every invalidation; an insert computed before it is dropped.
    generation: u64,
}

/// Parsed metadata per identifier.
///
/// Entries are only removed through [`MetaCache::invalidate`], which the directory place
/// calls for every change notification of its index.
#[derive(Default)]
pub struct MetaCache {
    state: RwLock<CacheState>,
}

impl MetaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, zid: Zid) -> Option<Meta> {
        self.state.read().metas.get(&zid).cloned()
    }

    /// Current generation, to be passed to `insert` after the metadata was read.
    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    /// Cache metadata read while the cache was at `generation`.
    pub fn insert(&self, generation: u64, meta: Meta) {
        let mut state = self.state.write();
        if state.generation == generation {
            state.metas.insert(meta.zid(), meta);
        }
    }

    pub fn invalidate(&self, info: ChangeInfo) {
        let mut state = self.state.write();
        state.generation += 1;
        if info.is_broadcast() {
            state.metas.clear();
        } else {
            state.metas.remove(&info.zid);
        }
    }

    pub fn clear(&self) {
        self.invalidate(ChangeInfo::reload());
    }

    pub fn len(&self) -> usize {
        self.state.read().metas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
