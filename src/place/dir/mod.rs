//! Directory place (`dir://<path>`)
//!
//! Stores every zettel as one or two files in a single directory. The place is made of
//! three cooperating parts: the [`index`] thread owning the map of entries, a pool of
//! [`worker`] threads doing the file I/O, and the [`watch`] threads keeping the index in
//! sync with changes made behind the place's back. Parsed metadata is kept in a
//! [`cache`] that is invalidated by the change notifications of the index.
//!
//! Query parameters:
//! - `readonly`: reject all modifications
//! - `worker=N`: number of file workers (default 7)
//! - `rescan=S`: seconds between forced rescans (default 600)
//! - `debounce=MS`: milliseconds file events are coalesced (default 100)

pub mod cache;
pub mod entry;
pub mod files;
pub mod index;
pub mod watch;
pub mod worker;

use crate::error::PlaceError;
use crate::place::filter::create_filter_func;
use crate::place::registry::{is_readonly, query_number};
use crate::place::{
    next_delete_zettel, next_get_meta, next_get_zettel, next_has_zettel, next_reload,
    next_rename_zettel, select_chain, ChangeInfo, ChangeObserver, Context, Filter, Observers,
    Place, Result, Sorter,
};
use crate::zettel::{Meta, Zettel, Zid};
use cache::MetaCache;
use entry::{Entry, MetaSpec};
use index::{DirIndex, IndexThread};
use parking_lot::RwLock;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use watch::DirWatch;
use worker::{PoolThreads, WorkerPool};

pub const SCHEME: &str = "dir";

pub const DEFAULT_WORKERS: usize = 7;
pub const MAX_WORKERS: usize = 64;
pub const DEFAULT_RESCAN: Duration = Duration::from_secs(600);
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Tuning of a directory place
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirSettings {
    pub workers: usize,
    pub rescan: Duration,
    pub debounce: Duration,
}

impl Default for DirSettings {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            rescan: DEFAULT_RESCAN,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

impl DirSettings {
    pub fn from_url(url: &Url) -> Result<Self> {
        let workers: usize = query_number(url, "worker", DEFAULT_WORKERS)?;
        let rescan: u64 = query_number(url, "rescan", DEFAULT_RESCAN.as_secs())?;
        let debounce: u64 = query_number(url, "debounce", DEFAULT_DEBOUNCE.as_millis() as u64)?;
        Ok(Self {
            workers: workers.clamp(1, MAX_WORKERS),
            rescan: Duration::from_secs(rescan.max(1)),
            debounce: Duration::from_millis(debounce.max(1)),
        })
    }
}

/// Counts the live background threads of a place.
#[derive(Debug, Clone, Default)]
pub struct ThreadCounter(Arc<AtomicUsize>);

struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ThreadCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a named thread that is counted until its closure returns.
    pub fn spawn<F>(&self, name: String, f: F) -> io::Result<JoinHandle<()>>
    where
        F: FnOnce() + Send + 'static,
    {
        self.0.fetch_add(1, Ordering::SeqCst);
        let counter = Arc::clone(&self.0);
        let spawned = thread::Builder::new().name(name).spawn(move || {
            let _guard = LiveGuard(counter);
            f();
        });
        if spawned.is_err() {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
        spawned
    }

    pub fn live(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Background machinery that exists between `start` and `stop`
struct DirRuntime {
    index: DirIndex,
    index_thread: IndexThread,
    pool: WorkerPool,
    pool_threads: PoolThreads,
    watch: DirWatch,
}

impl DirRuntime {
    fn stop(self) {
        self.watch.stop();
        self.index_thread.stop();
        self.pool_threads.stop();
    }
}

pub struct DirPlace {
    location: String,
    dir: PathBuf,
    readonly: bool,
    settings: DirSettings,
    next: Option<Box<dyn Place>>,
    runtime: RwLock<Option<DirRuntime>>,
    cache: Arc<MetaCache>,
    observers: Arc<Observers>,
    threads: ThreadCounter,
}

/// Factory for the place registry.
pub fn connect(url: &Url, next: Option<Box<dyn Place>>) -> Result<Box<dyn Place>> {
    let dir = dir_path(url);
    if dir.as_os_str().is_empty() {
        return Err(PlaceError::connect(url.as_str(), "missing directory path"));
    }
    let settings = DirSettings::from_url(url)?;
    Ok(Box::new(DirPlace::new(
        url.as_str(),
        dir,
        is_readonly(url),
        settings,
        next,
    )))
}

/// Directory of a `dir:` URI: `dir:///abs/path`, `dir://rel/path` or `dir:rel/path`.
fn dir_path(url: &Url) -> PathBuf {
    if url.cannot_be_a_base() {
        return PathBuf::from(url.path());
    }
    let host = url.host_str().unwrap_or_default();
    PathBuf::from(format!("{}{}", host, url.path()))
}

impl DirPlace {
    pub fn new(
        location: &str,
        dir: impl Into<PathBuf>,
        readonly: bool,
        settings: DirSettings,
        next: Option<Box<dyn Place>>,
    ) -> Self {
        Self {
            location: location.to_string(),
            dir: dir.into(),
            readonly,
            settings,
            next,
            runtime: RwLock::new(None),
            cache: Arc::new(MetaCache::new()),
            observers: Arc::new(Observers::new()),
            threads: ThreadCounter::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn settings(&self) -> &DirSettings {
        &self.settings
    }

    /// Number of background threads still running. Zero after `stop` returned.
    pub fn live_threads(&self) -> usize {
        self.threads.live()
    }

    /// Is the OS watcher active? Only meaningful while started.
    pub fn is_watching(&self) -> bool {
        self.runtime
            .read()
            .as_ref()
            .is_some_and(|rt| rt.watch.is_watching())
    }

    fn next_ref(&self) -> Option<&dyn Place> {
        self.next.as_deref()
    }

    /// Handles of the running index and pool, cloned so no lock is held while waiting.
    fn runtime(&self) -> Result<(DirIndex, WorkerPool)> {
        self.runtime
            .read()
            .as_ref()
            .map(|rt| (rt.index.clone(), rt.pool.clone()))
            .ok_or(PlaceError::Stopped)
    }

    /// Entry of a zettel stored in this directory. Reserved identifiers do not count.
    fn local_entry(&self, index: &DirIndex, zid: Zid) -> Result<Option<Entry>> {
        let entry = index.entry(zid)?;
        if entry.is_valid() && entry.meta_spec != MetaSpec::Unknown {
            Ok(Some(entry))
        } else {
            Ok(None)
        }
    }

    /// Reserve an identifier that no place of the chain uses.
    fn reserve_zid(&self, ctx: &Context, index: &DirIndex) -> Result<Zid> {
        let mut skipped = Vec::new();
        let zid = loop {
            let zid = index.new_entry()?.zid;
            if !next_has_zettel(ctx, self.next_ref(), zid) {
                break zid;
            }
            // Keep the reservation until the loop ends so it is not handed out again.
            skipped.push(zid);
        };
        for zid in skipped {
            index.delete_entry(zid)?;
        }
        Ok(zid)
    }

    fn has_local(&self, zid: Zid) -> Result<bool> {
        let (index, _) = self.runtime()?;
        Ok(self.local_entry(&index, zid)?.is_some())
    }

    fn read_meta(&self, ctx: &Context, pool: &WorkerPool, entry: Entry) -> Result<Meta> {
        if let Some(meta) = self.cache.get(entry.zid) {
            return Ok(meta);
        }
        ctx.check()?;
        let generation = self.cache.generation();
        let meta = pool.get_meta(entry)?;
        self.cache.insert(generation, meta.clone());
        Ok(meta)
    }

    /// Metadata of all stored entries, read through the cache. Misses are read in parallel.
    fn all_metas(&self, ctx: &Context, index: &DirIndex, pool: &WorkerPool) -> Result<Vec<Meta>> {
        let mut metas = Vec::new();
        let mut missing = Vec::new();
        for entry in index.entries()? {
            if entry.meta_spec == MetaSpec::Unknown {
                continue;
            }
            match self.cache.get(entry.zid) {
                Some(meta) => metas.push(meta),
                None => missing.push(entry),
            }
        }
        if missing.is_empty() {
            return Ok(metas);
        }
        ctx.check()?;
        let generation = self.cache.generation();
        let pending = missing
            .into_iter()
            .map(|entry| {
                let zid = entry.zid;
                pool.request_meta(entry).map(|rx| (zid, rx))
            })
            .collect::<Result<Vec<_>>>()?;
        for (zid, rx) in pending {
            match worker::wait(rx) {
                Ok(meta) => {
                    self.cache.insert(generation, meta.clone());
                    metas.push(meta);
                }
                // Removed between listing and reading.
                Err(PlaceError::UnknownId(_)) => {}
                Err(PlaceError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {}
                Err(PlaceError::Io(err)) => {
                    warn!(
                        zid = %zid,
                        location = %self.location,
                        error = %err,
                        "Skipping unreadable zettel"
                    );
                }
                Err(err) => return Err(err),
            }
        }
        Ok(metas)
    }
}

impl Place for DirPlace {
    fn next(&self) -> Option<&dyn Place> {
        self.next_ref()
    }

    fn location(&self) -> String {
        self.location.clone()
    }

    fn start(&self, _ctx: &Context) -> Result<()> {
        let mut guard = self.runtime.write();
        if guard.is_some() {
            return Err(PlaceError::AlreadyStarted);
        }
        let (index, index_thread) = DirIndex::start(&self.dir, &self.threads)?;
        let cache = Arc::clone(&self.cache);
        let observers = Arc::clone(&self.observers);
        index.subscribe(Arc::new(move |info: ChangeInfo| {
            cache.invalidate(info);
            observers.notify(info);
        }));
        let (pool, pool_threads) = match WorkerPool::start(self.settings.workers, &self.threads) {
            Ok(started) => started,
            Err(err) => {
                index_thread.stop();
                return Err(err);
            }
        };
        let watch = match DirWatch::start(&self.dir, index.clone(), &self.settings, &self.threads)
        {
            Ok(watch) => watch,
            Err(err) => {
                index_thread.stop();
                pool_threads.stop();
                return Err(err);
            }
        };
        self.cache.clear();
        *guard = Some(DirRuntime {
            index,
            index_thread,
            pool,
            pool_threads,
            watch,
        });
        info!(
            location = %self.location,
            workers = self.settings.workers,
            readonly = self.readonly,
            "Directory place started"
        );
        Ok(())
    }

    fn stop(&self, _ctx: &Context) -> Result<()> {
        let runtime = self.runtime.write().take();
        if let Some(runtime) = runtime {
            runtime.stop();
            self.cache.clear();
            info!(location = %self.location, "Directory place stopped");
        }
        Ok(())
    }

    fn can_create_zettel(&self, _ctx: &Context) -> bool {
        !self.readonly && self.runtime.read().is_some()
    }

    fn create_zettel(&self, ctx: &Context, zettel: Zettel) -> Result<Zid> {
        if self.readonly {
            return Err(PlaceError::ReadOnly);
        }
        let (index, pool) = self.runtime()?;
        ctx.check()?;
        let zid = self.reserve_zid(ctx, &index)?;
        let zettel = zettel.with_zid(zid);
        let entry = Entry::for_meta(&self.dir, &zettel.meta);
        if let Err(err) = pool.set_zettel(entry.clone(), zettel, Vec::new()) {
            if let Err(cleanup) = index.delete_entry(zid) {
                warn!(zid = %zid, error = %cleanup, "Cannot release reserved identifier");
            }
            return Err(err);
        }
        index.update_entry(entry)?;
        debug!(zid = %zid, location = %self.location, "Created zettel");
        Ok(zid)
    }

    fn get_zettel(&self, ctx: &Context, zid: Zid) -> Result<Zettel> {
        let (index, pool) = self.runtime()?;
        let Some(entry) = self.local_entry(&index, zid)? else {
            return next_get_zettel(ctx, self.next_ref(), zid);
        };
        ctx.check()?;
        let generation = self.cache.generation();
        let (meta, content) = pool.get_meta_content(entry)?;
        self.cache.insert(generation, meta.clone());
        Ok(Zettel::new(meta, content))
    }

    fn get_meta(&self, ctx: &Context, zid: Zid) -> Result<Meta> {
        let (index, pool) = self.runtime()?;
        match self.local_entry(&index, zid)? {
            Some(entry) => self.read_meta(ctx, &pool, entry),
            None => next_get_meta(ctx, self.next_ref(), zid),
        }
    }

    fn select_meta(
        &self,
        ctx: &Context,
        filter: Option<&Filter>,
        sorter: Option<&Sorter>,
    ) -> Result<Vec<Meta>> {
        let (index, pool) = self.runtime()?;
        let matches = create_filter_func(filter);
        let local = self
            .all_metas(ctx, &index, &pool)?
            .into_iter()
            .filter(|m| matches(m))
            .collect();
        select_chain(ctx, local, self.next_ref(), filter, sorter)
    }

    fn can_update_zettel(&self, _ctx: &Context, zettel: &Zettel) -> bool {
        !self.readonly && zettel.zid().is_valid() && self.runtime.read().is_some()
    }

    fn update_zettel(&self, ctx: &Context, zettel: Zettel) -> Result<()> {
        let zid = zettel.zid();
        if !zid.is_valid() {
            return Err(PlaceError::InvalidId(zid));
        }
        if self.readonly {
            return Err(PlaceError::ReadOnly);
        }
        let (index, pool) = self.runtime()?;
        ctx.check()?;
        let entry = Entry::for_meta(&self.dir, &zettel.meta);
        let obsolete = match self.local_entry(&index, zid)? {
            Some(old) => old.obsolete_paths(&entry),
            None => Vec::new(),
        };
        pool.set_zettel(entry.clone(), zettel, obsolete)?;
        index.update_entry(entry)?;
        debug!(zid = %zid, location = %self.location, "Updated zettel");
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
        let (index, pool) = self.runtime()?;
        if self.local_entry(&index, cur_zid)?.is_none() {
            if index.entry(new_zid)?.is_valid() {
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
        ctx.check()?;
        let (old, new) = index.rename_entry(cur_zid, new_zid)?;
        if let Err(err) = pool.rename_zettel(old.clone(), new) {
            // Best effort: put the old entry back so the index matches the files again.
            let rollback = index
                .delete_entry(new_zid)
                .and_then(|()| index.update_entry(old));
            if let Err(rollback) = rollback {
                warn!(zid = %cur_zid, error = %rollback, "Cannot roll back rename");
            }
            return Err(err);
        }
        debug!(from = %cur_zid, to = %new_zid, location = %self.location, "Renamed zettel");
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
        let (index, pool) = self.runtime()?;
        let Some(entry) = self.local_entry(&index, zid)? else {
            return next_delete_zettel(ctx, self.next_ref(), zid);
        };
        if self.readonly {
            return Err(PlaceError::ReadOnly);
        }
        ctx.check()?;
        pool.delete_zettel(entry)?;
        index.delete_entry(zid)?;
        debug!(zid = %zid, location = %self.location, "Deleted zettel");
        Ok(())
    }

    fn register_change_observer(&self, observer: ChangeObserver) {
        self.observers.register(observer.clone());
        if let Some(next) = self.next_ref() {
            next.register_change_observer(observer);
        }
    }

    fn reload(&self, ctx: &Context) -> Result<()> {
        let (index, _) = self.runtime()?;
        ctx.check()?;
        index.rescan()?;
        next_reload(ctx, self.next_ref())
    }
}

impl Drop for DirPlace {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.get_mut().take() {
            runtime.stop();
        }
    }
}
