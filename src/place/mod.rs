//! Places
//!
//! A place stores zettel. Places form a chain: every place may own a next place that it
//! falls back to when a zettel is not found locally. Lists are merged across the chain, so
//! the head of the chain sees the union of all places, with the head's version winning
//! for identifiers present in several places.

pub mod constant;
pub mod dir;
pub mod filter;
pub mod manager;
pub mod memory;
pub mod merge;
pub mod policy_place;
pub mod progplace;
pub mod registry;

pub use filter::{Filter, Sorter};

use crate::error::PlaceError;
use crate::zettel::{Meta, Zettel, Zid};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub type Result<T> = std::result::Result<T, PlaceError>;

/// Per-request context: the acting user and a cancellation flag.
///
/// Cancellation is cooperative. It prevents new work from being submitted; file I/O that
/// is already running completes and its result is discarded.
#[derive(Debug, Clone, Default)]
pub struct Context {
    user: Option<Meta>,
    cancelled: Arc<AtomicBool>,
}

impl Context {
    /// Context without an acting user
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_user(user: Meta) -> Self {
        Self {
            user: Some(user),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn user(&self) -> Option<&Meta> {
        self.user.as_ref()
    }

    /// Cancel this context and every clone of it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(PlaceError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Why observers are notified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeReason {
    /// Everything may have changed
    Reload,
    /// A zettel was created or updated
    Update,
    /// A zettel was deleted
    Delete,
}

/// A change notification. `zid` is `Zid::INVALID` for changes that affect all zettel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeInfo {
    pub reason: ChangeReason,
    pub zid: Zid,
}

impl ChangeInfo {
    pub fn new(reason: ChangeReason, zid: Zid) -> Self {
        Self { reason, zid }
    }

    pub fn reload() -> Self {
        Self::new(ChangeReason::Reload, Zid::INVALID)
    }

    pub fn is_broadcast(&self) -> bool {
        self.zid == Zid::INVALID
    }
}

pub type ChangeObserver = Arc<dyn Fn(ChangeInfo) + Send + Sync>;

/// Storage of zettel, one link of a place chain.
///
/// Every operation except `next`, `location` and observer registration fails with
/// `PlaceError::Stopped` outside of `start`/`stop`.
pub trait Place: Send + Sync {
    /// Next place of the chain, `None` for the terminal place.
    fn next(&self) -> Option<&dyn Place>;

    /// Diagnostic description, usually the connection URI.
    fn location(&self) -> String;

    fn start(&self, ctx: &Context) -> Result<()>;
    fn stop(&self, ctx: &Context) -> Result<()>;

    fn can_create_zettel(&self, ctx: &Context) -> bool;

    /// Store a new zettel under a fresh identifier and return that identifier.
    fn create_zettel(&self, ctx: &Context, zettel: Zettel) -> Result<Zid>;

    fn get_zettel(&self, ctx: &Context, zid: Zid) -> Result<Zettel>;
    fn get_meta(&self, ctx: &Context, zid: Zid) -> Result<Meta>;

    /// Metadata of all zettel matching the filter, ordered by the sorter.
    fn select_meta(
        &self,
        ctx: &Context,
        filter: Option<&Filter>,
        sorter: Option<&Sorter>,
    ) -> Result<Vec<Meta>>;

    fn can_update_zettel(&self, ctx: &Context, zettel: &Zettel) -> bool;
    fn update_zettel(&self, ctx: &Context, zettel: Zettel) -> Result<()>;

    fn can_rename_zettel(&self, ctx: &Context, zid: Zid) -> bool;

    /// Give a zettel another identifier. Fails if `new_zid` is used anywhere in the chain.
    fn rename_zettel(&self, ctx: &Context, cur_zid: Zid, new_zid: Zid) -> Result<()>;

    fn can_delete_zettel(&self, ctx: &Context, zid: Zid) -> bool;
    fn delete_zettel(&self, ctx: &Context, zid: Zid) -> Result<()>;

    /// Register an observer with this place and every place after it.
    fn register_change_observer(&self, observer: ChangeObserver);

    /// Resynchronize with the backing store, down the whole chain.
    fn reload(&self, ctx: &Context) -> Result<()>;
}

/// Change observers registered with one place.
#[derive(Default)]
pub struct Observers {
    observers: RwLock<Vec<ChangeObserver>>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, observer: ChangeObserver) {
        self.observers.write().push(observer);
    }

    pub fn notify(&self, info: ChangeInfo) {
        let observers = self.observers.read().clone();
        for observer in observers {
            observer(info);
        }
    }
}

/// Started/stopped state of places without background resources.
#[derive(Debug, Default)]
pub struct Lifecycle {
    started: AtomicBool,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(PlaceError::AlreadyStarted);
        }
        Ok(())
    }

    pub fn stop(&self) {
        self.started.store(false, Ordering::SeqCst);
    }

    pub fn check(&self) -> Result<()> {
        if self.started.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(PlaceError::Stopped)
        }
    }
}

/// Sort metadata by descending identifier, the native order of every place.
pub fn sort_by_zid(metas: &mut [Meta]) {
    metas.sort_unstable_by(|a, b| b.zid().cmp(&a.zid()));
}

/// Combine the local, already filtered, selection with the next place's and sort the result.
pub fn select_chain(
    ctx: &Context,
    mut local: Vec<Meta>,
    next: Option<&dyn Place>,
    filter: Option<&Filter>,
    sorter: Option<&Sorter>,
) -> Result<Vec<Meta>> {
    sort_by_zid(&mut local);
    let merged = match next {
        Some(next) => merge::merge_sorted(local, next.select_meta(ctx, filter, None)?),
        None => local,
    };
    Ok(filter::apply_sorter(merged, sorter))
}

/// Ask the next place, or report the zettel as unknown at the end of the chain.
pub fn next_get_zettel(ctx: &Context, next: Option<&dyn Place>, zid: Zid) -> Result<Zettel> {
    match next {
        Some(next) => next.get_zettel(ctx, zid),
        None => Err(PlaceError::UnknownId(zid)),
    }
}

pub fn next_get_meta(ctx: &Context, next: Option<&dyn Place>, zid: Zid) -> Result<Meta> {
    match next {
        Some(next) => next.get_meta(ctx, zid),
        None => Err(PlaceError::UnknownId(zid)),
    }
}

/// Is the identifier used by the next place or any place after it?
pub fn next_has_zettel(ctx: &Context, next: Option<&dyn Place>, zid: Zid) -> bool {
    next_get_meta(ctx, next, zid).is_ok()
}

pub fn next_rename_zettel(
    ctx: &Context,
    next: Option<&dyn Place>,
    cur_zid: Zid,
    new_zid: Zid,
) -> Result<()> {
    match next {
        Some(next) => next.rename_zettel(ctx, cur_zid, new_zid),
        None => Err(PlaceError::UnknownId(cur_zid)),
    }
}

pub fn next_delete_zettel(ctx: &Context, next: Option<&dyn Place>, zid: Zid) -> Result<()> {
    match next {
        Some(next) => next.delete_zettel(ctx, zid),
        None => Err(PlaceError::UnknownId(zid)),
    }
}

pub fn next_reload(ctx: &Context, next: Option<&dyn Place>) -> Result<()> {
    match next {
        Some(next) => next.reload(ctx),
        None => Ok(()),
    }
}

/// Locations of a place and all places after it, head first.
pub fn chain_locations(place: &dyn Place) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = Some(place);
    while let Some(p) = current {
        result.push(p.location());
        current = p.next();
    }
    result
}
