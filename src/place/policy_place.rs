//! Policy-wrapped place
//!
//! Checks every operation against a [`Policy`] for the user of the request context before
//! handing it to the wrapped place. Denied operations never reach the wrapped place and
//! fail with [`PlaceError::NotAuthorized`].

use crate::error::{Operation, PlaceError};
use crate::place::filter::apply_sorter;
use crate::place::{ChangeObserver, Context, Filter, Place, Result, Sorter};
use crate::policy::Policy;
use crate::zettel::{Meta, Zettel, Zid};
use std::sync::Arc;
use tracing::warn;

pub struct PolicyPlace {
    place: Box<dyn Place>,
    policy: Arc<dyn Policy>,
}

impl PolicyPlace {
    pub fn new(place: Box<dyn Place>, policy: Arc<dyn Policy>) -> Self {
        Self { place, policy }
    }

    fn deny(&self, ctx: &Context, op: Operation, zid: Option<Zid>) -> PlaceError {
        let user = ctx.user().map(Meta::zid);
        warn!(
            op = %op,
            user = %user.map(|z| z.to_string()).unwrap_or_else(|| "anonymous".to_string()),
            zid = %zid.map(|z| z.to_string()).unwrap_or_default(),
            location = %self.place.location(),
            "Access denied"
        );
        PlaceError::not_authorized(op, user, zid)
    }

    fn check_read(&self, ctx: &Context, meta: &Meta) -> Result<()> {
        if self.policy.can_read(ctx.user(), Some(meta)) {
            Ok(())
        } else {
            Err(self.deny(ctx, Operation::Read, Some(meta.zid())))
        }
    }
}

impl Place for PolicyPlace {
    /// The wrapped place stands in for this one in the chain.
    fn next(&self) -> Option<&dyn Place> {
        self.place.next()
    }

    fn location(&self) -> String {
        self.place.location()
    }

    fn start(&self, ctx: &Context) -> Result<()> {
        self.place.start(ctx)
    }

    fn stop(&self, ctx: &Context) -> Result<()> {
        self.place.stop(ctx)
    }

    fn can_create_zettel(&self, ctx: &Context) -> bool {
        let template = Meta::new(Zid::INVALID);
        self.policy.can_create(ctx.user(), Some(&template)) && self.place.can_create_zettel(ctx)
    }

    fn create_zettel(&self, ctx: &Context, zettel: Zettel) -> Result<Zid> {
        if !self.policy.can_create(ctx.user(), Some(&zettel.meta)) {
            return Err(self.deny(ctx, Operation::Create, None));
        }
        self.place.create_zettel(ctx, zettel)
    }

    fn get_zettel(&self, ctx: &Context, zid: Zid) -> Result<Zettel> {
        let zettel = self.place.get_zettel(ctx, zid)?;
        self.check_read(ctx, &zettel.meta)?;
        Ok(zettel)
    }

    fn get_meta(&self, ctx: &Context, zid: Zid) -> Result<Meta> {
        let meta = self.place.get_meta(ctx, zid)?;
        self.check_read(ctx, &meta)?;
        Ok(meta)
    }

    fn select_meta(
        &self,
        ctx: &Context,
        filter: Option<&Filter>,
        sorter: Option<&Sorter>,
    ) -> Result<Vec<Meta>> {
        let user = ctx.user();
        let visible = self
            .place
            .select_meta(ctx, filter, None)?
            .into_iter()
            .filter(|m| self.policy.can_read(user, Some(m)))
            .collect();
        Ok(apply_sorter(visible, sorter))
    }

    fn can_update_zettel(&self, ctx: &Context, zettel: &Zettel) -> bool {
        let old = self.place.get_meta(ctx, zettel.zid()).ok();
        self.policy
            .can_write(ctx.user(), old.as_ref(), Some(&zettel.meta))
            && self.place.can_update_zettel(ctx, zettel)
    }

    fn update_zettel(&self, ctx: &Context, zettel: Zettel) -> Result<()> {
        let zid = zettel.zid();
        if !zid.is_valid() {
            return Err(PlaceError::InvalidId(zid));
        }
        let old = self.place.get_meta(ctx, zid)?;
        if !self
            .policy
            .can_write(ctx.user(), Some(&old), Some(&zettel.meta))
        {
            return Err(self.deny(ctx, Operation::Write, Some(zid)));
        }
        self.place.update_zettel(ctx, zettel)
    }

    fn can_rename_zettel(&self, ctx: &Context, zid: Zid) -> bool {
        let meta = self.place.get_meta(ctx, zid).ok();
        self.policy.can_rename(ctx.user(), meta.as_ref()) && self.place.can_rename_zettel(ctx, zid)
    }

    fn rename_zettel(&self, ctx: &Context, cur_zid: Zid, new_zid: Zid) -> Result<()> {
        let meta = self.place.get_meta(ctx, cur_zid)?;
        if !self.policy.can_rename(ctx.user(), Some(&meta)) {
            return Err(self.deny(ctx, Operation::Rename, Some(cur_zid)));
        }
        self.place.rename_zettel(ctx, cur_zid, new_zid)
    }

    fn can_delete_zettel(&self, ctx: &Context, zid: Zid) -> bool {
        let meta = self.place.get_meta(ctx, zid).ok();
        self.policy.can_delete(ctx.user(), meta.as_ref()) && self.place.can_delete_zettel(ctx, zid)
    }

    fn delete_zettel(&self, ctx: &Context, zid: Zid) -> Result<()> {
        let meta = self.place.get_meta(ctx, zid)?;
        if !self.policy.can_delete(ctx.user(), Some(&meta)) {
            return Err(self.deny(ctx, Operation::Delete, Some(zid)));
        }
        self.place.delete_zettel(ctx, zid)
    }

    fn register_change_observer(&self, observer: ChangeObserver) {
        self.place.register_change_observer(observer);
    }

    fn reload(&self, ctx: &Context) -> Result<()> {
        if !self.policy.can_reload(ctx.user()) {
            return Err(self.deny(ctx, Operation::Reload, None));
        }
        self.place.reload(ctx)
    }
}
