//! Authentication layer used when no owner is configured.
//!
//! There are no users, so the only restriction beyond the base layer is that expert
//! zettel stay hidden unless expert mode is on.

use super::{Authz, PolicyLayer};
use crate::zettel::keys::Visibility;
use crate::zettel::Meta;
use std::sync::Arc;

pub(super) struct AnonPolicy {
    authz: Arc<Authz>,
    base: Box<dyn PolicyLayer>,
}

impl AnonPolicy {
    pub(super) fn new(authz: Arc<Authz>, base: Box<dyn PolicyLayer>) -> Self {
        Self { authz, base }
    }

    fn check_visibility(&self, meta: &Meta) -> bool {
        self.authz.visibility(meta) != Visibility::Expert || self.authz.expert_mode()
    }
}

impl PolicyLayer for AnonPolicy {
    fn can_reload(&self, user: Option<&Meta>) -> bool {
        self.base.can_reload(user)
    }

    fn can_create(&self, user: Option<&Meta>, new_meta: &Meta) -> bool {
        self.base.can_create(user, new_meta)
    }

    fn can_read(&self, user: Option<&Meta>, meta: &Meta) -> bool {
        self.base.can_read(user, meta) && self.check_visibility(meta)
    }

    fn can_write(&self, user: Option<&Meta>, old_meta: &Meta, new_meta: &Meta) -> bool {
        self.base.can_write(user, old_meta, new_meta) && self.check_visibility(old_meta)
    }

    fn can_rename(&self, user: Option<&Meta>, meta: &Meta) -> bool {
        self.base.can_rename(user, meta) && self.check_visibility(meta)
    }

    fn can_delete(&self, user: Option<&Meta>, meta: &Meta) -> bool {
        self.base.can_delete(user, meta) && self.check_visibility(meta)
    }
}
