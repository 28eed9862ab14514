//! Base layer for a writable store.
//!
//! Everything is allowed except modifying a zettel whose `read-only` key forbids it for the
//! acting user. The key may name a role (`reader`, `writer`, `owner`), in which case only
//! users with a strictly higher role may change the zettel, or hold a boolean.

use super::{Authz, PolicyLayer};
use crate::zettel::keys::{bool_value, UserRole, KEY_READ_ONLY};
use crate::zettel::Meta;
use std::sync::Arc;

pub(super) struct DefaultPolicy {
    authz: Arc<Authz>,
}

impl DefaultPolicy {
    pub(super) fn new(authz: Arc<Authz>) -> Self {
        Self { authz }
    }

    fn can_change(&self, user: Option<&Meta>, meta: &Meta) -> bool {
        let Some(read_only) = meta.get(KEY_READ_ONLY) else {
            return true;
        };
        let role = self.authz.user_role(user);
        match UserRole::parse(read_only) {
            UserRole::Unknown => !bool_value(read_only),
            restricted => role > restricted,
        }
    }
}

impl PolicyLayer for DefaultPolicy {
    fn can_reload(&self, _user: Option<&Meta>) -> bool {
        true
    }

    fn can_create(&self, _user: Option<&Meta>, _new_meta: &Meta) -> bool {
        true
    }

    fn can_read(&self, _user: Option<&Meta>, _meta: &Meta) -> bool {
        true
    }

    fn can_write(&self, user: Option<&Meta>, old_meta: &Meta, _new_meta: &Meta) -> bool {
        self.can_change(user, old_meta)
    }

    fn can_rename(&self, user: Option<&Meta>, meta: &Meta) -> bool {
        self.can_change(user, meta)
    }

    fn can_delete(&self, user: Option<&Meta>, meta: &Meta) -> bool {
        self.can_change(user, meta)
    }
}
