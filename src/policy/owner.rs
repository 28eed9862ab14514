//! Authentication layer used when an owner is configured.
//!
//! The owner may do everything the base layer allows. Other users are limited by the
//! visibility of a zettel and by their `user-role`: readers only read, writers may also
//! create and change zettel, but never user zettel of other users and never the
//! identity-related keys of their own user zettel.

use super::{Authz, PolicyLayer};
use crate::zettel::keys::{
    UserRole, Visibility, KEY_ROLE, KEY_USER_ID, KEY_USER_ROLE, ROLE_USER,
};
use crate::zettel::Meta;
use std::sync::Arc;

/// Keys a user must not change on their own user zettel
const PROTECTED_USER_KEYS: [&str; 3] = [KEY_ROLE, KEY_USER_ID, KEY_USER_ROLE];

pub(super) struct OwnerPolicy {
    authz: Arc<Authz>,
    base: Box<dyn PolicyLayer>,
}

impl OwnerPolicy {
    pub(super) fn new(authz: Arc<Authz>, base: Box<dyn PolicyLayer>) -> Self {
        Self { authz, base }
    }

    /// Decision forced by the visibility alone, if any.
    fn check_visibility(&self, user: Option<&Meta>, visibility: Visibility) -> Option<bool> {
        if visibility == Visibility::Expert {
            return Some(self.authz.user_is_owner(user) && self.authz.expert_mode());
        }
        None
    }

    fn user_can_read(&self, user: Option<&Meta>, meta: &Meta, visibility: Visibility) -> bool {
        match visibility {
            Visibility::Owner | Visibility::Expert => false,
            Visibility::Public => true,
            Visibility::Login => match user {
                None => false,
                Some(user) if is_user_zettel(meta) => user.zid() == meta.zid(),
                Some(_) => true,
            },
        }
    }

    fn user_can_create(&self, user: &Meta, new_meta: &Meta) -> bool {
        self.authz.user_role(Some(user)) != UserRole::Reader && !is_user_zettel(new_meta)
    }
}

fn is_user_zettel(meta: &Meta) -> bool {
    meta.get(KEY_ROLE).map(str::trim) == Some(ROLE_USER)
}

impl PolicyLayer for OwnerPolicy {
    fn can_reload(&self, user: Option<&Meta>) -> bool {
        self.authz.user_is_owner(user)
    }

    fn can_create(&self, user: Option<&Meta>, new_meta: &Meta) -> bool {
        let Some(u) = user else {
            return false;
        };
        if !self.base.can_create(user, new_meta) {
            return false;
        }
        self.authz.user_is_owner(user) || self.user_can_create(u, new_meta)
    }

    fn can_read(&self, user: Option<&Meta>, meta: &Meta) -> bool {
        if !self.base.can_read(user, meta) {
            return false;
        }
        let visibility = self.authz.visibility(meta);
        if let Some(decision) = self.check_visibility(user, visibility) {
            return decision;
        }
        self.authz.user_is_owner(user) || self.user_can_read(user, meta, visibility)
    }

    fn can_write(&self, user: Option<&Meta>, old_meta: &Meta, new_meta: &Meta) -> bool {
        let Some(u) = user else {
            return false;
        };
        if !self.base.can_write(user, old_meta, new_meta) {
            return false;
        }
        let visibility = self.authz.visibility(old_meta);
        if let Some(decision) = self.check_visibility(user, visibility) {
            return decision;
        }
        if self.authz.user_is_owner(user) {
            return true;
        }
        if !self.user_can_read(user, old_meta, visibility) {
            return false;
        }
        if is_user_zettel(old_meta) {
            // Users may edit their own user zettel, but not who they are.
            if u.zid() != old_meta.zid() {
                return false;
            }
            return PROTECTED_USER_KEYS
                .iter()
                .all(|key| old_meta.get(key) == new_meta.get(key));
        }
        if self.authz.user_role(user) == UserRole::Reader {
            return false;
        }
        self.user_can_create(u, new_meta)
    }

    fn can_rename(&self, user: Option<&Meta>, meta: &Meta) -> bool {
        self.owner_only(user, meta, self.base.can_rename(user, meta))
    }

    fn can_delete(&self, user: Option<&Meta>, meta: &Meta) -> bool {
        self.owner_only(user, meta, self.base.can_delete(user, meta))
    }
}

impl OwnerPolicy {
    fn owner_only(&self, user: Option<&Meta>, meta: &Meta, base_allows: bool) -> bool {
        if user.is_none() || !base_allows {
            return false;
        }
        if let Some(decision) = self.check_visibility(user, self.authz.visibility(meta)) {
            return decision;
        }
        self.authz.user_is_owner(user)
    }
}
