//! Authorization Policy
//!
//! Decides whether an acting user may reload, create, read, write, rename or delete a
//! zettel. A policy is a stack of layers, evaluated outer to inner:
//!
//! 1. pre-validation: rejects missing metadata and mismatching identifiers
//! 2. authentication: owner-based rules when an owner is configured, anonymous rules otherwise
//! 3. base: read-only store, or the default rules including the per-zettel `read-only` key
//!
//! Decisions are pure functions of the acting user and the target metadata. Nothing is
//! cached between calls.

mod anon;
mod default;
mod owner;
mod pre;
mod readonly;

use crate::zettel::keys::{UserRole, Visibility, KEY_USER_ROLE, KEY_VISIBILITY};
use crate::zettel::{Meta, Zid};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Access decisions for place operations.
///
/// `None` stands for "no acting user" (for `user`) or "missing metadata" (for the targets).
pub trait Policy: Send + Sync {
    fn can_reload(&self, user: Option<&Meta>) -> bool;
    fn can_create(&self, user: Option<&Meta>, new_meta: Option<&Meta>) -> bool;
    fn can_read(&self, user: Option<&Meta>, meta: Option<&Meta>) -> bool;
    fn can_write(&self, user: Option<&Meta>, old_meta: Option<&Meta>, new_meta: Option<&Meta>) -> bool;
    fn can_rename(&self, user: Option<&Meta>, meta: Option<&Meta>) -> bool;
    fn can_delete(&self, user: Option<&Meta>, meta: Option<&Meta>) -> bool;
}

/// Inner policy layer. Only reachable through the pre-validation layer, so targets are
/// always present and write targets share one identifier.
trait PolicyLayer: Send + Sync {
    fn can_reload(&self, user: Option<&Meta>) -> bool;
    fn can_create(&self, user: Option<&Meta>, new_meta: &Meta) -> bool;
    fn can_read(&self, user: Option<&Meta>, meta: &Meta) -> bool;
    fn can_write(&self, user: Option<&Meta>, old_meta: &Meta, new_meta: &Meta) -> bool;
    fn can_rename(&self, user: Option<&Meta>, meta: &Meta) -> bool;
    fn can_delete(&self, user: Option<&Meta>, meta: &Meta) -> bool;
}

/// Settings that determine the policy stack
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Zettel identifier of the owner. Authentication is enabled iff an owner is set.
    pub owner: Option<Zid>,
    /// The whole store rejects modifications.
    pub readonly: bool,
    /// Expert-visibility zettel are accessible.
    pub expert_mode: bool,
    /// Visibility of zettel without a `visibility` key.
    pub default_visibility: Visibility,
}

impl PolicyConfig {
    pub fn with_auth(&self) -> bool {
        self.owner.is_some()
    }
}

/// Facts about users and zettel shared by all layers.
#[derive(Debug, Clone)]
struct Authz {
    config: PolicyConfig,
}

impl Authz {
    fn is_owner(&self, zid: Zid) -> bool {
        self.config.owner == Some(zid)
    }

    fn with_auth(&self) -> bool {
        self.config.with_auth()
    }

    fn expert_mode(&self) -> bool {
        self.config.expert_mode
    }

    /// Role of the acting user. Without authentication everybody acts as the owner.
    fn user_role(&self, user: Option<&Meta>) -> UserRole {
        let Some(user) = user else {
            return if self.with_auth() {
                UserRole::Unknown
            } else {
                UserRole::Owner
            };
        };
        if self.is_owner(user.zid()) {
            return UserRole::Owner;
        }
        match user.get(KEY_USER_ROLE).map(UserRole::parse) {
            Some(UserRole::Unknown) | None => UserRole::Reader,
            Some(role) => role,
        }
    }

    /// Configured owner, or a user whose `user-role` is `owner`.
    fn user_is_owner(&self, user: Option<&Meta>) -> bool {
        match user {
            None => false,
            Some(user) => {
                self.is_owner(user.zid())
                    || user.get(KEY_USER_ROLE).map(str::trim) == Some(UserRole::Owner.as_str())
            }
        }
    }

    fn visibility(&self, meta: &Meta) -> Visibility {
        meta.get(KEY_VISIBILITY)
            .and_then(Visibility::parse)
            .unwrap_or(self.config.default_visibility)
    }
}

/// Build the policy stack for the given configuration.
pub fn new_policy(config: &PolicyConfig) -> Arc<dyn Policy> {
    let authz = Arc::new(Authz {
        config: config.clone(),
    });
    let base: Box<dyn PolicyLayer> = if config.readonly {
        Box::new(readonly::ReadOnlyPolicy)
    } else {
        Box::new(default::DefaultPolicy::new(Arc::clone(&authz)))
    };
    let auth: Box<dyn PolicyLayer> = if config.with_auth() {
        Box::new(owner::OwnerPolicy::new(Arc::clone(&authz), base))
    } else {
        Box::new(anon::AnonPolicy::new(authz, base))
    };
    Arc::new(pre::PrePolicy::new(auth))
}
