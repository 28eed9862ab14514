//! Pre-validation layer: rejects requests with missing metadata before any other rule runs.

use super::{Policy, PolicyLayer};
use crate::zettel::Meta;

pub(super) struct PrePolicy {
    inner: Box<dyn PolicyLayer>,
}

impl PrePolicy {
    pub(super) fn new(inner: Box<dyn PolicyLayer>) -> Self {
        Self { inner }
    }
}

impl Policy for PrePolicy {
    fn can_reload(&self, user: Option<&Meta>) -> bool {
        self.inner.can_reload(user)
    }

    fn can_create(&self, user: Option<&Meta>, new_meta: Option<&Meta>) -> bool {
        new_meta.is_some_and(|m| self.inner.can_create(user, m))
    }

    fn can_read(&self, user: Option<&Meta>, meta: Option<&Meta>) -> bool {
        meta.is_some_and(|m| self.inner.can_read(user, m))
    }

    fn can_write(&self, user: Option<&Meta>, old_meta: Option<&Meta>, new_meta: Option<&Meta>) -> bool {
        match (old_meta, new_meta) {
            (Some(old), Some(new)) if old.zid() == new.zid() => {
                self.inner.can_write(user, old, new)
            }
            _ => false,
        }
    }

    fn can_rename(&self, user: Option<&Meta>, meta: Option<&Meta>) -> bool {
        meta.is_some_and(|m| self.inner.can_rename(user, m))
    }

    fn can_delete(&self, user: Option<&Meta>, meta: Option<&Meta>) -> bool {
        meta.is_some_and(|m| self.inner.can_delete(user, m))
    }
}
