//! Base layer for a read-only store.

use super::PolicyLayer;
use crate::zettel::Meta;

pub(super) struct ReadOnlyPolicy;

impl PolicyLayer for ReadOnlyPolicy {
    fn can_reload(&self, _user: Option<&Meta>) -> bool {
        true
    }

    fn can_create(&self, _user: Option<&Meta>, _new_meta: &Meta) -> bool {
        false
    }

    fn can_read(&self, _user: Option<&Meta>, _meta: &Meta) -> bool {
        true
    }

    fn can_write(&self, _user: Option<&Meta>, _old_meta: &Meta, _new_meta: &Meta) -> bool {
        false
    }

    fn can_rename(&self, _user: Option<&Meta>, _meta: &Meta) -> bool {
        false
    }

    fn can_delete(&self, _user: Option<&Meta>, _meta: &Meta) -> bool {
        false
    }
}
