//! Decision table for the layered policy
//!
//! Unless stated otherwise: authentication enabled, store writable, expert mode off.

use crate::integration::test_utils::zid;
use std::sync::Arc;
use zettelstore::policy::{new_policy, Policy, PolicyConfig};
use zettelstore::zettel::keys::{
    Visibility, KEY_READ_ONLY, KEY_ROLE, KEY_TITLE, KEY_USER_ID, KEY_USER_ROLE, KEY_VISIBILITY,
    ROLE_USER,
};
use zettelstore::zettel::Meta;

const OWNER: u64 = 20200101000000;
const WRITER: u64 = 20200101000001;
const READER: u64 = 20200101000002;
const TARGET: u64 = 20220101000000;

fn policy(with_auth: bool, readonly: bool, expert_mode: bool) -> Arc<dyn Policy> {
    new_policy(&PolicyConfig {
        owner: with_auth.then(|| zid(OWNER)),
        readonly,
        expert_mode,
        default_visibility: Visibility::Login,
    })
}

fn user(n: u64, role: &str) -> Meta {
    Meta::builder(zid(n))
        .with(KEY_ROLE, ROLE_USER)
        .with(KEY_USER_ID, &format!("user{}", n))
        .with(KEY_USER_ROLE, role)
        .build()
}

fn owner() -> Meta {
    user(OWNER, "owner")
}

fn target(pairs: &[(&str, &str)]) -> Meta {
    let mut builder = Meta::builder(zid(TARGET)).with(KEY_TITLE, "Target");
    for (key, value) in pairs {
        builder.set(key, value);
    }
    builder.build()
}

#[test]
fn test_a_owner_cannot_read_expert_zettel_without_expert_mode() {
    let pol = policy(true, false, false);
    let expert = target(&[(KEY_VISIBILITY, "expert")]);
    assert!(!pol.can_read(Some(&owner()), Some(&expert)));
}

#[test]
fn test_b_owner_reads_expert_zettel_in_expert_mode() {
    let pol = policy(true, false, true);
    let expert = target(&[(KEY_VISIBILITY, "expert")]);
    assert!(pol.can_read(Some(&owner()), Some(&expert)));
    assert!(!pol.can_read(Some(&user(WRITER, "writer")), Some(&expert)));
}

#[test]
fn test_c_reader_cannot_create() {
    let pol = policy(true, false, false);
    let new = target(&[]);
    assert!(!pol.can_create(Some(&user(READER, "reader")), Some(&new)));
    assert!(pol.can_create(Some(&user(WRITER, "writer")), Some(&new)));
}

#[test]
fn test_d_writer_edits_own_user_zettel_except_protected_keys() {
    let pol = policy(true, false, false);
    let me = user(WRITER, "writer");

    let promoted = me.to_builder().with(KEY_USER_ROLE, "owner").build();
    assert!(!pol.can_write(Some(&me), Some(&me), Some(&promoted)));

    let retitled = me.to_builder().with(KEY_TITLE, "My profile").build();
    assert!(pol.can_write(Some(&me), Some(&me), Some(&retitled)));

    let other = user(READER, "reader");
    let retitled_other = other.to_builder().with(KEY_TITLE, "Not mine").build();
    assert!(!pol.can_write(Some(&me), Some(&other), Some(&retitled_other)));

    let public_other = other.to_builder().with(KEY_VISIBILITY, "public").build();
    let retitled_public = public_other.to_builder().with(KEY_TITLE, "Not mine").build();
    assert!(pol.can_read(Some(&me), Some(&public_other)));
    assert!(!pol.can_write(Some(&me), Some(&public_other), Some(&retitled_public)));
    assert!(pol.can_write(Some(&owner()), Some(&public_other), Some(&retitled_public)));
}

#[test]
fn test_e_anonymous_login_visibility_depends_on_authentication() {
    let login = target(&[(KEY_VISIBILITY, "login")]);
    assert!(!policy(true, false, false).can_read(None, Some(&login)));
    assert!(policy(false, false, false).can_read(None, Some(&login)));
}

#[test]
fn test_pre_validation_applies_to_the_owner() {
    let pol = policy(true, false, true);
    let old = target(&[]);
    let moved = old.with_zid(zid(TARGET + 1));
    assert!(!pol.can_write(Some(&owner()), Some(&old), Some(&moved)));
    assert!(!pol.can_read(Some(&owner()), None));
    assert!(pol.can_write(Some(&owner()), Some(&old), Some(&old)));
}

#[test]
fn test_read_only_key_vetoes_role_rules() {
    let pol = policy(true, false, false);
    let writer = user(WRITER, "writer");
    let guarded = target(&[(KEY_READ_ONLY, "writer")]);
    let edited = guarded.to_builder().with(KEY_TITLE, "Edited").build();

    assert!(!pol.can_write(Some(&writer), Some(&guarded), Some(&edited)));
    assert!(pol.can_write(Some(&owner()), Some(&guarded), Some(&edited)));

    let owner_role = user(20200101000003, "owner");
    assert!(!pol.can_delete(Some(&writer), Some(&guarded)));
    assert!(pol.can_delete(Some(&owner_role), Some(&guarded)));
    assert!(!pol.can_rename(Some(&writer), Some(&guarded)));
    assert!(pol.can_rename(Some(&owner_role), Some(&guarded)));

    let frozen = target(&[(KEY_READ_ONLY, "true")]);
    let edited = frozen.to_builder().with(KEY_TITLE, "Edited").build();
    assert!(!pol.can_write(Some(&owner()), Some(&frozen), Some(&edited)));
    assert!(!pol.can_delete(Some(&owner()), Some(&frozen)));
    assert!(pol.can_read(Some(&writer), Some(&frozen)));
}

#[test]
fn test_read_only_store_denies_every_mutation() {
    for with_auth in [false, true] {
        let pol = policy(with_auth, true, true);
        let public = target(&[(KEY_VISIBILITY, "public")]);
        let edited = public.to_builder().with(KEY_TITLE, "Edited").build();
        assert!(pol.can_read(Some(&owner()), Some(&public)));
        assert!(!pol.can_create(Some(&owner()), Some(&public)));
        assert!(!pol.can_write(Some(&owner()), Some(&public), Some(&edited)));
        assert!(!pol.can_rename(Some(&owner()), Some(&public)));
        assert!(!pol.can_delete(Some(&owner()), Some(&public)));
        assert!(pol.can_reload(Some(&owner())));
    }
}

#[test]
fn test_without_authentication_everybody_acts_as_owner() {
    let pol = policy(false, false, false);
    let owner_only = target(&[(KEY_VISIBILITY, "owner")]);
    assert!(pol.can_read(None, Some(&owner_only)));
    assert!(pol.can_delete(None, Some(&owner_only)));
    assert!(pol.can_reload(None));

    let guarded = target(&[(KEY_READ_ONLY, "writer")]);
    assert!(pol.can_delete(None, Some(&guarded)));
    let frozen = target(&[(KEY_READ_ONLY, "owner")]);
    assert!(!pol.can_delete(None, Some(&frozen)));
}
