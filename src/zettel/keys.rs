//! Metadata keys and their types
//!
//! Well-known keys carry a type that drives filtering and sorting. Keys that are not
//! registered here are treated as plain strings.

use serde::{Deserialize, Serialize};

/// Type of a metadata value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    Bool,
    Credential,
    Id,
    IdSet,
    Number,
    String,
    TagSet,
    Timestamp,
    Url,
    Word,
    WordSet,
}

impl KeyType {
    /// All key types, in a fixed order usable as an index.
    pub const ALL: [KeyType; 11] = [
        KeyType::Bool,
        KeyType::Credential,
        KeyType::Id,
        KeyType::IdSet,
        KeyType::Number,
        KeyType::String,
        KeyType::TagSet,
        KeyType::Timestamp,
        KeyType::Url,
        KeyType::Word,
        KeyType::WordSet,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            KeyType::Bool => "Boolean",
            KeyType::Credential => "Credential",
            KeyType::Id => "Identifier",
            KeyType::IdSet => "IdentifierSet",
            KeyType::Number => "Number",
            KeyType::String => "String",
            KeyType::TagSet => "TagSet",
            KeyType::Timestamp => "Timestamp",
            KeyType::Url => "URL",
            KeyType::Word => "Word",
            KeyType::WordSet => "WordSet",
        }
    }

    /// Is a value of this type a whitespace separated set?
    pub fn is_set(self) -> bool {
        matches!(self, KeyType::IdSet | KeyType::TagSet | KeyType::WordSet)
    }
}

pub const KEY_ID: &str = "id";
pub const KEY_TITLE: &str = "title";
pub const KEY_ROLE: &str = "role";
pub const KEY_TAGS: &str = "tags";
pub const KEY_SYNTAX: &str = "syntax";
pub const KEY_COPYRIGHT: &str = "copyright";
pub const KEY_CREDENTIAL: &str = "credential";
pub const KEY_DEFAULT_COPYRIGHT: &str = "default-copyright";
pub const KEY_DEFAULT_LANG: &str = "default-lang";
pub const KEY_DEFAULT_LICENSE: &str = "default-license";
pub const KEY_DEFAULT_ROLE: &str = "default-role";
pub const KEY_DEFAULT_SYNTAX: &str = "default-syntax";
pub const KEY_DEFAULT_TITLE: &str = "default-title";
pub const KEY_DEFAULT_VISIBILITY: &str = "default-visibility";
pub const KEY_DUPLICATES: &str = "duplicates";
pub const KEY_EXPERT_MODE: &str = "expert-mode";
pub const KEY_HOME_ZETTEL: &str = "home-zettel";
pub const KEY_LANG: &str = "lang";
pub const KEY_LICENSE: &str = "license";
pub const KEY_LIST_PAGE_SIZE: &str = "list-page-size";
pub const KEY_MODIFIED: &str = "modified";
pub const KEY_NO_INDEX: &str = "no-index";
pub const KEY_OWNER: &str = "owner";
pub const KEY_PRECURSOR: &str = "precursor";
pub const KEY_PUBLISHED: &str = "published";
pub const KEY_READ_ONLY: &str = "read-only";
pub const KEY_SITE_NAME: &str = "site-name";
pub const KEY_URL: &str = "url";
pub const KEY_USER_ID: &str = "user-id";
pub const KEY_USER_ROLE: &str = "user-role";
pub const KEY_VISIBILITY: &str = "visibility";
pub const KEY_YAML_HEADER: &str = "yaml-header";

/// Registered keys in alphabetical order, with their types.
const KEY_TYPES: &[(&str, KeyType)] = &[
    (KEY_COPYRIGHT, KeyType::String),
    (KEY_CREDENTIAL, KeyType::Credential),
    (KEY_DEFAULT_COPYRIGHT, KeyType::String),
    (KEY_DEFAULT_LANG, KeyType::Word),
    (KEY_DEFAULT_LICENSE, KeyType::String),
    (KEY_DEFAULT_ROLE, KeyType::Word),
    (KEY_DEFAULT_SYNTAX, KeyType::Word),
    (KEY_DEFAULT_TITLE, KeyType::String),
    (KEY_DEFAULT_VISIBILITY, KeyType::Word),
    (KEY_DUPLICATES, KeyType::Bool),
    (KEY_EXPERT_MODE, KeyType::Bool),
    (KEY_HOME_ZETTEL, KeyType::Id),
    (KEY_ID, KeyType::Id),
    (KEY_LANG, KeyType::Word),
    (KEY_LICENSE, KeyType::String),
    (KEY_LIST_PAGE_SIZE, KeyType::Number),
    (KEY_MODIFIED, KeyType::Timestamp),
    (KEY_NO_INDEX, KeyType::Bool),
    (KEY_OWNER, KeyType::Id),
    (KEY_PRECURSOR, KeyType::IdSet),
    (KEY_PUBLISHED, KeyType::Timestamp),
    (KEY_READ_ONLY, KeyType::Word),
    (KEY_ROLE, KeyType::Word),
    (KEY_SITE_NAME, KeyType::String),
    (KEY_SYNTAX, KeyType::Word),
    (KEY_TAGS, KeyType::TagSet),
    (KEY_TITLE, KeyType::String),
    (KEY_URL, KeyType::Url),
    (KEY_USER_ID, KeyType::Word),
    (KEY_USER_ROLE, KeyType::Word),
    (KEY_VISIBILITY, KeyType::Word),
    (KEY_YAML_HEADER, KeyType::Bool),
];

/// Keys listed before all others when pairs are enumerated.
pub const FIRST_KEYS: [&str; 4] = [KEY_TITLE, KEY_ROLE, KEY_TAGS, KEY_SYNTAX];

/// Keys computed when reading a zettel; they are never written back.
pub const COMPUTED_KEYS: [&str; 1] = [KEY_DUPLICATES];

/// Type of the given key. Unregistered keys are strings.
pub fn key_type(key: &str) -> KeyType {
    KEY_TYPES
        .binary_search_by(|(name, _)| (*name).cmp(key))
        .map(|idx| KEY_TYPES[idx].1)
        .unwrap_or(KeyType::String)
}

/// All registered keys with their types, alphabetically.
pub fn registered_keys() -> impl Iterator<Item = (&'static str, KeyType)> {
    KEY_TYPES.iter().copied()
}

pub fn is_computed(key: &str) -> bool {
    COMPUTED_KEYS.contains(&key)
}

/// Check a key against `[0-9a-z][-0-9a-z]{0,254}`.
pub fn key_is_valid(key: &str) -> bool {
    let bytes = key.as_bytes();
    if bytes.is_empty() || bytes.len() > 255 {
        return false;
    }
    if !(bytes[0].is_ascii_lowercase() || bytes[0].is_ascii_digit()) {
        return false;
    }
    bytes[1..]
        .iter()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
}

/// Boolean interpretation of a metadata value.
///
/// Empty values and values starting with `0`, `f`, `F`, `n` or `N` are false.
pub fn bool_value(value: &str) -> bool {
    match value.trim().as_bytes().first() {
        None => false,
        Some(b'0' | b'f' | b'F' | b'n' | b'N') => false,
        Some(_) => true,
    }
}

pub const VALUE_TRUE: &str = "true";
pub const VALUE_FALSE: &str = "false";

pub const ROLE_CONFIGURATION: &str = "configuration";
pub const ROLE_USER: &str = "user";
pub const ROLE_ZETTEL: &str = "zettel";
pub const ROLE_MANUAL: &str = "manual";

pub const SYNTAX_CSS: &str = "css";
pub const SYNTAX_NONE: &str = "none";
pub const SYNTAX_TEXT: &str = "text";
pub const SYNTAX_ZMK: &str = "zmk";
pub const SYNTAX_ZETTELMARKUP: &str = "zettelmarkup";

/// Role of an authenticated user. Ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UserRole {
    Unknown,
    Reader,
    Writer,
    Owner,
}

impl UserRole {
    pub fn parse(value: &str) -> UserRole {
        match value.trim() {
            "reader" => UserRole::Reader,
            "writer" => UserRole::Writer,
            "owner" => UserRole::Owner,
            _ => UserRole::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Unknown => "unknown",
            UserRole::Reader => "reader",
            UserRole::Writer => "writer",
            UserRole::Owner => "owner",
        }
    }
}

/// Visibility of a zettel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Login,
    Owner,
    Expert,
}

impl Visibility {
    pub fn parse(value: &str) -> Option<Visibility> {
        match value.trim() {
            "public" => Some(Visibility::Public),
            "login" => Some(Visibility::Login),
            "owner" => Some(Visibility::Owner),
            "expert" => Some(Visibility::Expert),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Login => "login",
            Visibility::Owner => "owner",
            Visibility::Expert => "expert",
        }
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Visibility::Login
    }
}
