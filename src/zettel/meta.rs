//! Zettel metadata
//!
//! `Meta` is an immutable record: once built it cannot be changed, so it can be cached and
//! shared between threads freely. All construction and modification goes through
//! `MetaBuilder`, which yields a new `Meta` on `build()`.

use crate::zettel::id::Zid;
use crate::zettel::keys::{self, bool_value, key_is_valid, FIRST_KEYS, KEY_ID};
use std::collections::BTreeMap;

/// Metadata of a zettel
#[derive(Debug, Clone)]
pub struct Meta {
    zid: Zid,
    pairs: BTreeMap<String, String>,
    yaml_sep: bool,
}

impl Meta {
    /// Metadata without any key/value pairs.
    pub fn new(zid: Zid) -> Self {
        Self {
            zid,
            pairs: BTreeMap::new(),
            yaml_sep: false,
        }
    }

    pub fn builder(zid: Zid) -> MetaBuilder {
        MetaBuilder::new(zid)
    }

    pub fn zid(&self) -> Zid {
        self.zid
    }

    /// Was the metadata delimited by `---` fences?
    pub fn yaml_sep(&self) -> bool {
        self.yaml_sep
    }

    /// Value of a key. The identifier is not stored as a pair; use `zid()`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.get(key).map(String::as_str)
    }

    pub fn get_default<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).map(bool_value).unwrap_or(false)
    }

    /// Whitespace separated elements of a value
    pub fn get_list(&self, key: &str) -> Vec<&str> {
        self.get(key)
            .map(|v| v.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn get_number(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// All pairs: `title`, `role`, `tags` and `syntax` first, the rest alphabetically.
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        let mut result = Vec::with_capacity(self.pairs.len());
        for key in FIRST_KEYS {
            if let Some(value) = self.pairs.get(key) {
                result.push((key, value.as_str()));
            }
        }
        for (key, value) in &self.pairs {
            if !FIRST_KEYS.contains(&key.as_str()) {
                result.push((key.as_str(), value.as_str()));
            }
        }
        result
    }

    /// Pairs that are persisted, i.e. without computed keys.
    pub fn stored_pairs(&self) -> Vec<(&str, &str)> {
        self.pairs()
            .into_iter()
            .filter(|(key, _)| !keys::is_computed(key))
            .collect()
    }

    /// Start a modified copy of this metadata.
    pub fn to_builder(&self) -> MetaBuilder {
        MetaBuilder {
            zid: self.zid,
            pairs: self.pairs.clone(),
            yaml_sep: self.yaml_sep,
        }
    }

    /// Same pairs under another identifier.
    pub fn with_zid(&self, zid: Zid) -> Meta {
        Meta {
            zid,
            pairs: self.pairs.clone(),
            yaml_sep: self.yaml_sep,
        }
    }
}

/// Equal identifier and equal pairs. The header style is not part of equality.
impl PartialEq for Meta {
    fn eq(&self, other: &Self) -> bool {
        self.zid == other.zid && self.pairs == other.pairs
    }
}

impl Eq for Meta {}

/// Mutable construction state of a `Meta`
#[derive(Debug, Clone)]
pub struct MetaBuilder {
    zid: Zid,
    pairs: BTreeMap<String, String>,
    yaml_sep: bool,
}

impl MetaBuilder {
    pub fn new(zid: Zid) -> Self {
        Self {
            zid,
            pairs: BTreeMap::new(),
            yaml_sep: false,
        }
    }

    pub fn zid(&self) -> Zid {
        self.zid
    }

    /// Set a value. Invalid keys and the `id` key are ignored; the value is trimmed and
    /// line breaks are folded into spaces.
    pub fn set(&mut self, key: &str, value: &str) -> &mut Self {
        if key != KEY_ID && key_is_valid(key) {
            self.pairs.insert(key.to_string(), normalize_value(value));
        }
        self
    }

    /// Consuming variant of `set`, convenient for literals.
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }

    /// Append to an existing value, separated by a single space.
    pub fn append(&mut self, key: &str, value: &str) -> &mut Self {
        let value = normalize_value(value);
        let combined = match self.pairs.get(key) {
            Some(old) if old.is_empty() => value,
            Some(old) if value.is_empty() => old.clone(),
            Some(old) => format!("{} {}", old, value),
            None => value,
        };
        self.set(key, &combined)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.get(key).map(String::as_str)
    }

    pub fn delete(&mut self, key: &str) -> &mut Self {
        self.pairs.remove(key);
        self
    }

    pub fn yaml_sep(&mut self, yaml_sep: bool) -> &mut Self {
        self.yaml_sep = yaml_sep;
        self
    }

    pub fn build(self) -> Meta {
        Meta {
            zid: self.zid,
            pairs: self.pairs,
            yaml_sep: self.yaml_sep,
        }
    }
}

fn normalize_value(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.contains(['\n', '\r']) {
        trimmed
            .split(['\n', '\r'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        trimmed.to_string()
    }
}
