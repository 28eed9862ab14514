//! Filtering and sorting of metadata lists
//!
//! A `Filter` is compiled once into a predicate by `create_filter_func`; the predicate is
//! then applied to every candidate. How a value matches depends on the type of its key.

use crate::zettel::keys::{bool_value, key_is_valid, key_type, KeyType, KEY_ID};
use crate::zettel::Meta;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

/// Selection of zettel by metadata values.
///
/// Every key of `expr` must match (AND). A key with several values matches if one of
/// them matches (OR). Within a value of a set-typed key, comma separated elements must all
/// be present (AND). The empty key searches all keys of a zettel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub expr: BTreeMap<String, Vec<String>>,
    pub negate: bool,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value for a key.
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.expr
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
        self
    }

    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }
}

/// Order and page of a metadata list. Without an order key, lists are sorted by
/// descending identifier. A `limit` of zero means no limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sorter {
    pub order: Option<String>,
    pub descending: bool,
    pub offset: usize,
    pub limit: usize,
}

impl Sorter {
    pub fn by(key: &str, descending: bool) -> Self {
        Self {
            order: Some(key.to_string()),
            descending,
            ..Self::default()
        }
    }

    pub fn page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }
}

pub type FilterFunc = Box<dyn Fn(&Meta) -> bool + Send + Sync>;
type MatchFunc = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Compile a filter into a predicate. No filter selects everything.
pub fn create_filter_func(filter: Option<&Filter>) -> FilterFunc {
    let Some(filter) = filter else {
        return Box::new(|_| true);
    };
    let negate = filter.negate;
    let mut specs: Vec<(String, MatchFunc)> = Vec::new();
    let mut search_all: Option<FilterFunc> = None;
    for (key, values) in &filter.expr {
        if key.is_empty() {
            search_all = Some(create_search_all_func(values.clone(), negate));
        } else if key_is_valid(key) {
            specs.push((key.clone(), create_match_func(key_type(key), values)));
        }
    }

    let has_specs = !specs.is_empty();
    let search_meta = move |meta: &Meta| {
        for (key, matches) in &specs {
            match meta_value(meta, key) {
                Some(value) if matches(&value) => {}
                _ => return negate,
            }
        }
        !negate
    };
    match (has_specs, search_all) {
        (false, None) => Box::new(|_| true),
        (false, Some(all)) => all,
        (true, None) => Box::new(search_meta),
        (true, Some(all)) => Box::new(move |meta| all(meta) || search_meta(meta)),
    }
}

/// The identifier is not stored as a pair but can be filtered like one.
fn meta_value<'a>(meta: &'a Meta, key: &str) -> Option<Cow<'a, str>> {
    if key == KEY_ID {
        return Some(Cow::Owned(meta.zid().to_string()));
    }
    meta.get(key).map(Cow::Borrowed)
}

/// Match any key. Matchers are built lazily, one per key type.
fn create_search_all_func(values: Vec<String>, negate: bool) -> FilterFunc {
    let cache: Vec<OnceLock<MatchFunc>> = KeyType::ALL.iter().map(|_| OnceLock::new()).collect();
    Box::new(move |meta| {
        let matcher = |kt: KeyType| cache[kt.index()].get_or_init(|| create_match_func(kt, &values));
        for (key, value) in meta.pairs() {
            if matcher(key_type(key))(value) {
                return !negate;
            }
        }
        matcher(KeyType::Id)(&meta.zid().to_string()) != negate
    })
}

fn create_match_func(kt: KeyType, values: &[String]) -> MatchFunc {
    let values: Vec<String> = values
        .iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    if kt == KeyType::Credential {
        return Box::new(|_| false);
    }
    if values.is_empty() {
        // A key without values only asks for the key to be present.
        return Box::new(|_| true);
    }
    match kt {
        KeyType::Credential => Box::new(|_| false),
        KeyType::Bool => {
            let wanted: Vec<bool> = values.iter().map(|v| bool_value(v)).collect();
            Box::new(move |value| wanted.contains(&bool_value(value)))
        }
        KeyType::Id | KeyType::Timestamp => {
            Box::new(move |value| values.iter().any(|prefix| value.starts_with(prefix.as_str())))
        }
        KeyType::IdSet | KeyType::TagSet | KeyType::WordSet => {
            let terms: Vec<Vec<String>> = values
                .iter()
                .map(|v| {
                    v.split(',')
                        .map(|e| normalize_set_element(e.trim(), kt))
                        .filter(|e| !e.is_empty())
                        .collect()
                })
                .collect();
            Box::new(move |value| {
                let stored: HashSet<String> = value
                    .split_whitespace()
                    .map(|e| normalize_set_element(e, kt))
                    .collect();
                terms
                    .iter()
                    .any(|term| !term.is_empty() && term.iter().all(|e| stored.contains(e)))
            })
        }
        KeyType::Word => {
            let words: Vec<String> = values.iter().map(|v| v.to_lowercase()).collect();
            Box::new(move |value| {
                let value = value.trim().to_lowercase();
                words.iter().any(|w| *w == value)
            })
        }
        KeyType::Number => {
            let numbers: Vec<i64> = values.iter().filter_map(|v| v.parse().ok()).collect();
            Box::new(move |value| {
                value
                    .trim()
                    .parse::<i64>()
                    .map(|n| numbers.contains(&n))
                    .unwrap_or(false)
            })
        }
        KeyType::String | KeyType::Url => {
            let needles: Vec<String> = values.iter().map(|v| v.to_lowercase()).collect();
            Box::new(move |value| {
                let value = value.to_lowercase();
                needles.iter().any(|n| value.contains(n.as_str()))
            })
        }
    }
}

fn normalize_set_element(element: &str, kt: KeyType) -> String {
    match kt {
        KeyType::TagSet => element.trim_start_matches('#').to_lowercase(),
        KeyType::WordSet => element.to_lowercase(),
        _ => element.to_string(),
    }
}

/// Sort a list and cut out the requested page.
pub fn apply_sorter(mut metas: Vec<Meta>, sorter: Option<&Sorter>) -> Vec<Meta> {
    let Some(sorter) = sorter else {
        metas.sort_by(|a, b| b.zid().cmp(&a.zid()));
        return metas;
    };
    match sorter.order.as_deref() {
        None | Some("") => metas.sort_by(|a, b| b.zid().cmp(&a.zid())),
        Some(key) => sort_by_key(&mut metas, key, sorter.descending),
    }

    if sorter.offset > 0 {
        if sorter.offset >= metas.len() {
            return Vec::new();
        }
        metas.drain(..sorter.offset);
    }
    if sorter.limit > 0 {
        metas.truncate(sorter.limit);
    }
    metas
}

fn sort_by_key(metas: &mut [Meta], key: &str, descending: bool) {
    match key_type(key) {
        KeyType::Id | KeyType::Credential => {
            if descending {
                metas.sort_by(|a, b| b.zid().cmp(&a.zid()));
            } else {
                metas.sort_by(|a, b| a.zid().cmp(&b.zid()));
            }
        }
        KeyType::Bool => {
            // Stable: zettel with equal values keep their relative order.
            if descending {
                metas.sort_by_key(|m| !m.get_bool(key));
            } else {
                metas.sort_by_key(|m| m.get_bool(key));
            }
        }
        KeyType::Number => {
            metas.sort_by(|a, b| missing_last(a.get_number(key), b.get_number(key), descending));
        }
        _ => {
            metas.sort_by(|a, b| missing_last(a.get(key), b.get(key), descending));
        }
    }
}

/// Compare present values in the requested direction; absent values always go last.
fn missing_last<T: Ord>(a: Option<T>, b: Option<T>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if descending => b.cmp(&a),
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
