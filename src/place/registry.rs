//! Place registry
//!
//! Maps URI schemes to place factories. The registry is built once, explicitly, and then
//! only read while connecting places.

use crate::error::PlaceError;
use crate::place::{constant, dir, memory, Place, Result};
use crate::zettel::keys::bool_value;
use std::collections::HashMap;
use tracing::debug;
use url::Url;

/// Creates a place for a parsed URI, with `next` as its fallback.
pub type PlaceFactory = fn(&Url, Option<Box<dyn Place>>) -> Result<Box<dyn Place>>;

/// Query key marking a place as read-only
pub const READONLY_KEY: &str = "readonly";

pub struct PlaceRegistry {
    factories: HashMap<String, PlaceFactory>,
}

impl PlaceRegistry {
    /// Registry without any scheme.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with the `dir`, `mem` and `globals` schemes.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(dir::SCHEME, dir::connect);
        registry.register(memory::SCHEME, memory::connect);
        registry.register(constant::SCHEME, constant::connect);
        registry
    }

    /// Register a factory. A factory registered earlier for the same scheme is replaced.
    pub fn register(&mut self, scheme: &str, factory: PlaceFactory) {
        self.factories.insert(scheme.to_string(), factory);
    }

    /// Registered schemes, sorted.
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }

    /// Create the place described by `uri`. With `readonly`, the URI is annotated so the
    /// place rejects all modifications.
    pub fn connect(
        &self,
        uri: &str,
        readonly: bool,
        next: Option<Box<dyn Place>>,
    ) -> Result<Box<dyn Place>> {
        let mut url = Url::parse(uri).map_err(|err| PlaceError::connect(uri, err))?;
        if readonly && !is_readonly(&url) {
            let query = match url.query() {
                Some(q) if !q.is_empty() => format!("{}&{}", q, READONLY_KEY),
                _ => READONLY_KEY.to_string(),
            };
            url.set_query(Some(&query));
        }
        let factory = self
            .factories
            .get(url.scheme())
            .ok_or_else(|| PlaceError::InvalidScheme(url.scheme().to_string()))?;
        debug!(uri = %url, "Connecting place");
        factory(&url, next)
    }
}

impl Default for PlaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Value of a query parameter. Keys without a value yield an empty string.
pub fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Is the `readonly` key present, without a false value?
pub fn is_readonly(url: &Url) -> bool {
    match query_value(url, READONLY_KEY) {
        Some(value) => value.is_empty() || bool_value(&value),
        None => false,
    }
}

/// Numeric query parameter, or the default if absent. Malformed values are connect errors.
pub fn query_number<T: std::str::FromStr>(url: &Url, key: &str, default: T) -> Result<T> {
    match query_value(url, key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| {
            PlaceError::connect(url.as_str(), format!("invalid value {:?} for {}", value, key))
        }),
    }
}
