//! Zettelstore: a note store built from chained storage places
//!
//! Zettel live in a chain of places: directories watched on disk, in-memory stores, built-in
//! read-only zettel and a terminal place of program-generated introspection zettel. Lookups
//! fall through the chain, listings merge it, and a layered policy decides who may see or
//! change which zettel.

pub mod config;
pub mod error;
pub mod logging;
pub mod place;
pub mod policy;
pub mod zettel;
