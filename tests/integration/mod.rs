//! Integration tests for the zettel store

mod chain_fallthrough;
mod config_loading;
mod dir_place;
mod manager;
mod policy_place;
mod policy_precedence;
pub mod test_utils;
