//! Property-based tests for identifiers, headers and list operations

mod header;
mod lists;
mod zid;
