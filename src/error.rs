//! Error types for the zettel store.

use crate::zettel::Zid;
use std::fmt;
use thiserror::Error;

/// Invalid textual zettel identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ZidError {
    #[error("Invalid zettel identifier: {0:?}")]
    Invalid(String),
}

/// Operation guarded by a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Reload,
    Create,
    Read,
    Write,
    Rename,
    Delete,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Reload => "reload",
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Write => "write",
            Operation::Rename => "rename",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse classification of place errors, for translation into protocol status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Unavailable,
    BadRequest,
    Internal,
}

/// Place-related errors
#[derive(Debug, Error)]
pub enum PlaceError {
    #[error("Place is stopped")]
    Stopped,

    #[error("Place was already started")]
    AlreadyStarted,

    #[error("Place is read-only")]
    ReadOnly,

    #[error("Unknown zettel identifier: {0}")]
    UnknownId(Zid),

    #[error("Invalid zettel identifier: {0}")]
    InvalidId(Zid),

    #[error("Operation {op} not allowed for {} on {}", display_user(.user), display_target(.zid))]
    NotAuthorized {
        op: Operation,
        user: Option<Zid>,
        zid: Option<Zid>,
    },

    #[error("Invalid place scheme: {0:?}")]
    InvalidScheme(String),

    #[error("Cannot connect to place {uri}: {reason}")]
    Connect { uri: String, reason: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn display_user(user: &Option<Zid>) -> String {
    match user {
        Some(zid) => format!("user {}", zid),
        None => "anonymous user".to_string(),
    }
}

fn display_target(zid: &Option<Zid>) -> String {
    match zid {
        Some(zid) => format!("zettel {}", zid),
        None => "place".to_string(),
    }
}

impl PlaceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlaceError::UnknownId(_) => ErrorKind::NotFound,
            PlaceError::NotAuthorized { .. } => ErrorKind::Forbidden,
            PlaceError::Stopped | PlaceError::ReadOnly | PlaceError::Cancelled => {
                ErrorKind::Unavailable
            }
            PlaceError::InvalidId(_) | PlaceError::InvalidScheme(_) | PlaceError::Connect { .. } => {
                ErrorKind::BadRequest
            }
            PlaceError::AlreadyStarted | PlaceError::Io(_) => ErrorKind::Internal,
        }
    }

    pub fn not_authorized(op: Operation, user: Option<Zid>, zid: Option<Zid>) -> Self {
        PlaceError::NotAuthorized { op, user, zid }
    }

    pub fn connect(uri: impl Into<String>, reason: impl fmt::Display) -> Self {
        PlaceError::Connect {
            uri: uri.into(),
            reason: reason.to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Load(err.to_string())
    }
}

/// Errors while assembling a store from its configuration
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Place(#[from] PlaceError),
}
