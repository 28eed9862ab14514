//! Zettel identifiers
//!
//! A `Zid` is a 14-digit number, conventionally the creation time of a zettel in the
//! form `YYYYMMDDHHMMSS`. Zero is reserved as the invalid identifier.

use crate::error::ZidError;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

/// Identifier of a zettel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Zid(u64);

impl Zid {
    /// The invalid identifier. Also used as the broadcast sentinel in change notifications.
    pub const INVALID: Zid = Zid(0);

    /// Largest valid identifier.
    pub const MAX: Zid = Zid(99_999_999_999_999);

    /// Number of decimal digits of a formatted identifier.
    pub const LENGTH: usize = 14;

    /// Create an identifier from its numeric value.
    ///
    /// Returns `None` for zero and for values with more than 14 digits.
    pub const fn new(value: u64) -> Option<Zid> {
        if value == 0 || value > Self::MAX.0 {
            None
        } else {
            Some(Zid(value))
        }
    }

    /// Parse a 14-digit identifier.
    pub fn parse(text: &str) -> Result<Zid, ZidError> {
        if text.len() != Self::LENGTH || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ZidError::Invalid(text.to_string()));
        }
        let value: u64 = text
            .parse()
            .map_err(|_| ZidError::Invalid(text.to_string()))?;
        Zid::new(value).ok_or_else(|| ZidError::Invalid(text.to_string()))
    }

    /// Numeric value of the identifier
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    pub const fn is_valid(self) -> bool {
        self.0 > 0 && self.0 <= Self::MAX.0
    }

    /// Identifier derived from a point in time.
    ///
    /// Without seconds the last two digits are `00`, which leaves the finer-grained
    /// identifiers of the same minute free for collision retries.
    pub fn from_time(time: NaiveDateTime, with_seconds: bool) -> Zid {
        let text = if with_seconds {
            time.format("%Y%m%d%H%M%S").to_string()
        } else {
            time.format("%Y%m%d%H%M00").to_string()
        };
        // The format always yields 14 digits for years 1000..=9999.
        Zid::parse(&text).unwrap_or(Zid::INVALID)
    }

    /// Identifier for the current local time
    pub fn now(with_seconds: bool) -> Zid {
        Self::from_time(Local::now().naive_local(), with_seconds)
    }

    /// Next identifier in numeric order, saturating at `MAX`.
    pub fn successor(self) -> Zid {
        if self.0 >= Self::MAX.0 {
            Self::MAX
        } else {
            Zid(self.0 + 1)
        }
    }
}

impl fmt::Display for Zid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:014}", self.0)
    }
}

impl FromStr for Zid {
    type Err = ZidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Zid::parse(s)
    }
}

impl TryFrom<String> for Zid {
    type Error = ZidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Zid::parse(&value)
    }
}

impl From<Zid> for String {
    fn from(zid: Zid) -> Self {
        zid.to_string()
    }
}

// Reserved identifiers of built-in and generated zettel.
pub const VERSION_ZID: Zid = Zid(1);
pub const HOST_ZID: Zid = Zid(2);
pub const OPERATING_SYSTEM_ZID: Zid = Zid(3);
pub const PLACE_MANAGER_ZID: Zid = Zid(20);
pub const METADATA_KEY_ZID: Zid = Zid(90);
pub const STARTUP_CONFIGURATION_ZID: Zid = Zid(96);
pub const CONFIGURATION_ZID: Zid = Zid(100);
pub const BASE_CSS_ZID: Zid = Zid(20_001);
pub const DEFAULT_HOME_ZID: Zid = Zid(10_000_000_000);

/// Upper bound (exclusive) of the identifiers reserved for the system.
pub const SYSTEM_RANGE_END: Zid = Zid(100_000_000);

/// Is the identifier one of the reserved system identifiers?
pub fn is_system_zid(zid: Zid) -> bool {
    zid.is_valid() && zid < SYSTEM_RANGE_END
}

const RETRY_DELAY: Duration = Duration::from_millis(100);
const MAX_RETRIES: usize = 12;

/// Allocate a fresh identifier that `taken` reports as free.
///
/// The minute-granular identifier is tried first, then the second-granular one. While the
/// current second is taken the allocator waits for the clock to advance, at most
/// `MAX_RETRIES` times; after that it probes upwards from the current time so that
/// allocation always terminates.
pub fn allocate<F>(taken: F) -> Zid
where
    F: Fn(Zid) -> bool,
{
    let coarse = Zid::now(false);
    if coarse.is_valid() && !taken(coarse) {
        return coarse;
    }
    for _ in 0..MAX_RETRIES {
        let fine = Zid::now(true);
        if fine.is_valid() && !taken(fine) {
            return fine;
        }
        thread::sleep(RETRY_DELAY);
    }
    let mut candidate = Zid::now(true);
    while !candidate.is_valid() || taken(candidate) {
        if candidate == Zid::MAX {
            break;
        }
        candidate = candidate.successor();
    }
    candidate
}
