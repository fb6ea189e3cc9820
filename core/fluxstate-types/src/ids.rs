//! Identifier types used throughout the fluxstate core.
//!
//! Local ids are assigned by the persistence gateway when a record is first
//! written and are never reused. Remote ids come from the external service.
//! Owner ids scope collections (a site owns its posts and plugins).

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Process-stable identifier of a record, assigned at creation.
/// Always strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct LocalId(i64);

impl LocalId {
    /// Wraps a raw id. Zero and negative values are rejected.
    pub fn new(raw: i64) -> Result<Self, Error> {
        if raw > 0 {
            Ok(Self(raw))
        } else {
            Err(Error::InvalidId(format!("local id must be positive, got {raw}")))
        }
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for LocalId {
    type Error = Error;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<LocalId> for i64 {
    fn from(id: LocalId) -> Self {
        id.0
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LocalId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: i64 = s
            .parse()
            .map_err(|_| Error::InvalidId(format!("not a local id: {s:?}")))?;
        Self::new(raw)
    }
}

/// Identifier assigned by the remote service on first successful sync.
/// Never zero: a record without a remote id carries `None` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct RemoteId(u64);

impl RemoteId {
    /// Wraps a raw remote id. Zero is rejected.
    pub fn new(raw: u64) -> Result<Self, Error> {
        if raw == 0 {
            Err(Error::InvalidId("remote id must be nonzero".into()))
        } else {
            Ok(Self(raw))
        }
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for RemoteId {
    type Error = Error;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<RemoteId> for u64 {
    fn from(id: RemoteId) -> Self {
        id.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemoteId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: u64 = s
            .parse()
            .map_err(|_| Error::InvalidId(format!("not a remote id: {s:?}")))?;
        Self::new(raw)
    }
}

/// Identifier of the parent entity that scopes a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(i64);

impl OwnerId {
    /// Scope for collections that have no parent (e.g. a global plugin catalogue).
    pub const GLOBAL: OwnerId = OwnerId(0);

    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(&self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_global(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OwnerId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse()
            .map(Self)
            .map_err(|_| Error::InvalidId(format!("not an owner id: {s:?}")))
    }
}
