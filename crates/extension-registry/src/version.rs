//! Semantic version triples and their integer ranks
//!
//! Ranks collapse a `major.minor.patch` triple into one comparable integer so
//! range queries (e.g. "highest version compatible with app X") can compare a
//! single column instead of decomposing the triple on every row.
//!
//! Minor and patch components are expected to stay within `0..=999`. Larger
//! values bleed into the next significant component and break the ordering.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Weight of the major component in a rank
pub const MAJOR_WEIGHT: i64 = 1_000_000;

/// Weight of the minor component in a rank
pub const MINOR_WEIGHT: i64 = 1_000;

/// Largest minor/patch component that keeps ranks order-preserving
pub const MAX_COMPONENT: u32 = 999;

/// Compute the rank of a version triple: `major·10⁶ + minor·10³ + patch`
pub fn rank(major: u32, minor: u32, patch: u32) -> i64 {
    i64::from(major) * MAJOR_WEIGHT + i64::from(minor) * MINOR_WEIGHT + i64::from(patch)
}

/// A `major.minor.patch` version triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Single comparable integer for this triple
    pub fn rank(&self) -> i64 {
        rank(self.major, self.minor, self.patch)
    }

    /// Whether minor and patch fit in three decimal digits
    pub fn is_rank_safe(&self) -> bool {
        self.minor <= MAX_COMPONENT && self.patch <= MAX_COMPONENT
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid version '{input}': expected MAJOR.MINOR.PATCH")]
pub struct ParseVersionError {
    pub input: String,
}

impl FromStr for Version {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseVersionError {
            input: s.to_string(),
        };

        let mut parts = s.trim().split('.');
        let mut next = || -> Result<u32, ParseVersionError> {
            parts.next().ok_or_else(err)?.parse().map_err(|_| err())
        };

        let version = Version::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(err());
        }
        Ok(version)
    }
}
