//! Core data structures for the extension registry

use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

/// Externally chosen identifier of an extension (e.g. `foo.bar`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtensionId(pub String);

impl From<String> for ExtensionId {
    fn from(s: String) -> Self {
        ExtensionId(s)
    }
}

impl From<&str> for ExtensionId {
    fn from(s: &str) -> Self {
        ExtensionId(s.to_string())
    }
}

impl AsRef<str> for ExtensionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExtensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// System-generated artifact handle, strictly increasing across all extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(pub i64);

impl From<i64> for ArtifactId {
    fn from(id: i64) -> Self {
        ArtifactId(id)
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ArtifactId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(ArtifactId)
    }
}

/// A registered extension.
///
/// One row per extension id. Display fields are last-write-wins across
/// publishes; `created_at` is set once and `downloads` is never touched by
/// publishing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    pub extension_id: ExtensionId,
    pub name: String,
    pub authors: Vec<String>,
    pub description: String,
    pub repository: String,
    pub downloads: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Metadata of one published artifact, without its payload
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactInfo {
    pub artifact_id: ArtifactId,
    pub extension_id: ExtensionId,
    pub version: Version,
    pub min_app_version: Version,
    pub published_at: OffsetDateTime,
}

impl ArtifactInfo {
    /// Rank of the extension's own version
    pub fn ver_rank(&self) -> i64 {
        self.version.rank()
    }

    /// Rank of the minimum host application version
    pub fn min_app_rank(&self) -> i64 {
        self.min_app_version.rank()
    }

    /// Download file name: `{extensionId}-{major}-{minor}-{patch}.tar.gz`
    pub fn file_name(&self) -> String {
        format!(
            "{}-{}-{}-{}.tar.gz",
            self.extension_id, self.version.major, self.version.minor, self.version.patch
        )
    }
}

/// A published artifact together with its archive bytes
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub info: ArtifactInfo,
    pub payload: Vec<u8>,
}

impl Artifact {
    pub fn file_name(&self) -> String {
        self.info.file_name()
    }
}

/// Metadata upsert issued on every publish
#[derive(Debug, Clone)]
pub struct ExtensionUpsert {
    pub extension_id: ExtensionId,
    pub name: String,
    pub authors: Vec<String>,
    pub description: String,
    pub repository: String,
    pub now: OffsetDateTime,
}

/// Artifact insert issued on every publish
#[derive(Debug, Clone)]
pub struct NewArtifact {
    pub extension_id: ExtensionId,
    pub version: Version,
    pub min_app_version: Version,
    pub published_at: OffsetDateTime,
    pub payload: Vec<u8>,
}
