//! Storage abstraction for registry data
//!
//! The registry keeps two kinds of records: mutable extension metadata and
//! immutable, version-stamped artifacts. Backends must apply the two writes of
//! a publish as one atomic unit.

use crate::entities::*;
use crate::error::{RegistryError, Result};
use crate::version::Version;
use async_trait::async_trait;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[cfg(feature = "sqlite")]
pub mod artifacts;
#[cfg(feature = "sqlite")]
pub mod extensions;
#[cfg(feature = "sqlite")]
pub mod sqlite_storage;

#[cfg(feature = "sqlite")]
pub use sqlite_storage::SqliteStorage;

/// Backend holding extensions and their artifacts
#[async_trait]
pub trait RegistryStorage: Send + Sync {
    /// Create tables and indexes if they are absent
    async fn migrate(&self) -> Result<()>;

    /// Upsert the extension and insert the artifact, all or nothing
    async fn publish(&self, extension: &ExtensionUpsert, artifact: &NewArtifact)
    -> Result<ArtifactId>;

    /// All registered extensions
    async fn list_extensions(&self) -> Result<Vec<Extension>>;

    /// A single extension by id
    async fn get_extension(&self, id: &ExtensionId) -> Result<Option<Extension>>;

    /// Artifact metadata (no payload) for one extension
    async fn list_artifacts(&self, id: &ExtensionId) -> Result<Vec<ArtifactInfo>>;

    /// An artifact with its payload, by exact id
    async fn get_artifact(&self, id: ArtifactId) -> Result<Option<Artifact>>;

    /// Highest-ranked artifact whose minimum app version is at most `app_version`
    async fn latest_compatible_artifact(
        &self,
        id: &ExtensionId,
        app_version: Version,
    ) -> Result<Option<ArtifactInfo>>;
}

pub(crate) fn format_timestamp(ts: OffsetDateTime) -> Result<String> {
    ts.format(&Rfc3339)
        .map_err(|e| RegistryError::Storage(format!("Failed to format timestamp: {}", e)))
}

pub(crate) fn parse_timestamp(value: &str) -> Result<OffsetDateTime> {
    OffsetDateTime::parse(value, &Rfc3339)
        .map_err(|e| RegistryError::Storage(format!("Failed to parse timestamp: {}", e)))
}
