//! High-level registry interface: publishing, listing and downloading

use crate::entities::*;
use crate::error::{RegistryError, Result};
use crate::metadata::PublishMetadata;
use crate::storage::RegistryStorage;
use crate::version::Version;
use time::OffsetDateTime;
use tracing::{info, warn};

/// Outcome of a successful publish
#[derive(Debug, Clone, PartialEq)]
pub struct PublishReceipt {
    pub artifact_id: ArtifactId,
    pub extension_id: ExtensionId,
    pub version: Version,
}

/// Extension registry backed by a [`RegistryStorage`]
pub struct Registry<S> {
    storage: S,
}

impl<S: RegistryStorage> Registry<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Validate a raw metadata document, then publish
    pub async fn publish_json(
        &self,
        metadata_json: &str,
        payload: Vec<u8>,
        now: OffsetDateTime,
    ) -> Result<PublishReceipt> {
        let metadata = PublishMetadata::from_json(metadata_json)?;
        self.publish(metadata, payload, now).await
    }

    /// Upsert the extension metadata and store a new artifact as one atomic write.
    ///
    /// Republishing an existing version is allowed and creates a separate artifact.
    pub async fn publish(
        &self,
        metadata: PublishMetadata,
        payload: Vec<u8>,
        now: OffsetDateTime,
    ) -> Result<PublishReceipt> {
        if !metadata.version.is_rank_safe() || !metadata.min_app_version.is_rank_safe() {
            warn!(
                "Publishing {} with version {} / min app {}: components above 999 do not rank correctly",
                metadata.extension_id, metadata.version, metadata.min_app_version
            );
        }

        let extension_id = metadata.extension_id.clone();
        let version = metadata.version;
        let (upsert, artifact) = metadata.into_writes(payload, now);

        let artifact_id = self.storage.publish(&upsert, &artifact).await?;

        info!(
            "Published {} version {} as artifact {}",
            extension_id, version, artifact_id
        );

        Ok(PublishReceipt {
            artifact_id,
            extension_id,
            version,
        })
    }

    pub async fn list_extensions(&self) -> Result<Vec<Extension>> {
        self.storage.list_extensions().await
    }

    pub async fn get_extension(&self, id: &ExtensionId) -> Result<Extension> {
        self.storage
            .get_extension(id)
            .await?
            .ok_or_else(|| RegistryError::ExtensionNotFound(id.to_string()))
    }

    /// Published artifacts of an extension. Unknown ids yield an empty list.
    pub async fn list_artifacts(&self, id: &ExtensionId) -> Result<Vec<ArtifactInfo>> {
        self.storage.list_artifacts(id).await
    }

    /// Fetch an artifact with its archive bytes
    pub async fn download(&self, id: ArtifactId) -> Result<Artifact> {
        self.storage
            .get_artifact(id)
            .await?
            .ok_or(RegistryError::ArtifactNotFound(id))
    }

    /// Newest artifact that runs on the given host application version
    pub async fn latest_compatible(
        &self,
        id: &ExtensionId,
        app_version: Version,
    ) -> Result<ArtifactInfo> {
        self.storage
            .latest_compatible_artifact(id, app_version)
            .await?
            .ok_or_else(|| RegistryError::NoCompatibleArtifact {
                extension_id: id.to_string(),
                app_version,
            })
    }
}
