//! Error types for the extension registry

use crate::entities::ArtifactId;
use crate::version::Version;
use thiserror::Error;

/// Problems with the publish metadata document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("invalid JSON in metadata: {0}")]
    InvalidJson(String),

    #[error("metadata.{0} is required")]
    MissingField(&'static str),
}

/// Registry-specific errors
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error("Artifact {0} not found")]
    ArtifactNotFound(ArtifactId),

    #[error("Extension not found: {0}")]
    ExtensionNotFound(String),

    #[error("No artifact of {extension_id} supports app version {app_version}")]
    NoCompatibleArtifact {
        extension_id: String,
        app_version: Version,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;
