//! Publish metadata: the JSON document that accompanies an uploaded archive
//!
//! Parsing happens in two steps. The JSON is first read into [`RawPublishMetadata`],
//! where every field is optional, and then converted into [`PublishMetadata`].
//! The conversion either yields a fully populated value or reports the first
//! missing required field.

use crate::entities::{ExtensionId, ExtensionUpsert, NewArtifact};
use crate::error::MetadataError;
use crate::version::Version;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Required fields, in the order they are checked
pub const REQUIRED_FIELDS: [&str; 9] = [
    "extensionId",
    "name",
    "repository",
    "verMajor",
    "verMinor",
    "verPatch",
    "minAppMajor",
    "minAppMinor",
    "minAppPatch",
];

/// Metadata as sent by a publisher, before required-field checks
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPublishMetadata {
    pub extension_id: Option<String>,
    pub name: Option<String>,
    pub authors: Option<Vec<String>>,
    pub description: Option<String>,
    pub repository: Option<String>,
    pub ver_major: Option<u32>,
    pub ver_minor: Option<u32>,
    pub ver_patch: Option<u32>,
    pub min_app_major: Option<u32>,
    pub min_app_minor: Option<u32>,
    pub min_app_patch: Option<u32>,
}

/// Validated publish metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishMetadata {
    pub extension_id: ExtensionId,
    pub name: String,
    pub authors: Vec<String>,
    pub description: String,
    pub repository: String,
    pub version: Version,
    pub min_app_version: Version,
}

fn require<T>(value: Option<T>, field: &'static str) -> Result<T, MetadataError> {
    value.ok_or(MetadataError::MissingField(field))
}

impl TryFrom<RawPublishMetadata> for PublishMetadata {
    type Error = MetadataError;

    fn try_from(raw: RawPublishMetadata) -> Result<Self, Self::Error> {
        let extension_id = require(raw.extension_id, "extensionId")?;
        let name = require(raw.name, "name")?;
        let repository = require(raw.repository, "repository")?;
        let version = Version::new(
            require(raw.ver_major, "verMajor")?,
            require(raw.ver_minor, "verMinor")?,
            require(raw.ver_patch, "verPatch")?,
        );
        let min_app_version = Version::new(
            require(raw.min_app_major, "minAppMajor")?,
            require(raw.min_app_minor, "minAppMinor")?,
            require(raw.min_app_patch, "minAppPatch")?,
        );

        Ok(Self {
            extension_id: ExtensionId(extension_id),
            name,
            authors: raw.authors.unwrap_or_default(),
            description: raw.description.unwrap_or_default(),
            repository,
            version,
            min_app_version,
        })
    }
}

impl PublishMetadata {
    /// Parse and validate a metadata JSON document
    pub fn from_json(json: &str) -> Result<Self, MetadataError> {
        let raw: RawPublishMetadata =
            serde_json::from_str(json).map_err(|e| MetadataError::InvalidJson(e.to_string()))?;
        raw.try_into()
    }

    /// Split into the two writes a publish performs
    pub(crate) fn into_writes(
        self,
        payload: Vec<u8>,
        now: OffsetDateTime,
    ) -> (ExtensionUpsert, NewArtifact) {
        let artifact = NewArtifact {
            extension_id: self.extension_id.clone(),
            version: self.version,
            min_app_version: self.min_app_version,
            published_at: now,
            payload,
        };
        let upsert = ExtensionUpsert {
            extension_id: self.extension_id,
            name: self.name,
            authors: self.authors,
            description: self.description,
            repository: self.repository,
            now,
        };
        (upsert, artifact)
    }
}
