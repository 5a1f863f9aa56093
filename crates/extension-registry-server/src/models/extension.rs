//! Extension- and artifact-related API models

use extension_registry::{ArtifactId, ArtifactInfo, Extension};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Response of `GET /extensions`
#[derive(Debug, Serialize)]
pub struct ExtensionList {
    pub extensions: Vec<Extension>,
}

/// Artifact entry as exposed by the listing endpoints (payload omitted)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactSummary {
    pub artifact_id: ArtifactId,
    pub extension_id: String,
    pub ver_major: u32,
    pub ver_minor: u32,
    pub ver_patch: u32,
    pub min_app_major: u32,
    pub min_app_minor: u32,
    pub min_app_patch: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
}

impl From<ArtifactInfo> for ArtifactSummary {
    fn from(info: ArtifactInfo) -> Self {
        Self {
            artifact_id: info.artifact_id,
            extension_id: info.extension_id.0,
            ver_major: info.version.major,
            ver_minor: info.version.minor,
            ver_patch: info.version.patch,
            min_app_major: info.min_app_version.major,
            min_app_minor: info.min_app_version.minor,
            min_app_patch: info.min_app_version.patch,
            published_at: info.published_at,
        }
    }
}

/// Response of `GET /extensions/{extensionId}`
#[derive(Debug, Serialize)]
pub struct ArtifactList {
    pub artifacts: Vec<ArtifactSummary>,
}

/// Response of `GET /extensions/{extensionId}/latest`
#[derive(Debug, Serialize)]
pub struct LatestArtifact {
    pub artifact: ArtifactSummary,
}

/// Query of `GET /extensions/{extensionId}/latest`
#[derive(Debug, Deserialize)]
pub struct LatestQuery {
    /// Host application version as `MAJOR.MINOR.PATCH`
    pub app: Option<String>,
}

/// Response of a successful `POST /publish`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub message: String,
    pub artifact_id: ArtifactId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use extension_registry::{ExtensionId, Version};
    use time::macros::datetime;

    #[test]
    fn test_artifact_summary_flattens_versions() {
        let summary = ArtifactSummary::from(ArtifactInfo {
            artifact_id: ArtifactId(3),
            extension_id: ExtensionId::from("foo.bar"),
            version: Version::new(1, 2, 3),
            min_app_version: Version::new(0, 5, 0),
            published_at: datetime!(2024-05-01 12:00 UTC),
        });

        let value = serde_json::to_value(summary).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "artifactId": 3,
                "extensionId": "foo.bar",
                "verMajor": 1,
                "verMinor": 2,
                "verPatch": 3,
                "minAppMajor": 0,
                "minAppMinor": 5,
                "minAppPatch": 0,
                "publishedAt": "2024-05-01T12:00:00Z"
            })
        );
    }
}
