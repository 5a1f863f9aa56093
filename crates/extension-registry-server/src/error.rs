//! Error handling for the API server

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use extension_registry::{MetadataError, RegistryError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Result type for API operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, json!({ "error": message }))
            }
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, json!({ "error": message })),
            ApiError::Registry(RegistryError::Metadata(MetadataError::InvalidJson(details))) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "invalid JSON in metadata", "details": details }),
            ),
            ApiError::Registry(e @ RegistryError::Metadata(MetadataError::MissingField(_))) => {
                (StatusCode::BAD_REQUEST, json!({ "error": e.to_string() }))
            }
            ApiError::Registry(
                e @ (RegistryError::ArtifactNotFound(_)
                | RegistryError::ExtensionNotFound(_)
                | RegistryError::NoCompatibleArtifact { .. }),
            ) => (StatusCode::NOT_FOUND, json!({ "error": e.to_string() })),
            _ => {
                error!("Request failed: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal server error", "details": self.to_string() }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

// Convenience functions for common errors
impl ApiError {
    pub fn bad_request(msg: &str) -> Self {
        Self::BadRequest(msg.to_string())
    }

    pub fn not_found(msg: &str) -> Self {
        Self::NotFound(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extension_registry::ArtifactId;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_of(ApiError::bad_request("nope")), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(RegistryError::from(MetadataError::MissingField("name")).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(RegistryError::from(MetadataError::InvalidJson("eof".into())).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(RegistryError::ArtifactNotFound(ArtifactId(1)).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(RegistryError::Storage("disk full".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(ApiError::Internal("bad header".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
