//! Artifact download routes

use crate::{
    AppState,
    error::{ApiError, Result},
};
use axum::{
    Router,
    body::Body,
    extract::{Path, State},
    http::{
        HeaderValue,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
    routing::get,
};
use extension_registry::ArtifactId;
use tracing::info;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/download", get(missing_artifact_id))
        .route("/download/{artifact_id}", get(download_artifact))
}

async fn missing_artifact_id() -> ApiError {
    ApiError::bad_request("missing artifact id")
}

/// Stream an artifact's archive back to the caller
async fn download_artifact(
    State(state): State<AppState>,
    Path(artifact_id): Path<String>,
) -> Result<Response> {
    let artifact_id: ArtifactId = artifact_id
        .parse()
        .map_err(|_| ApiError::bad_request("invalid artifact id"))?;

    let artifact = state.registry.download(artifact_id).await?;
    let filename = artifact.file_name();

    info!(
        "Serving artifact {} as {} ({} bytes)",
        artifact_id,
        filename,
        artifact.payload.len()
    );

    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static("application/gzip")),
            (CONTENT_DISPOSITION, attachment(&filename)?),
        ],
        Body::from(artifact.payload),
    )
        .into_response())
}

/// `Content-Disposition` for a download. Extension ids are free text, so
/// anything that cannot sit inside a quoted header parameter becomes `_`.
fn attachment(filename: &str) -> Result<HeaderValue> {
    let filename: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            ' '..='~' => c,
            _ => '_',
        })
        .collect();

    HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .map_err(|e| ApiError::Internal(format!("invalid Content-Disposition header: {}", e)))
}
