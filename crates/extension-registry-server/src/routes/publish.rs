//! Publish route: multipart metadata + archive upload

use crate::{
    AppState,
    error::{ApiError, Result},
    models::PublishResponse,
};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use time::OffsetDateTime;
use tracing::{debug, info};

pub fn router() -> Router<AppState> {
    Router::new().route("/publish", post(publish))
}

/// One form part; `is_file` is set when the part carries a filename
struct FormPart {
    data: Bytes,
    is_file: bool,
}

/// Read the `metadata` and `file` parts, ignoring any others
async fn read_form(mut multipart: Multipart) -> Result<(Option<FormPart>, Option<FormPart>)> {
    let mut metadata = None;
    let mut file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {}", e)))?
    {
        let name = field.name().map(str::to_owned);
        let is_file = field.file_name().is_some();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {}", e)))?;

        match name.as_deref() {
            Some("metadata") => metadata = Some(FormPart { data, is_file }),
            Some("file") => file = Some(FormPart { data, is_file }),
            _ => debug!("Ignoring form field {:?}", name),
        }
    }

    Ok((metadata, file))
}

/// Publish a new artifact for an extension, creating the extension if needed
async fn publish(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse> {
    let multipart =
        multipart.map_err(|_| ApiError::bad_request("Content-Type must be multipart/form-data"))?;
    let (metadata, file) = read_form(multipart).await?;

    let metadata = match metadata {
        Some(part) if part.data.is_empty() => None,
        other => other,
    }
    .ok_or_else(|| ApiError::bad_request("missing \"metadata\" form field (JSON)"))?;
    if metadata.is_file {
        return Err(ApiError::bad_request(
            "\"metadata\" form field must be text (JSON)",
        ));
    }
    let metadata = String::from_utf8(metadata.data.to_vec())
        .map_err(|_| ApiError::bad_request("\"metadata\" form field must be text (JSON)"))?;

    let file =
        file.ok_or_else(|| ApiError::bad_request("missing \"file\" form field (binary .tar.gz)"))?;
    if !file.is_file {
        return Err(ApiError::bad_request(
            "\"file\" form field must be file (binary .tar.gz)",
        ));
    }

    let receipt = state
        .registry
        .publish_json(&metadata, file.data.to_vec(), OffsetDateTime::now_utc())
        .await?;

    info!(
        "Accepted {} version {} (artifact {})",
        receipt.extension_id, receipt.version, receipt.artifact_id
    );

    Ok((
        StatusCode::CREATED,
        Json(PublishResponse {
            message: format!(
                "Successfully published {}, version {}",
                receipt.extension_id, receipt.version
            ),
            artifact_id: receipt.artifact_id,
        }),
    ))
}
