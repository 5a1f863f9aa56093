//! Extension and artifact listing routes

use crate::{
    AppState,
    error::{ApiError, Result},
    models::{ArtifactList, ArtifactSummary, ExtensionList, LatestArtifact, LatestQuery},
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use extension_registry::{ExtensionId, Version};
use tracing::debug;

/// Create extension routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/extensions", get(list_extensions))
        .route("/extensions/{extension_id}", get(list_artifacts))
        .route("/extensions/{extension_id}/latest", get(latest_compatible))
}

/// List all registered extensions
async fn list_extensions(State(state): State<AppState>) -> Result<Json<ExtensionList>> {
    let extensions = state.registry.list_extensions().await?;
    debug!("Listing {} extensions", extensions.len());

    Ok(Json(ExtensionList { extensions }))
}

/// List the published artifacts of one extension
async fn list_artifacts(
    State(state): State<AppState>,
    Path(extension_id): Path<String>,
) -> Result<Json<ArtifactList>> {
    debug!("Listing artifacts for extension: {}", extension_id);

    let artifacts = state
        .registry
        .list_artifacts(&ExtensionId::from(extension_id))
        .await?
        .into_iter()
        .map(ArtifactSummary::from)
        .collect();

    Ok(Json(ArtifactList { artifacts }))
}

/// Newest artifact that supports the host app version given in `?app=`
async fn latest_compatible(
    State(state): State<AppState>,
    Path(extension_id): Path<String>,
    Query(query): Query<LatestQuery>,
) -> Result<Json<LatestArtifact>> {
    let app = query
        .app
        .ok_or_else(|| ApiError::bad_request("missing app version"))?;
    let app_version: Version = app
        .parse()
        .map_err(|_| ApiError::bad_request("invalid app version"))?;

    debug!(
        "Looking up latest artifact of {} for app {}",
        extension_id, app_version
    );

    let artifact = state
        .registry
        .latest_compatible(&ExtensionId::from(extension_id), app_version)
        .await?;

    Ok(Json(LatestArtifact {
        artifact: artifact.into(),
    }))
}
