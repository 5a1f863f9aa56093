//! Extension Registry HTTP API Server
//!
//! Provides endpoints to publish extension archives, list extensions and
//! their versions, and download archives by artifact id.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Request},
    http::HeaderValue,
    routing::get,
};
use extension_registry::{Registry, SqliteStorage};
use serde_json::{Value, json};
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use tower::{Layer, ServiceBuilder};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    normalize_path::{NormalizePath, NormalizePathLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

mod config;
mod error;
mod models;
mod routes;

use config::ServerConfig;
use error::{ApiError, Result};

/// Main application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry<SqliteStorage>>,
    pub config: ServerConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| {
            "extension_registry_server=debug,extension_registry=info,tower_http=debug".to_string()
        }))
        .init();

    // Load configuration
    let config = ServerConfig::from_env()?;
    info!(
        "Starting Extension Registry on {}:{}",
        config.host, config.port
    );

    // Connecting also creates any missing tables, once, before serving requests
    let storage = SqliteStorage::new(&config.database_url).await?;
    info!("Database ready at {}", config.database_url);

    let state = AppState {
        registry: Arc::new(Registry::new(storage)),
        config: config.clone(),
    };

    let app = app(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!("🚀 Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, axum::ServiceExt::<Request>::into_make_service(app)).await?;

    Ok(())
}

/// Router wrapped so trailing slashes are stripped before routing
fn app(state: AppState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(create_router(state))
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    let body_limit = match state.config.max_upload_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        // Health check
        .route("/health", get(health_check))
        .merge(routes::publish::router())
        .merge(routes::extensions::router())
        .merge(routes::download::router())
        .fallback(not_found)
        .method_not_allowed_fallback(not_found)
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_origins))
                .layer(body_limit),
        )
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new().allow_origin(AllowOrigin::list(allowed))
}

/// Health check endpoint
async fn health_check() -> Result<Json<Value>> {
    Ok(Json(json!({
        "status": "healthy",
        "service": "extension-registry-server",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": time::OffsetDateTime::now_utc().format(&Rfc3339).ok()
    })))
}

async fn not_found() -> ApiError {
    ApiError::not_found("not found")
}
