//! Server configuration management

use crate::error::{ApiError, Result};
use serde::{Deserialize, Serialize};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// SQLite connection string
    pub database_url: String,

    /// Upper bound for request bodies in bytes; `None` accepts any size
    pub max_upload_bytes: Option<usize>,

    /// CORS allowed origins
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: match std::env::var("PORT") {
                Ok(port) => port
                    .parse()
                    .map_err(|_| ApiError::Config("Invalid PORT value".to_string()))?,
                Err(_) => defaults.port,
            },
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            max_upload_bytes: match std::env::var("MAX_UPLOAD_BYTES") {
                Ok(limit) if !limit.trim().is_empty() => Some(limit.trim().parse().map_err(
                    |_| ApiError::Config("Invalid MAX_UPLOAD_BYTES value".to_string()),
                )?),
                _ => None,
            },
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|origins| parse_origins(&origins))
                .unwrap_or(defaults.cors_origins),
        })
    }

    /// Address string for the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_origins(origins: &str) -> Vec<String> {
    origins
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8787,
            database_url: "sqlite:./data/registry.db".to_string(),
            max_upload_bytes: None,
            cors_origins: vec!["*".to_string()],
        }
    }
}
