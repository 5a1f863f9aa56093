//! API models for requests and responses

pub mod extension;

// Re-export commonly used types
pub use extension::*;
