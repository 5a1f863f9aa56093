//! HTTP routes

pub mod download;
pub mod extensions;
pub mod publish;
