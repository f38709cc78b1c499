// src/error.rs
// =============================================================================
// Typed errors for everything below the command layer.
//
// main.rs works with anyhow::Result (any error + context), while the modules
// that touch the snapshot, the filesystem, images and the network return
// TrackerError so callers can tell a bad nonce from a missing file.
// =============================================================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot format error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Security check failed")]
    InvalidNonce,

    #[error("No {kind} found with id {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("The URL to replace must not be empty")]
    EmptyUrl,

    #[error("{url} does not appear in {source_id}")]
    UrlNotFound { url: String, source_id: String },
}

pub type Result<T> = std::result::Result<T, TrackerError>;
