//! Error types for component lifecycle operations.

use serde::Serialize;

/// Failure tag reported to the host when an install attempt fails.
///
/// Serializes as `{"tag": "error-downloading"}` / `{"tag": "error-unzipping"}`,
/// the shape the host UI expects in completion notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(tag = "tag")]
pub enum InstallError {
    /// Network or transfer failure while fetching the archive.
    #[error("error-downloading")]
    #[serde(rename = "error-downloading")]
    Downloading,

    /// Corrupt or unreadable archive.
    #[error("error-unzipping")]
    #[serde(rename = "error-unzipping")]
    Unzipping,
}

/// Internal pipeline errors. These carry the underlying cause for logging;
/// the installer boundary maps them to the two public [`InstallError`] tags.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PackError>;
