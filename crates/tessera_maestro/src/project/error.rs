//! Error types for project hosting.

use std::path::PathBuf;

/// File-system watch setup failure. Fatal to the host that requested it.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The watched path does not exist.
    #[error("Cannot watch missing path: {}", .0.display())]
    NotFound(PathBuf),

    /// The backend refused the registration.
    #[error("Watch rejected for {}: {message}", .path.display())]
    Rejected { path: PathBuf, message: String },
}

/// Unreadable or invalid project manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// IO error.
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parse error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid include or exclude pattern.
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// Manifest file does not exist.
    #[error("Manifest not found: {}", .0.display())]
    NotFound(PathBuf),
}

/// Error type for project host operations.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("{0}")]
    Manifest(#[from] ManifestError),

    #[error("{0}")]
    Watch(#[from] WatchError),

    /// The host was disposed.
    #[error("Project host is disposed")]
    Disposed,
}

/// Result type for project host operations.
pub type ProjectResult<T> = Result<T, ProjectError>;
