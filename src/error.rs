//! Error taxonomy for directory listing and the write surface.

use std::io;
use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, error};

/// Failures that end a request for a path before anything is rendered.
#[derive(Debug, Error)]
pub enum ListingError {
    /// The requested path does not exist.
    #[error("path not found: {0}")]
    NotFound(PathBuf),

    /// The requested path exists but may not be read.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Enumerating the directory's children failed.
    #[error("could not read directory {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The handle claims to be a directory but cannot enumerate children.
    #[error("not enumerable as a directory: {0}")]
    NotEnumerable(PathBuf),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ListingError {
    /// Classifies a failed stat of the requested path.
    pub fn from_stat(path: PathBuf, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            _ => Self::Internal(format!("could not stat {}: {}", path.display(), err)),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Self::Unreadable { .. } | Self::NotEnumerable(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn body(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "file not found",
            Self::PermissionDenied(_) => "permission denied",
            Self::Unreadable { .. } => "could not load directory contents",
            Self::NotEnumerable(_) => "file does not readdir",
            Self::Internal(_) => "internal error",
        }
    }
}

impl IntoResponse for ListingError {
    fn into_response(self) -> Response {
        match &self {
            Self::NotFound(_) | Self::PermissionDenied(_) => debug!("{}", self),
            _ => error!("{}", self),
        }
        (self.status(), self.body()).into_response()
    }
}

/// Failures of upload and delete requests.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl IntoResponse for WriteError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Io(e) => {
                error!("write request failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}
