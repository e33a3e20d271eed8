//! Error types for the individual workflow stages.
//!
//! Each network-facing operation returns its own error so callers can tell a
//! transport failure from a rejected request or a malformed reply.

use std::path::PathBuf;

/// Failure talking to the conversion service or its token endpoint.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The request never produced an HTTP response.
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status code.
    #[error("{url} returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// The response body was missing a field or could not be decoded.
    #[error("Invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },
}

/// Failure writing to blob storage.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The storage service rejected the request.
    #[error("{target} returned HTTP {status}")]
    Status {
        target: String,
        status: u16,
        error_code: Option<String>,
    },

    /// Any other failure reported by the storage client.
    #[error("Storage request for {target} failed: {source}")]
    Azure {
        target: String,
        #[source]
        source: azure_core::Error,
    },

    /// Neither an account key nor pre-issued tokens are available.
    #[error("Storage credentials unavailable: {0}")]
    Credentials(String),
}

impl StorageError {
    /// Split HTTP rejections out of a storage client error for `target`.
    pub fn from_azure(target: impl Into<String>, source: azure_core::Error) -> Self {
        let target = target.into();
        match source.kind() {
            azure_core::error::ErrorKind::HttpResponse { status, error_code } => Self::Status {
                target,
                status: u16::from(*status),
                error_code: error_code.clone(),
            },
            _ => Self::Azure { target, source },
        }
    }
}

/// Failure uploading the local asset directory.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Input asset not found: {0:?}")]
    MissingInputAsset(PathBuf),

    #[error("Local asset directory not found: {0:?}")]
    MissingDirectory(PathBuf),

    #[error("No files found in {0:?}")]
    EmptyDirectory(PathBuf),

    #[error("Failed to walk {path:?}: {message}")]
    Walk { path: PathBuf, message: String },

    #[error("Failed to upload {path:?}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: StorageError,
    },
}
