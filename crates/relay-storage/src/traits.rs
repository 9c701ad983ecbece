//! Media host abstraction trait
//!
//! This module defines the MediaHost trait that all hosting backends must implement.

use crate::HostBackend;
use async_trait::async_trait;
use relay_core::{AccessMode, ResourceCategory};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Media host operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Upload rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Upload timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid response from media host: {0}")]
    InvalidResponse(String),

    #[error("Invalid asset key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    /// Whether repeating the same request may succeed.
    ///
    /// Transport failures, timeouts, throttling and provider-side 5xx are
    /// transient; anything the provider rejected on its merits is not.
    pub fn is_transient(&self) -> bool {
        match self {
            StorageError::UploadFailed(_) | StorageError::Timeout(_) => true,
            StorageError::Rejected { status, .. } => *status == 429 || *status >= 500,
            StorageError::InvalidResponse(_)
            | StorageError::InvalidKey(_)
            | StorageError::IoError(_)
            | StorageError::ConfigError(_) => false,
        }
    }
}

/// Result type for media host operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Everything a backend needs to publish one staged file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Staged file on local disk
    pub path: PathBuf,
    /// Filename presented to the host
    pub filename: String,
    pub resource_category: ResourceCategory,
    /// Logical folder on the host
    pub folder: String,
    /// Caller-chosen asset id; repeating it overwrites instead of duplicating
    pub public_id: String,
    pub access_mode: AccessMode,
}

/// Asset as reported back by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedAsset {
    pub secure_url: String,
    pub public_id: String,
    /// Resolved resource type, e.g. "image", "video" or "raw"
    pub resource_type: String,
    pub bytes: Option<u64>,
    pub format: Option<String>,
}

/// Media host abstraction trait
///
/// All hosting backends (Cloudinary, local directory) must implement this trait.
/// The upload lifecycle only talks to this seam, so it can be exercised with
/// fakes in tests and swapped per deployment.
#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Publish a staged file and return the hosted asset
    async fn upload(&self, request: &UploadRequest) -> StorageResult<HostedAsset>;

    /// Get the backend type
    fn backend_type(&self) -> HostBackend;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(StorageError::UploadFailed("connection reset".into()).is_transient());
        assert!(StorageError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(StorageError::Rejected {
            status: 503,
            message: "busy".into()
        }
        .is_transient());
        assert!(StorageError::Rejected {
            status: 429,
            message: "slow down".into()
        }
        .is_transient());
        assert!(!StorageError::Rejected {
            status: 401,
            message: "Invalid Signature".into()
        }
        .is_transient());
        assert!(!StorageError::InvalidResponse("not json".into()).is_transient());
    }
}
