use crate::traits::{HostedAsset, MediaHost, StorageError, StorageResult, UploadRequest};
use crate::HostBackend;
use async_trait::async_trait;
use relay_core::ResourceCategory;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Local directory media host for development
///
/// Copies staged files under `{base_path}/{folder}/{public_id}` and reports
/// them as served from `base_url`. No signing, no network.
#[derive(Clone)]
pub struct LocalHost {
    base_path: PathBuf,
    base_url: String,
}

impl LocalHost {
    /// Create a new LocalHost instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for hosted files (e.g., "./local_media")
    /// * `base_url` - Base URL the files are served from (e.g., "http://localhost:4000/media")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create host directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalHost {
            base_path,
            base_url,
        })
    }

    /// Convert asset key to filesystem path, refusing anything that could
    /// escape the base directory.
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.contains("..") || key.starts_with('/') || key.contains('\\') {
            return Err(StorageError::InvalidKey(
                "Asset key contains invalid characters".to_string(),
            ));
        }

        let path = self.base_path.join(key);
        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        if let Ok(canonical) = path.canonicalize() {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Asset key resolves outside host directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    /// `{folder}/{public_id}`, with the staged file's extension appended when
    /// the public id carries none.
    fn asset_key(request: &UploadRequest) -> String {
        let mut key = format!("{}/{}", request.folder.trim_matches('/'), request.public_id);
        if Path::new(&request.public_id).extension().is_none() {
            if let Some(ext) = Self::format_of(request) {
                key.push('.');
                key.push_str(&ext);
            }
        }
        key
    }

    fn format_of(request: &UploadRequest) -> Option<String> {
        Path::new(&request.filename)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .map(|e| e.to_lowercase())
    }

    /// Mirror the provider's auto-detection closely enough for development.
    fn resolve_resource_type(request: &UploadRequest) -> &'static str {
        if request.resource_category == ResourceCategory::Raw {
            return "raw";
        }
        match mime_guess::from_path(&request.filename).first() {
            Some(mime) if mime.type_() == mime_guess::mime::IMAGE => "image",
            Some(mime)
                if mime.type_() == mime_guess::mime::VIDEO
                    || mime.type_() == mime_guess::mime::AUDIO =>
            {
                "video"
            }
            _ => "raw",
        }
    }

    fn generate_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}

#[async_trait]
impl MediaHost for LocalHost {
    async fn upload(&self, request: &UploadRequest) -> StorageResult<HostedAsset> {
        let key = Self::asset_key(request);
        let path = self.key_to_path(&key)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let start = std::time::Instant::now();
        let bytes = fs::copy(&request.path, &path).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to copy {} to {}: {}",
                request.path.display(),
                path.display(),
                e
            ))
        })?;

        tracing::debug!(
            key = %key,
            size_bytes = bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local host upload successful"
        );

        Ok(HostedAsset {
            secure_url: self.generate_url(&key),
            public_id: format!("{}/{}", request.folder.trim_matches('/'), request.public_id),
            resource_type: Self::resolve_resource_type(request).to_string(),
            bytes: Some(bytes),
            format: Self::format_of(request),
        })
    }

    fn backend_type(&self) -> HostBackend {
        HostBackend::Local
    }
}
