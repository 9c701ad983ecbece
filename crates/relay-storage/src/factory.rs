#[cfg(feature = "host-cloudinary")]
use crate::CloudinaryHost;
#[cfg(feature = "host-local")]
use crate::LocalHost;
use crate::{HostBackend, MediaHost, StorageError, StorageResult};
use relay_core::Config;
use std::sync::Arc;

/// Create a media host backend based on configuration
pub async fn create_media_host(config: &Config) -> StorageResult<Arc<dyn MediaHost>> {
    match config.media_host() {
        #[cfg(feature = "host-cloudinary")]
        HostBackend::Cloudinary => {
            let host = CloudinaryHost::new(config.cloudinary())?;
            Ok(Arc::new(host))
        }

        #[cfg(not(feature = "host-cloudinary"))]
        HostBackend::Cloudinary => Err(StorageError::ConfigError(
            "Cloudinary backend not available (host-cloudinary feature not enabled)".to_string(),
        )),

        #[cfg(feature = "host-local")]
        HostBackend::Local => {
            let base_path = config.local_host_path().map(String::from).ok_or_else(|| {
                StorageError::ConfigError("LOCAL_HOST_PATH not configured".to_string())
            })?;
            let base_url = config
                .local_host_base_url()
                .map(String::from)
                .ok_or_else(|| {
                    StorageError::ConfigError("LOCAL_HOST_BASE_URL not configured".to_string())
                })?;

            let host = LocalHost::new(base_path, base_url).await?;
            Ok(Arc::new(host))
        }

        #[cfg(not(feature = "host-local"))]
        HostBackend::Local => Err(StorageError::ConfigError(
            "Local backend not available (host-local feature not enabled)".to_string(),
        )),
    }
}
