//! Configuration module
//!
//! This module provides configuration structures for the relay: server
//! settings, media host credentials and the upload lifecycle knobs. Everything
//! is read once from the environment (optionally via a `.env` file) and then
//! passed explicitly to the components that need it.

use std::env;
use std::fmt;
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_CLOUDINARY_API_BASE_URL, DEFAULT_MAX_FILE_SIZE_MB, DEFAULT_SCRATCH_DIR,
    DEFAULT_UPLOAD_FOLDER,
};
use crate::host_types::{AccessMode, HostBackend, SignatureAlgorithm};
use crate::policy::AcceptancePolicy;

// Common constants
const SERVER_PORT: u16 = 4000;
const HTTP_CONCURRENCY_LIMIT: usize = 10_000;
const UPLOAD_TIMEOUT_SECS: u64 = 60;
const UPLOAD_MAX_RETRIES: u32 = 2;
const UPLOAD_RETRY_BACKOFF_MS: u64 = 500;

/// Server-level configuration
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub http_concurrency_limit: usize,
}

/// Cloudinary credentials and endpoint
#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub api_base_url: String,
    pub signature_algorithm: SignatureAlgorithm,
}

impl fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[redacted]")
            .field("api_base_url", &self.api_base_url)
            .field("signature_algorithm", &self.signature_algorithm)
            .finish()
    }
}

/// Upload lifecycle configuration
#[derive(Clone, Debug)]
pub struct UploadConfig {
    /// Directory holding staged files between receipt and remote upload
    pub scratch_dir: PathBuf,
    pub max_file_size_bytes: u64,
    pub allowed_content_types: Vec<String>,
    /// Logical folder on the media host
    pub folder: String,
    pub access_mode: AccessMode,
    /// Per-attempt timeout for the remote upload call
    pub timeout_secs: u64,
    /// Retries after the first attempt, transient failures only
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl UploadConfig {
    pub fn acceptance_policy(&self) -> AcceptancePolicy {
        AcceptancePolicy::new(self.max_file_size_bytes, self.allowed_content_types.clone())
    }
}

/// Relay configuration
#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub base: BaseConfig,
    pub media_host: HostBackend,
    pub cloudinary: CloudinaryConfig,
    pub local_host_path: Option<String>,
    pub local_host_base_url: Option<String>,
    pub upload: UploadConfig,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<RelayConfig>);

impl Config {
    pub fn new(config: RelayConfig) -> Self {
        Config(Box::new(config))
    }

    fn inner(&self) -> &RelayConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_environment(&self.inner().base.environment)
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = RelayConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    // Convenience getters for common fields
    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn http_concurrency_limit(&self) -> usize {
        self.inner().base.http_concurrency_limit
    }

    pub fn media_host(&self) -> HostBackend {
        self.inner().media_host
    }

    pub fn cloudinary(&self) -> &CloudinaryConfig {
        &self.inner().cloudinary
    }

    pub fn local_host_path(&self) -> Option<&str> {
        self.inner().local_host_path.as_deref()
    }

    pub fn local_host_base_url(&self) -> Option<&str> {
        self.inner().local_host_base_url.as_deref()
    }

    pub fn upload(&self) -> &UploadConfig {
        &self.inner().upload
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.inner().upload.max_file_size_bytes
    }
}

fn is_production_environment(environment: &str) -> bool {
    let environment = environment.to_lowercase();
    environment == "production" || environment == "prod"
}

fn ceiling_from_mb(max_file_size_mb: u64) -> Result<u64, anyhow::Error> {
    max_file_size_mb
        .checked_mul(1024 * 1024)
        .ok_or_else(|| anyhow::anyhow!("MAX_FILE_SIZE_MB is too large: {}", max_file_size_mb))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        if is_production_environment(&environment) && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let max_file_size_mb = env::var("MAX_FILE_SIZE_MB")
            .unwrap_or_else(|_| DEFAULT_MAX_FILE_SIZE_MB.to_string())
            .parse::<u64>()
            .unwrap_or(DEFAULT_MAX_FILE_SIZE_MB);
        let max_file_size_bytes = ceiling_from_mb(max_file_size_mb)?;

        let allowed_content_types = env::var("ALLOWED_CONTENT_TYPES")
            .map(|s| split_list(&s.to_lowercase()))
            .unwrap_or_else(|_| {
                AcceptancePolicy::DEFAULT_ALLOWED_CONTENT_TYPES
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            });

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins: split_list(&cors_origins_str),
            environment,
            http_concurrency_limit: env::var("HTTP_CONCURRENCY_LIMIT")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(HTTP_CONCURRENCY_LIMIT)
                .max(1),
        };

        let config = RelayConfig {
            base,
            media_host: env::var("MEDIA_HOST")
                .ok()
                .map(|s| s.parse())
                .transpose()?
                .unwrap_or(HostBackend::Cloudinary),
            cloudinary: CloudinaryConfig {
                cloud_name: env::var("CLOUDINARY_CLOUD_NAME").unwrap_or_default(),
                api_key: env::var("CLOUDINARY_API_KEY").unwrap_or_default(),
                api_secret: env::var("CLOUDINARY_API_SECRET").unwrap_or_default(),
                api_base_url: env::var("CLOUDINARY_API_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_CLOUDINARY_API_BASE_URL.to_string()),
                signature_algorithm: env::var("CLOUDINARY_SIGNATURE_ALGORITHM")
                    .ok()
                    .map(|s| s.parse())
                    .transpose()?
                    .unwrap_or_default(),
            },
            local_host_path: env::var("LOCAL_HOST_PATH").ok().filter(|s| !s.is_empty()),
            local_host_base_url: env::var("LOCAL_HOST_BASE_URL")
                .ok()
                .filter(|s| !s.is_empty()),
            upload: UploadConfig {
                scratch_dir: PathBuf::from(
                    env::var("SCRATCH_DIR").unwrap_or_else(|_| DEFAULT_SCRATCH_DIR.to_string()),
                ),
                max_file_size_bytes,
                allowed_content_types,
                folder: env::var("UPLOAD_FOLDER")
                    .unwrap_or_else(|_| DEFAULT_UPLOAD_FOLDER.to_string()),
                access_mode: env::var("UPLOAD_ACCESS_MODE")
                    .ok()
                    .map(|s| s.parse())
                    .transpose()?
                    .unwrap_or_default(),
                timeout_secs: env::var("UPLOAD_TIMEOUT_SECS")
                    .unwrap_or_else(|_| UPLOAD_TIMEOUT_SECS.to_string())
                    .parse()
                    .unwrap_or(UPLOAD_TIMEOUT_SECS),
                max_retries: env::var("UPLOAD_MAX_RETRIES")
                    .unwrap_or_else(|_| UPLOAD_MAX_RETRIES.to_string())
                    .parse()
                    .unwrap_or(UPLOAD_MAX_RETRIES),
                retry_backoff_ms: env::var("UPLOAD_RETRY_BACKOFF_MS")
                    .unwrap_or_else(|_| UPLOAD_RETRY_BACKOFF_MS.to_string())
                    .parse()
                    .unwrap_or(UPLOAD_RETRY_BACKOFF_MS),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.upload.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be greater than 0"));
        }

        if self.upload.timeout_secs == 0 {
            return Err(anyhow::anyhow!("UPLOAD_TIMEOUT_SECS must be greater than 0"));
        }

        if self.upload.allowed_content_types.is_empty() {
            return Err(anyhow::anyhow!("ALLOWED_CONTENT_TYPES must not be empty"));
        }

        if self.upload.folder.trim().is_empty() {
            return Err(anyhow::anyhow!("UPLOAD_FOLDER must not be empty"));
        }

        match self.media_host {
            HostBackend::Cloudinary => {
                let cloudinary = &self.cloudinary;
                for (name, value) in [
                    ("CLOUDINARY_CLOUD_NAME", &cloudinary.cloud_name),
                    ("CLOUDINARY_API_KEY", &cloudinary.api_key),
                    ("CLOUDINARY_API_SECRET", &cloudinary.api_secret),
                ] {
                    if value.trim().is_empty() {
                        return Err(anyhow::anyhow!(
                            "{} must be set when using the Cloudinary media host",
                            name
                        ));
                    }
                }
                if !cloudinary.api_base_url.starts_with("http://")
                    && !cloudinary.api_base_url.starts_with("https://")
                {
                    return Err(anyhow::anyhow!(
                        "CLOUDINARY_API_BASE_URL must be an http(s) URL"
                    ));
                }
            }
            HostBackend::Local => {
                if self.local_host_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_HOST_PATH must be set when using the local media host"
                    ));
                }
                if self.local_host_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_HOST_BASE_URL must be set when using the local media host"
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> RelayConfig {
        RelayConfig {
            base: BaseConfig {
                server_port: 4000,
                cors_origins: vec!["*".to_string()],
                environment: "test".to_string(),
                http_concurrency_limit: 16,
            },
            media_host: HostBackend::Cloudinary,
            cloudinary: CloudinaryConfig {
                cloud_name: "demo".to_string(),
                api_key: "123456".to_string(),
                api_secret: "s3cr3t".to_string(),
                api_base_url: DEFAULT_CLOUDINARY_API_BASE_URL.to_string(),
                signature_algorithm: SignatureAlgorithm::Sha1,
            },
            local_host_path: None,
            local_host_base_url: None,
            upload: UploadConfig {
                scratch_dir: PathBuf::from("temp_uploads"),
                max_file_size_bytes: 100 * 1024 * 1024,
                allowed_content_types: vec!["image/jpeg".to_string()],
                folder: "relay_uploads".to_string(),
                access_mode: AccessMode::Public,
                timeout_secs: 60,
                max_retries: 2,
                retry_backoff_ms: 500,
            },
        }
    }

    #[test]
    fn valid_cloudinary_config_passes() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn missing_cloudinary_secret_is_rejected() {
        let mut config = sample_config();
        config.cloudinary.api_secret = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("CLOUDINARY_API_SECRET"));
    }

    #[test]
    fn local_host_requires_path_and_url() {
        let mut config = sample_config();
        config.media_host = HostBackend::Local;
        assert!(config.validate().is_err());

        config.local_host_path = Some("/tmp/relay".to_string());
        config.local_host_base_url = Some("http://localhost:4000/media".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn file_size_ceiling_overflow_is_rejected() {
        assert_eq!(ceiling_from_mb(100).unwrap(), 100 * 1024 * 1024);
        assert!(ceiling_from_mb(u64::MAX / 1024).is_err());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut config = sample_config();
        config.upload.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_output_redacts_secret() {
        let config = sample_config();
        let rendered = format!("{:?}", config.cloudinary);
        assert!(!rendered.contains("s3cr3t"));
        assert!(rendered.contains("[redacted]"));
    }

    #[test]
    fn production_detection() {
        let mut config = sample_config();
        assert!(!Config::new(config.clone()).is_production());
        config.base.environment = "PROD".to_string();
        assert!(Config::new(config).is_production());
    }

    #[test]
    fn acceptance_policy_follows_upload_config() {
        let config = sample_config();
        let policy = config.upload.acceptance_policy();
        assert_eq!(policy.max_file_size_bytes(), 100 * 1024 * 1024);
        assert_eq!(policy.allowed_content_types(), ["image/jpeg".to_string()]);
    }
}
