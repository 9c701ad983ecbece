use crate::traits::{HostedAsset, MediaHost, StorageError, StorageResult, UploadRequest};
use crate::HostBackend;
use async_trait::async_trait;
use relay_core::{CloudinaryConfig, ResourceCategory, SignatureAlgorithm};
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use serde::Deserialize;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio_util::io::ReaderStream;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Longest slice of an unparseable error body kept in the error message
const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
struct CloudinaryUploadResponse {
    secure_url: String,
    public_id: String,
    resource_type: String,
    #[serde(default)]
    bytes: Option<u64>,
    #[serde(default)]
    format: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CloudinaryErrorResponse {
    error: CloudinaryErrorDetail,
}

#[derive(Debug, Deserialize)]
struct CloudinaryErrorDetail {
    message: String,
}

/// Cloudinary upload API backend
///
/// Uses signed uploads against `{api_base_url}/v1_1/{cloud_name}/{resource_type}/upload`.
/// The staged file is streamed from disk, never buffered whole.
#[derive(Clone)]
pub struct CloudinaryHost {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    api_base_url: String,
    signature_algorithm: SignatureAlgorithm,
}

impl CloudinaryHost {
    pub fn new(config: &CloudinaryConfig) -> StorageResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(CloudinaryHost {
            client,
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            signature_algorithm: config.signature_algorithm,
        })
    }

    fn upload_url(&self, category: ResourceCategory) -> String {
        format!(
            "{}/v1_1/{}/{}/upload",
            self.api_base_url,
            self.cloud_name,
            category.as_str()
        )
    }

    /// Parameters covered by the signature. `file`, `api_key` and the
    /// resource type in the path are excluded by the Cloudinary signing rules.
    fn signed_params(request: &UploadRequest, timestamp: i64) -> BTreeMap<&'static str, String> {
        let mut params = BTreeMap::new();
        params.insert("access_mode", request.access_mode.as_str().to_string());
        params.insert("folder", request.folder.clone());
        params.insert("overwrite", "true".to_string());
        params.insert("public_id", request.public_id.clone());
        params.insert("timestamp", timestamp.to_string());
        params
    }

    /// Hex digest of `k1=v1&k2=v2...` (keys sorted) followed by the API secret.
    fn sign(&self, params: &BTreeMap<&'static str, String>) -> String {
        let to_sign = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        let payload = format!("{}{}", to_sign, self.api_secret);

        match self.signature_algorithm {
            SignatureAlgorithm::Sha1 => hex::encode(Sha1::digest(payload.as_bytes())),
            SignatureAlgorithm::Sha256 => hex::encode(Sha256::digest(payload.as_bytes())),
        }
    }

    async fn file_part(request: &UploadRequest) -> StorageResult<Part> {
        // Local I/O failures are not retryable against the host
        let file = tokio::fs::File::open(&request.path).await.map_err(|e| {
            tracing::error!(
                path = %request.path.display(),
                error = %e,
                "Failed to open staged file"
            );
            StorageError::IoError(e)
        })?;
        let length = file.metadata().await?.len();
        let body = Body::wrap_stream(ReaderStream::new(file));

        Ok(Part::stream_with_length(body, length).file_name(request.filename.clone()))
    }
}

fn truncate_body(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

fn map_transport_error(err: reqwest::Error) -> StorageError {
    if err.is_timeout() {
        StorageError::Timeout(CONNECT_TIMEOUT)
    } else {
        StorageError::UploadFailed(err.to_string())
    }
}

#[async_trait]
impl MediaHost for CloudinaryHost {
    async fn upload(&self, request: &UploadRequest) -> StorageResult<HostedAsset> {
        let start = std::time::Instant::now();
        let params = Self::signed_params(request, chrono::Utc::now().timestamp());
        let signature = self.sign(&params);

        let mut form = Form::new().part("file", Self::file_part(request).await?);
        for (key, value) in params {
            form = form.text(key, value);
        }
        form = form
            .text("api_key", self.api_key.clone())
            .text("signature", signature);

        let response = self
            .client
            .post(self.upload_url(request.resource_category))
            .multipart(form)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            let message = serde_json::from_str::<CloudinaryErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| truncate_body(&body));

            tracing::error!(
                status = status.as_u16(),
                error = %message,
                public_id = %request.public_id,
                resource_category = %request.resource_category,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Cloudinary upload rejected"
            );

            return Err(StorageError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: CloudinaryUploadResponse = serde_json::from_str(&body)
            .map_err(|e| StorageError::InvalidResponse(e.to_string()))?;

        tracing::info!(
            public_id = %parsed.public_id,
            resource_type = %parsed.resource_type,
            size_bytes = parsed.bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Cloudinary upload successful"
        );

        Ok(HostedAsset {
            secure_url: parsed.secure_url,
            public_id: parsed.public_id,
            resource_type: parsed.resource_type,
            bytes: parsed.bytes,
            format: parsed.format,
        })
    }

    fn backend_type(&self) -> HostBackend {
        HostBackend::Cloudinary
    }
}
