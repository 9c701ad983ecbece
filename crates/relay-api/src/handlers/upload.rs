use crate::error::HttpAppError;
use crate::middleware::RequestId;
use crate::state::AppState;
use crate::utils::upload::{extract_multipart_file, uploader_id};
use axum::{
    extract::{Multipart, State},
    http::HeaderMap,
    Extension, Json,
};
use relay_core::UploadResult;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
    pub name: String,
    pub public_id: String,
    pub resource_type: String,
}

impl From<UploadResult> for UploadResponse {
    fn from(result: UploadResult) -> Self {
        Self {
            url: result.public_url().to_string(),
            name: result.original_name().to_string(),
            public_id: result.provider_asset_id().to_string(),
            resource_type: result.resource_type().to_string(),
        }
    }
}

/// `POST /upload`: multipart form with a single `file` field.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, HttpAppError> {
    let uploader = uploader_id(&headers);
    let payload =
        extract_multipart_file(multipart, state.uploads.policy().max_file_size_bytes()).await?;

    tracing::debug!(
        request_id = %request_id.0,
        uploader = %uploader,
        filename = %payload.file.original_name,
        content_type = %payload.file.declared_mime_type,
        size_bytes = payload.file.size_bytes,
        "Received upload"
    );

    let result = state.uploads.upload(payload, &uploader).await?;

    Ok(Json(result.into()))
}
