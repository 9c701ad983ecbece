//! Common utilities for the upload handler

use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::{HeaderMap, StatusCode};
use bytes::BytesMut;
use relay_core::constants::{ANONYMOUS_UPLOADER, UPLOADER_ID_HEADER, UPLOAD_FIELD_NAME};
use relay_core::{AppError, IncomingFile, ValidationError};

use crate::services::upload::UploadPayload;

const MAX_UPLOADER_ID_LENGTH: usize = 64;
const MAX_FILENAME_LENGTH: usize = 255;

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::InvalidInput(format!("Failed to read multipart: {}", err.body_text()))
    }
}

/// Extract the file from a multipart form.
///
/// Only one field named "file" is accepted; other fields are ignored and a
/// second "file" field is rejected. The payload is read chunk by chunk and
/// abandoned as soon as it exceeds `max_size_bytes`.
pub async fn extract_multipart_file(
    mut multipart: Multipart,
    max_size_bytes: u64,
) -> Result<UploadPayload, AppError> {
    let mut payload: Option<UploadPayload> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD_NAME) {
            continue;
        }
        if payload.is_some() {
            return Err(AppError::InvalidInput(
                "Multiple file fields are not allowed; send exactly one field named 'file'"
                    .to_string(),
            ));
        }

        let original_name = field
            .file_name()
            .map(sanitize_filename)
            .unwrap_or_else(|| "unknown".to_string());
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let mut data = BytesMut::new();
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            data.extend_from_slice(&chunk);
            if data.len() as u64 > max_size_bytes {
                return Err(ValidationError::FileTooLarge {
                    size: data.len() as u64,
                    max: max_size_bytes,
                }
                .into());
            }
        }

        let size_bytes = data.len() as u64;
        payload = Some(UploadPayload {
            file: IncomingFile::new(original_name, content_type, size_bytes),
            data: data.freeze(),
        });
    }

    payload.ok_or_else(|| ValidationError::MissingFile.into())
}

/// Uploader id from the `X-User-Id` header, restricted to `[A-Za-z0-9_-]`.
/// Missing or empty ids become `anon`.
pub fn uploader_id(headers: &HeaderMap) -> String {
    let sanitized: String = headers
        .get(UPLOADER_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .take(MAX_UPLOADER_ID_LENGTH)
        .collect();

    if sanitized.is_empty() {
        ANONYMOUS_UPLOADER.to_string()
    } else {
        sanitized
    }
}

/// Strip any client-side directory components and control characters from a
/// filename. The result is only used for display and extension detection.
pub fn sanitize_filename(filename: &str) -> String {
    let filename_only = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    let sanitized: String = filename_only
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_FILENAME_LENGTH)
        .collect();

    let trimmed = sanitized.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        "unknown".to_string()
    } else {
        trimmed.to_string()
    }
}
