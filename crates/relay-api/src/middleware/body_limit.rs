use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    http::header::CONTENT_LENGTH,
    middleware::Next,
    response::Response,
};
use relay_core::AppError;

/// Reject requests whose declared `Content-Length` already exceeds `limit`.
///
/// Runs ahead of the streaming body limit so an oversized upload is answered
/// with the JSON error body instead of the limit layer's plain-text 413.
/// Chunked bodies carry no length and fall through to the streaming check.
pub async fn reject_oversized_body(
    State(limit): State<u64>,
    request: Request,
    next: Next,
) -> Result<Response, HttpAppError> {
    let declared = request
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    if let Some(length) = declared.filter(|length| *length > limit) {
        tracing::warn!(
            content_length = length,
            limit_bytes = limit,
            "Rejecting request body over the size limit"
        );
        return Err(AppError::PayloadTooLarge(format!(
            "Request body of {} bytes exceeds the {} byte limit",
            length, limit
        ))
        .into());
    }

    Ok(next.run(request).await)
}
