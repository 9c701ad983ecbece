use crate::state::AppState;
use axum::{extract::State, response::Html};
use std::sync::Arc;

/// `GET /`: short landing page describing the upload endpoint.
pub async fn landing_page(State(state): State<Arc<AppState>>) -> Html<String> {
    let policy = state.uploads.policy();
    let max_mb = policy.max_file_size_bytes() / 1024 / 1024;
    let types = policy.allowed_content_types().join(", ");

    Html(format!(
        r#"<!DOCTYPE html>
<html>
  <head><title>Upload relay</title></head>
  <body>
    <h1>Upload relay</h1>
    <p>Send a <code>multipart/form-data</code> POST to <code>/upload</code> with one field named <code>file</code>.</p>
    <p>Optional header: <code>X-User-Id</code>.</p>
    <p>Maximum size: {max_mb} MB. Accepted types: {types}.</p>
    <p>Health check: <code>GET /health</code>.</p>
  </body>
</html>
"#
    ))
}
