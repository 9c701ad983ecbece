/// Liveness probe - process is running.
pub async fn health_check() -> &'static str {
    "OK"
}
