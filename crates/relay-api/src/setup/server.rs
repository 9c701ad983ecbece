//! Server startup and graceful shutdown

use anyhow::Result;
use axum::Router;
use relay_core::Config;
use std::future::Future;

/// Start the server with graceful shutdown
pub async fn start_server(config: &Config, app: Router) -> Result<()> {
    let addr = format!("0.0.0.0:{}", config.server_port());
    tracing::info!(addr = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let upload = config.upload();
    tracing::info!(
        max_file_size_mb = config.max_file_size_bytes() / 1024 / 1024,
        allowed_content_types = %upload.allowed_content_types.join(","),
        scratch_dir = %upload.scratch_dir.display(),
        folder = %upload.folder,
        timeout_secs = upload.timeout_secs,
        max_retries = upload.max_retries,
        "Server ready and accepting connections"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Which signal ended the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownReason {
    Interrupt,
    Terminate,
}

/// Resolves on Ctrl+C or SIGTERM. In-flight uploads finish, including
/// removal of their staged files, before the server exits.
async fn shutdown_signal() {
    let reason = wait_for_shutdown(interrupt(), terminate()).await;
    tracing::info!(reason = ?reason, "Shutting down gracefully, draining in-flight uploads");
}

async fn wait_for_shutdown(
    interrupt: impl Future<Output = ()>,
    terminate: impl Future<Output = ()>,
) -> ShutdownReason {
    tokio::select! {
        _ = interrupt => ShutdownReason::Interrupt,
        _ = terminate => ShutdownReason::Terminate,
    }
}

/// A handler that cannot be installed never fires; the other signal still can.
async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for SIGTERM");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
