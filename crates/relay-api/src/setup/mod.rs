//! Application setup and initialization
//!
//! This module contains all application initialization logic extracted from main.rs
//! for better organization and testability.

pub mod routes;
pub mod server;

use crate::state::AppState;
use anyhow::{Context, Result};
use relay_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config
        .validate()
        .context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.is_production())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment(),
        media_host = %config.media_host(),
        "Configuration loaded and validated successfully"
    );

    let host = relay_storage::create_media_host(&config)
        .await
        .context("Failed to initialize media host")?;

    let state = Arc::new(AppState::new(config.clone(), host));
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
