//! Relay API Library
//!
//! This crate provides the HTTP handlers, middleware, the upload lifecycle
//! service and application setup for the upload relay.

// Module declarations
mod handlers;
mod middleware;
mod telemetry;
mod utils;

// Public modules
pub mod error;
pub mod services;
pub mod setup;
pub mod state;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use services::upload::{CleanupOutcome, ScratchDir, StagedFile, UploadService};
pub use state::AppState;
