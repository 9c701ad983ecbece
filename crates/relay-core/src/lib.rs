//! Relay Core Library
//!
//! This crate provides the configuration, error types, domain models and the
//! upload acceptance/classification policy shared by the relay crates.

pub mod config;
pub mod constants;
pub mod error;
pub mod host_types;
pub mod models;
pub mod policy;

// Re-export commonly used types
pub use config::{BaseConfig, CloudinaryConfig, Config, RelayConfig, UploadConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use host_types::{AccessMode, HostBackend, SignatureAlgorithm};
pub use models::{IncomingFile, ResourceCategory, UploadResult};
pub use policy::{classify, AcceptancePolicy, ValidationError};
