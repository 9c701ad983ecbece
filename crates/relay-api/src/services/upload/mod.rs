//! Upload lifecycle: staging to scratch storage and forwarding to the media host.

pub mod service;
pub mod staging;

pub use service::{UploadPayload, UploadService};
pub use staging::{cleanup, CleanupOutcome, ScratchDir, StagedFile, StagingError};
