//! Relay Storage Library
//!
//! This crate provides the outbound media host abstraction and its
//! implementations. It includes the `MediaHost` trait, a Cloudinary backend
//! and a local directory backend for development.
//!
//! # Asset layout
//!
//! Every backend places an asset at `{folder}/{public_id}`, where the folder
//! comes from configuration and the public id is chosen by the caller. Reusing
//! a public id overwrites the earlier asset instead of creating a second one.

#[cfg(feature = "host-cloudinary")]
pub mod cloudinary;
pub mod factory;
#[cfg(feature = "host-local")]
pub mod local;
pub mod traits;

// Re-export commonly used types
#[cfg(feature = "host-cloudinary")]
pub use cloudinary::CloudinaryHost;
pub use factory::create_media_host;
#[cfg(feature = "host-local")]
pub use local::LocalHost;
pub use relay_core::HostBackend;
pub use traits::{HostedAsset, MediaHost, StorageError, StorageResult, UploadRequest};
