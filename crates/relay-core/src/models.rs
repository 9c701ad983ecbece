//! Domain models for a single upload as it moves through the relay.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;

/// File descriptor parsed from the multipart body.
///
/// Carries only what the acceptance policy and classifier need; the payload
/// bytes travel separately so the descriptor can be inspected before anything
/// touches disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingFile {
    pub original_name: String,
    pub declared_mime_type: String,
    pub size_bytes: u64,
}

impl IncomingFile {
    pub fn new(
        original_name: impl Into<String>,
        declared_mime_type: impl Into<String>,
        size_bytes: u64,
    ) -> Self {
        Self {
            original_name: original_name.into(),
            declared_mime_type: declared_mime_type.into(),
            size_bytes,
        }
    }

    /// Lowercased extension of the original filename, without the leading dot.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.original_name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .map(|e| e.to_lowercase())
    }
}

/// Provider-side classification requested for an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceCategory {
    /// Image, video or audio; the provider detects the concrete type.
    Auto,
    /// Documents and other files stored byte-for-byte.
    Raw,
}

impl ResourceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceCategory::Auto => "auto",
            ResourceCategory::Raw => "raw",
        }
    }
}

impl Display for ResourceCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Outcome of a successful remote upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    public_url: String,
    provider_asset_id: String,
    resource_category: ResourceCategory,
    resource_type: String,
    original_name: String,
}

impl UploadResult {
    pub fn new(
        public_url: String,
        provider_asset_id: String,
        resource_category: ResourceCategory,
        resource_type: String,
        original_name: String,
    ) -> Self {
        Self {
            public_url,
            provider_asset_id,
            resource_category,
            resource_type,
            original_name,
        }
    }

    pub fn public_url(&self) -> &str {
        &self.public_url
    }

    pub fn provider_asset_id(&self) -> &str {
        &self.provider_asset_id
    }

    /// Category that was requested from the provider.
    pub fn resource_category(&self) -> ResourceCategory {
        self.resource_category
    }

    /// Resource type as resolved by the provider (e.g. "image", "video", "raw").
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }
}
