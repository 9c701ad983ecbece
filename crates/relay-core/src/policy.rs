//! Upload acceptance and resource classification.
//!
//! Both halves are pure: no I/O, no shared state. The acceptance check runs
//! before a payload is staged or anything is sent to the media host, and the
//! classifier decides which resource category to request.

use crate::constants::DEFAULT_MAX_FILE_SIZE_MB;
use crate::models::{IncomingFile, ResourceCategory};

/// Reasons an upload is refused before staging.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("No file provided")]
    MissingFile,

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("File type not allowed: {content_type}")]
    DisallowedType { content_type: String },
}

/// Extensions that force the raw category whatever MIME type was declared.
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "txt", "csv"];

const DOCUMENT_CONTENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
    "text/csv",
];

/// Declared types that say nothing about the payload; the extension decides instead.
const GENERIC_CONTENT_TYPES: &[&str] = &["", "application/octet-stream", "binary/octet-stream"];

/// Normalize MIME type by stripping parameters (e.g. "text/plain; charset=utf-8" -> "text/plain").
pub fn normalize_mime_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .map(|s| s.trim())
        .unwrap_or(content_type)
        .to_lowercase()
}

/// Pick the resource category for a declared MIME type and filename extension.
///
/// A document-like extension wins over the declared type; otherwise the
/// declared type governs. The extension may be given with or without its dot.
pub fn classify(mime_type: &str, extension: Option<&str>) -> ResourceCategory {
    let extension = extension.map(|e| e.trim_start_matches('.').to_lowercase());
    if let Some(ext) = extension.as_deref() {
        if DOCUMENT_EXTENSIONS.contains(&ext) {
            return ResourceCategory::Raw;
        }
    }

    let normalized = normalize_mime_type(mime_type);
    if DOCUMENT_CONTENT_TYPES.contains(&normalized.as_str()) {
        ResourceCategory::Raw
    } else {
        ResourceCategory::Auto
    }
}

/// Classify an incoming file from its declared type and original filename.
pub fn classify_file(file: &IncomingFile) -> ResourceCategory {
    classify(&file.declared_mime_type, file.extension().as_deref())
}

/// Static allow-list plus size ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptancePolicy {
    max_file_size_bytes: u64,
    allowed_content_types: Vec<String>,
}

impl AcceptancePolicy {
    pub const DEFAULT_ALLOWED_CONTENT_TYPES: &'static [&'static str] = &[
        "image/jpeg",
        "image/jpg",
        "image/png",
        "image/gif",
        "image/webp",
        "application/pdf",
        "application/msword",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "text/plain",
        "text/csv",
        "video/mp4",
        "video/webm",
        "video/quicktime",
        "audio/mpeg",
        "audio/mp3",
    ];

    pub fn new(max_file_size_bytes: u64, allowed_content_types: Vec<String>) -> Self {
        Self {
            max_file_size_bytes,
            allowed_content_types: allowed_content_types
                .iter()
                .map(|ct| normalize_mime_type(ct))
                .filter(|ct| !ct.is_empty())
                .collect(),
        }
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_bytes
    }

    pub fn allowed_content_types(&self) -> &[String] {
        &self.allowed_content_types
    }

    pub fn accept(&self, file: &IncomingFile) -> bool {
        self.check(file).is_ok()
    }

    /// Same decision as [`accept`](Self::accept), with the reason on refusal.
    pub fn check(&self, file: &IncomingFile) -> Result<(), ValidationError> {
        if file.size_bytes > self.max_file_size_bytes {
            return Err(ValidationError::FileTooLarge {
                size: file.size_bytes,
                max: self.max_file_size_bytes,
            });
        }

        let content_type = Self::effective_content_type(file);
        if !self.allowed_content_types.contains(&content_type) {
            return Err(ValidationError::DisallowedType {
                content_type: if content_type.is_empty() {
                    file.declared_mime_type.clone()
                } else {
                    content_type
                },
            });
        }

        Ok(())
    }

    fn effective_content_type(file: &IncomingFile) -> String {
        let declared = normalize_mime_type(&file.declared_mime_type);
        if !GENERIC_CONTENT_TYPES.contains(&declared.as_str()) {
            return declared;
        }

        mime_guess::from_path(&file.original_name)
            .first()
            .map(|m| m.essence_str().to_lowercase())
            .unwrap_or(declared)
    }
}

impl Default for AcceptancePolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_FILE_SIZE_MB * 1024 * 1024,
            Self::DEFAULT_ALLOWED_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }
}
