//! Shared constants

/// Default size ceiling for a single upload, in MiB.
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 100;

/// Placeholder used to namespace staged files when the caller sends no identifier.
pub const ANONYMOUS_UPLOADER: &str = "anon";

/// Header carrying the caller-supplied identifier.
pub const UPLOADER_ID_HEADER: &str = "x-user-id";

/// Multipart field holding the uploaded file.
pub const UPLOAD_FIELD_NAME: &str = "file";

pub const DEFAULT_SCRATCH_DIR: &str = "temp_uploads";
pub const DEFAULT_UPLOAD_FOLDER: &str = "relay_uploads";
pub const DEFAULT_CLOUDINARY_API_BASE_URL: &str = "https://api.cloudinary.com";
