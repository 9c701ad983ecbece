//! Scratch-directory staging with guaranteed removal.
//!
//! A staged upload is owned by a [`StagedFile`] guard. The request flow
//! releases it explicitly once the remote upload has finished; if that never
//! happens (panic, dropped future) the guard removes the file when dropped.
//! Release consumes the guard, so a file is never removed twice.

use chrono::Utc;
use relay_core::AppError;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

const MAX_EXTENSION_LENGTH: usize = 16;
const RANDOM_SUFFIX_LENGTH: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error("Failed to create scratch directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write staged file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl From<StagingError> for AppError {
    fn from(err: StagingError) -> Self {
        AppError::Staging(err.to_string())
    }
}

/// Result of removing a staged file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupOutcome {
    Removed,
    AlreadyGone,
    Failed,
}

/// Remove a staged file if present. Never fails; problems are logged.
pub async fn cleanup(path: &Path) -> CleanupOutcome {
    match fs::remove_file(path).await {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Removed staged file");
            CleanupOutcome::Removed
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "Staged file already gone");
            CleanupOutcome::AlreadyGone
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to remove staged file"
            );
            CleanupOutcome::Failed
        }
    }
}

/// Process-local directory holding uploads between receipt and remote upload.
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Write `data` to a uniquely named file under the scratch directory.
    ///
    /// The name is `{unix_millis}-{uploader}-{random}{.ext}`, where the
    /// extension comes from `suggested_name`. The directory is created on
    /// first use and the file is opened create-new, so concurrent requests
    /// can never share a path. A partially written file is removed before
    /// the error is returned.
    pub async fn stage(
        &self,
        data: &[u8],
        suggested_name: &str,
        uploader_id: &str,
    ) -> Result<StagedFile, StagingError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| StagingError::CreateDir {
                path: self.root.clone(),
                source,
            })?;

        let file_name = staged_file_name(suggested_name, uploader_id);
        let path = self.root.join(&file_name);

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|source| StagingError::Write {
                path: path.clone(),
                source,
            })?;

        // From here on the guard owns the path, so a failed write still cleans up
        let staged = StagedFile {
            path,
            file_name,
            armed: true,
        };

        let written = async {
            file.write_all(data).await?;
            file.flush().await
        }
        .await;

        if let Err(source) = written {
            let path = staged.path.clone();
            drop(file);
            staged.release().await;
            return Err(StagingError::Write { path, source });
        }

        tracing::debug!(
            path = %staged.path.display(),
            size_bytes = data.len(),
            "Staged upload"
        );

        Ok(staged)
    }
}

fn staged_file_name(suggested_name: &str, uploader_id: &str) -> String {
    let random = Uuid::new_v4().simple().to_string();
    let mut name = format!(
        "{}-{}-{}",
        Utc::now().timestamp_millis(),
        uploader_id,
        &random[..RANDOM_SUFFIX_LENGTH]
    );
    if let Some(ext) = sanitized_extension(suggested_name) {
        name.push('.');
        name.push_str(&ext);
    }
    name
}

fn sanitized_extension(suggested_name: &str) -> Option<String> {
    let ext: String = Path::new(suggested_name)
        .extension()
        .and_then(|e| e.to_str())?
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(MAX_EXTENSION_LENGTH)
        .collect::<String>()
        .to_lowercase();

    (!ext.is_empty()).then_some(ext)
}

/// Guard owning one staged file.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    file_name: String,
    armed: bool,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Staged name without its extension.
    pub fn stem(&self) -> &str {
        Path::new(&self.file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.file_name)
    }

    /// Remove the staged file and disarm the guard.
    pub async fn release(mut self) -> CleanupOutcome {
        self.armed = false;
        cleanup(&self.path).await
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::warn!(
                    path = %self.path.display(),
                    "Staged file removed by guard without explicit release"
                );
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to remove staged file on drop"
                );
            }
        }
    }
}
