//! Upload lifecycle service
//!
//! Drives one upload through: accept → classify → stage → remote upload → cleanup.
//! Acceptance runs before anything touches disk or the network; once staged,
//! the file is released on every exit path.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use relay_core::policy::classify_file;
use relay_core::{
    AcceptancePolicy, AccessMode, AppError, IncomingFile, ResourceCategory, UploadConfig,
    UploadResult,
};
use relay_storage::{HostedAsset, MediaHost, StorageError, UploadRequest};

use super::staging::{ScratchDir, StagedFile};

/// Upper bound for a single retry delay
const MAX_RETRY_BACKOFF_MS: u64 = 8_000;

/// Delay before retry number `attempt` (0-based): `base * 2^attempt`, capped.
pub(crate) fn compute_retry_backoff(base_ms: u64, attempt: u32) -> Duration {
    let factor = 2_u64.saturating_pow(attempt);
    Duration::from_millis(base_ms.saturating_mul(factor).min(MAX_RETRY_BACKOFF_MS))
}

/// A file read from the request, not yet accepted.
#[derive(Debug, Clone)]
pub struct UploadPayload {
    pub file: IncomingFile,
    pub data: Bytes,
}

pub struct UploadService {
    host: Arc<dyn MediaHost>,
    scratch: ScratchDir,
    policy: AcceptancePolicy,
    folder: String,
    access_mode: AccessMode,
    attempt_timeout: Duration,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl UploadService {
    pub fn new(config: &UploadConfig, host: Arc<dyn MediaHost>) -> Self {
        Self {
            host,
            scratch: ScratchDir::new(config.scratch_dir.clone()),
            policy: config.acceptance_policy(),
            folder: config.folder.clone(),
            access_mode: config.access_mode,
            attempt_timeout: Duration::from_secs(config.timeout_secs),
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
        }
    }

    pub fn policy(&self) -> &AcceptancePolicy {
        &self.policy
    }

    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    /// Complete upload workflow for one request.
    pub async fn upload(
        &self,
        payload: UploadPayload,
        uploader_id: &str,
    ) -> Result<UploadResult, AppError> {
        let UploadPayload { file, data } = payload;

        self.policy.check(&file)?;
        let category = classify_file(&file);

        let staged = self
            .scratch
            .stage(&data, &file.original_name, uploader_id)
            .await?;
        drop(data);

        let result = self.forward(&staged, &file, category).await;

        let cleanup = staged.release().await;
        tracing::debug!(outcome = ?cleanup, "Staged file released");

        result
    }

    /// Send a staged file to the media host, retrying transient failures.
    ///
    /// Every attempt reuses the same public id with overwrite semantics and
    /// attempts never overlap, so at most one asset is created.
    async fn forward(
        &self,
        staged: &StagedFile,
        file: &IncomingFile,
        category: ResourceCategory,
    ) -> Result<UploadResult, AppError> {
        let request = UploadRequest {
            path: staged.path().to_path_buf(),
            filename: file.original_name.clone(),
            resource_category: category,
            folder: self.folder.clone(),
            public_id: public_id_for(staged, category),
            access_mode: self.access_mode,
        };

        let start = Instant::now();
        let mut attempt: u32 = 0;
        loop {
            match self.attempt(&request).await {
                Ok(asset) => {
                    tracing::info!(
                        public_id = %asset.public_id,
                        resource_category = %category,
                        resource_type = %asset.resource_type,
                        size_bytes = file.size_bytes,
                        attempts = attempt + 1,
                        backend = %self.host.backend_type(),
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "Upload forwarded to media host"
                    );
                    return Ok(UploadResult::new(
                        asset.secure_url,
                        asset.public_id,
                        category,
                        asset.resource_type,
                        file.original_name.clone(),
                    ));
                }
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let backoff = compute_retry_backoff(self.retry_backoff_ms, attempt);
                    tracing::warn!(
                        error = %e,
                        public_id = %request.public_id,
                        retry_count = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        "Transient media host failure, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        public_id = %request.public_id,
                        attempts = attempt + 1,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "Media host upload failed"
                    );
                    return Err(remote_error(e));
                }
            }
        }
    }

    async fn attempt(&self, request: &UploadRequest) -> Result<HostedAsset, StorageError> {
        match tokio::time::timeout(self.attempt_timeout, self.host.upload(request)).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::Timeout(self.attempt_timeout)),
        }
    }
}

/// Documents keep their extension in the public id, matching how the host
/// stores raw files; media ids are extension-less.
fn public_id_for(staged: &StagedFile, category: ResourceCategory) -> String {
    match category {
        ResourceCategory::Raw => staged.file_name().to_string(),
        ResourceCategory::Auto => staged.stem().to_string(),
    }
}

fn remote_error(err: StorageError) -> AppError {
    match err {
        StorageError::ConfigError(msg) => AppError::Internal(msg),
        other => AppError::RemoteUpload(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use relay_core::HostBackend;
    use relay_storage::StorageResult;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    enum Script {
        Succeed,
        FailWith(fn() -> StorageError),
        FailTimesThenSucceed(usize, fn() -> StorageError),
        Hang,
    }

    struct ScriptedHost {
        script: Script,
        calls: AtomicUsize,
        requests: Mutex<Vec<UploadRequest>>,
        staged_existed: Mutex<Vec<bool>>,
    }

    impl ScriptedHost {
        fn new(script: Script) -> Arc<Self> {
            Arc::new(Self {
                script,
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
                staged_existed: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MediaHost for ScriptedHost {
        async fn upload(&self, request: &UploadRequest) -> StorageResult<HostedAsset> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            self.staged_existed
                .lock()
                .unwrap()
                .push(request.path.exists());

            let ok = || HostedAsset {
                secure_url: format!("https://cdn.test/{}/{}", request.folder, request.public_id),
                public_id: format!("{}/{}", request.folder, request.public_id),
                resource_type: "image".to_string(),
                bytes: None,
                format: None,
            };
            match self.script {
                Script::Succeed => Ok(ok()),
                Script::FailWith(make) => Err(make()),
                Script::FailTimesThenSucceed(times, make) if n < times => Err(make()),
                Script::FailTimesThenSucceed(..) => Ok(ok()),
                Script::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(ok())
                }
            }
        }

        fn backend_type(&self) -> HostBackend {
            HostBackend::Local
        }
    }

    fn upload_config(scratch: &Path) -> UploadConfig {
        UploadConfig {
            scratch_dir: scratch.to_path_buf(),
            max_file_size_bytes: 1024,
            allowed_content_types: AcceptancePolicy::DEFAULT_ALLOWED_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            folder: "relay_uploads".to_string(),
            access_mode: AccessMode::Public,
            timeout_secs: 5,
            max_retries: 2,
            retry_backoff_ms: 1,
        }
    }

    fn payload(name: &str, mime: &str, size: usize) -> UploadPayload {
        UploadPayload {
            file: IncomingFile::new(name, mime, size as u64),
            data: Bytes::from(vec![7u8; size]),
        }
    }

    fn scratch_entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(compute_retry_backoff(500, 0), Duration::from_millis(500));
        assert_eq!(compute_retry_backoff(500, 1), Duration::from_millis(1000));
        assert_eq!(compute_retry_backoff(500, 3), Duration::from_millis(4000));
        assert_eq!(compute_retry_backoff(500, 10), Duration::from_millis(8000));
        assert_eq!(compute_retry_backoff(u64::MAX, 40), Duration::from_millis(8000));
    }

    #[tokio::test]
    async fn success_stages_forwards_and_cleans_up() {
        let temp = tempfile::tempdir().unwrap();
        let host = ScriptedHost::new(Script::Succeed);
        let service = UploadService::new(&upload_config(temp.path()), host.clone());

        let result = service
            .upload(payload("photo.jpg", "image/jpeg", 512), "anon")
            .await
            .unwrap();

        assert_eq!(result.original_name(), "photo.jpg");
        assert_eq!(result.resource_category(), ResourceCategory::Auto);
        assert!(result.public_url().starts_with("https://cdn.test/relay_uploads/"));
        assert_eq!(host.calls(), 1);
        assert_eq!(*host.staged_existed.lock().unwrap(), vec![true]);
        assert_eq!(scratch_entries(temp.path()), 0);
    }

    #[tokio::test]
    async fn rejected_files_never_reach_disk_or_host() {
        let temp = tempfile::tempdir().unwrap();
        let host = ScriptedHost::new(Script::Succeed);
        let service = UploadService::new(&upload_config(temp.path()), host.clone());

        let err = service
            .upload(payload("malware.exe", "application/x-msdownload", 10), "anon")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let err = service
            .upload(payload("big.jpg", "image/jpeg", 2048), "anon")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge(_)));

        assert_eq!(host.calls(), 0);
        assert_eq!(scratch_entries(temp.path()), 0);
    }

    #[tokio::test]
    async fn staging_failure_surfaces_without_host_call() {
        let temp = tempfile::tempdir().unwrap();
        let blocked = temp.path().join("temp_uploads");
        std::fs::write(&blocked, b"occupied").unwrap();
        let host = ScriptedHost::new(Script::Succeed);
        let service = UploadService::new(&upload_config(&blocked), host.clone());

        let err = service
            .upload(payload("photo.jpg", "image/jpeg", 64), "anon")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Staging(_)));
        assert_eq!(host.calls(), 0);
        assert!(blocked.is_file());
        assert_eq!(scratch_entries(temp.path()), 1);
    }

    #[tokio::test]
    async fn documents_are_sent_raw_with_extension_in_public_id() {
        let temp = tempfile::tempdir().unwrap();
        let host = ScriptedHost::new(Script::Succeed);
        let service = UploadService::new(&upload_config(temp.path()), host.clone());

        service
            .upload(payload("report.pdf", "application/pdf", 100), "user-42")
            .await
            .unwrap();

        let requests = host.requests.lock().unwrap();
        assert_eq!(requests[0].resource_category, ResourceCategory::Raw);
        assert!(requests[0].public_id.ends_with(".pdf"));
        assert!(requests[0].public_id.contains("-user-42-"));
        assert_eq!(requests[0].folder, "relay_uploads");
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried_and_cleans_up() {
        let temp = tempfile::tempdir().unwrap();
        let host = ScriptedHost::new(Script::FailWith(|| StorageError::Rejected {
            status: 401,
            message: "Invalid Signature".to_string(),
        }));
        let service = UploadService::new(&upload_config(temp.path()), host.clone());

        let err = service
            .upload(payload("report.pdf", "application/pdf", 100), "anon")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::RemoteUpload(_)));
        assert_eq!(host.calls(), 1);
        assert_eq!(scratch_entries(temp.path()), 0);
    }

    #[tokio::test]
    async fn transient_failures_retry_with_same_public_id() {
        let temp = tempfile::tempdir().unwrap();
        let host = ScriptedHost::new(Script::FailTimesThenSucceed(2, || {
            StorageError::Rejected {
                status: 503,
                message: "busy".to_string(),
            }
        }));
        let service = UploadService::new(&upload_config(temp.path()), host.clone());

        service
            .upload(payload("clip.mp4", "video/mp4", 100), "anon")
            .await
            .unwrap();

        assert_eq!(host.calls(), 3);
        let requests = host.requests.lock().unwrap();
        assert!(requests.iter().all(|r| r.public_id == requests[0].public_id));
        assert_eq!(scratch_entries(temp.path()), 0);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let temp = tempfile::tempdir().unwrap();
        let host = ScriptedHost::new(Script::FailWith(|| {
            StorageError::UploadFailed("connection reset".to_string())
        }));
        let service = UploadService::new(&upload_config(temp.path()), host.clone());

        let err = service
            .upload(payload("photo.png", "image/png", 10), "anon")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::RemoteUpload(_)));
        assert_eq!(host.calls(), 3);
        assert_eq!(scratch_entries(temp.path()), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_host_times_out_as_remote_failure() {
        let temp = tempfile::tempdir().unwrap();
        let host = ScriptedHost::new(Script::Hang);
        let mut config = upload_config(temp.path());
        config.max_retries = 0;
        let service = UploadService::new(&config, host.clone());

        let err = service
            .upload(payload("photo.png", "image/png", 10), "anon")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::RemoteUpload(ref msg) if msg.contains("timed out")));
        assert_eq!(host.calls(), 1);
        assert_eq!(scratch_entries(temp.path()), 0);
    }

    #[tokio::test]
    async fn host_config_errors_are_internal() {
        let temp = tempfile::tempdir().unwrap();
        let host = ScriptedHost::new(Script::FailWith(|| {
            StorageError::ConfigError("missing credentials".to_string())
        }));
        let service = UploadService::new(&upload_config(temp.path()), host);

        let err = service
            .upload(payload("photo.png", "image/png", 10), "anon")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
