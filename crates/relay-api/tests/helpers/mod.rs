//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p relay-api --test upload_test`.
//! The media host is an in-process fake; no network access is needed.

#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use relay_api::setup::routes;
use relay_api::state::AppState;
use relay_core::{
    AcceptancePolicy, AccessMode, BaseConfig, CloudinaryConfig, Config, HostBackend, RelayConfig,
    SignatureAlgorithm, UploadConfig,
};
use relay_storage::{HostedAsset, MediaHost, StorageError, StorageResult, UploadRequest};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// How the fake media host answers.
#[derive(Clone, Copy)]
pub enum HostBehavior {
    Succeed,
    Reject { status: u16 },
}

/// Records every call so tests can assert the host was (or was not) reached.
pub struct FakeHost {
    behavior: HostBehavior,
    calls: AtomicUsize,
    requests: Mutex<Vec<UploadRequest>>,
    staged_present: Mutex<Vec<bool>>,
}

impl FakeHost {
    pub fn new(behavior: HostBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            staged_present: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<UploadRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Whether the staged file existed on disk when each call was made.
    pub fn staged_present(&self) -> Vec<bool> {
        self.staged_present.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaHost for FakeHost {
    async fn upload(&self, request: &UploadRequest) -> StorageResult<HostedAsset> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        self.staged_present
            .lock()
            .unwrap()
            .push(request.path.exists());

        match self.behavior {
            HostBehavior::Succeed => Ok(HostedAsset {
                secure_url: format!(
                    "https://res.example.test/{}/{}",
                    request.folder, request.public_id
                ),
                public_id: format!("{}/{}", request.folder, request.public_id),
                resource_type: match request.resource_category {
                    relay_core::ResourceCategory::Raw => "raw".to_string(),
                    relay_core::ResourceCategory::Auto => "image".to_string(),
                },
                bytes: std::fs::metadata(&request.path).ok().map(|m| m.len()),
                format: None,
            }),
            HostBehavior::Reject { status } => Err(StorageError::Rejected {
                status,
                message: "Invalid Signature".to_string(),
            }),
        }
    }

    fn backend_type(&self) -> HostBackend {
        HostBackend::Local
    }
}

/// Test application: server, fake host and the scratch directory it stages into.
pub struct TestApp {
    pub server: TestServer,
    pub host: Arc<FakeHost>,
    pub scratch_dir: PathBuf,
    _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Number of files currently staged.
    pub fn staged_files(&self) -> usize {
        count_entries(&self.scratch_dir)
    }
}

fn count_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

pub fn create_test_config(scratch_dir: PathBuf, max_file_size_bytes: u64) -> Config {
    Config::new(RelayConfig {
        base: BaseConfig {
            server_port: 4000,
            cors_origins: vec!["*".to_string()],
            environment: "test".to_string(),
            http_concurrency_limit: 64,
        },
        media_host: HostBackend::Local,
        cloudinary: CloudinaryConfig {
            cloud_name: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            api_base_url: "https://api.cloudinary.com".to_string(),
            signature_algorithm: SignatureAlgorithm::Sha1,
        },
        local_host_path: Some("unused".to_string()),
        local_host_base_url: Some("http://localhost:4000/media".to_string()),
        upload: UploadConfig {
            scratch_dir,
            max_file_size_bytes,
            allowed_content_types: AcceptancePolicy::DEFAULT_ALLOWED_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            folder: "relay_uploads".to_string(),
            access_mode: AccessMode::Public,
            timeout_secs: 5,
            max_retries: 0,
            retry_backoff_ms: 1,
        },
    })
}

/// Setup a test app with a fake media host and a fresh scratch directory.
pub fn setup_test_app(behavior: HostBehavior, max_file_size_bytes: u64) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let scratch_dir = temp_dir.path().join("temp_uploads");
    let config = create_test_config(scratch_dir.clone(), max_file_size_bytes);

    let host = FakeHost::new(behavior);
    let state = Arc::new(AppState::new(config.clone(), host.clone()));
    let app = routes::setup_routes(&config, state).expect("Failed to setup routes");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        host,
        scratch_dir,
        _temp_dir: temp_dir,
    }
}
