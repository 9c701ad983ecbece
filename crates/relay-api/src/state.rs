//! Application state shared by the handlers.

use crate::services::upload::UploadService;
use relay_core::Config;
use relay_storage::MediaHost;
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    pub uploads: Arc<UploadService>,
}

impl AppState {
    pub fn new(config: Config, host: Arc<dyn MediaHost>) -> Self {
        let uploads = Arc::new(UploadService::new(config.upload(), host));
        Self { config, uploads }
    }
}
