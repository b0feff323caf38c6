//! Application state.

use std::sync::Arc;

use chaincam_queue::{QueueConfig, QueueManager};
use chaincam_store::{BlobClient, DocumentBackend, FileBackend, VideoRecordStore};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub records: VideoRecordStore,
    pub queue: Arc<QueueManager>,
    pub blob: Arc<BlobClient>,
}

impl AppState {
    /// Create application state with the file backend and blob client
    /// configured from the environment.
    pub fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let backend: Arc<dyn DocumentBackend> = Arc::new(FileBackend::from_env()?);
        let blob = BlobClient::from_env()?;
        Ok(Self::with_backend(config, backend, blob))
    }

    /// Create application state over an explicit backend. Tests inject a
    /// memory backend here.
    pub fn with_backend(
        config: ApiConfig,
        backend: Arc<dyn DocumentBackend>,
        blob: BlobClient,
    ) -> Self {
        let records = VideoRecordStore::new(Arc::clone(&backend));
        let queue = QueueManager::new(backend, records.clone(), QueueConfig::from_env());
        Self {
            config,
            records,
            queue: Arc::new(queue),
            blob: Arc::new(blob),
        }
    }
}
