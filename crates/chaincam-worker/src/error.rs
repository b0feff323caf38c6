//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Analysis failed: {0}")]
    Analysis(String),

    #[error("Store error: {0}")]
    Store(#[from] chaincam_store::StoreError),
}

impl WorkerError {
    pub fn analysis(msg: impl Into<String>) -> Self {
        Self::Analysis(msg.into())
    }
}
