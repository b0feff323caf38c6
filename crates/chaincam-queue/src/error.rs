//! Queue error types.
//!
//! These stay internal to the crate: every public [`crate::QueueManager`]
//! operation catches them at the boundary and returns a safe default.

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Store error: {0}")]
    Store(#[from] chaincam_store::StoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
