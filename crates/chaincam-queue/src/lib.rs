//! Processing-queue state machine for ChainCam.
//!
//! This crate provides:
//! - The [`QueueManager`] driving queue items through
//!   pending -> processing -> completed/failed with bounded retries
//! - Atomic claim of the next eligible item (single-process)
//! - Status mirroring onto the associated video record

pub mod config;
pub mod error;
pub mod manager;

pub use config::QueueConfig;
pub use error::{QueueError, QueueResult};
pub use manager::{QueueManager, QUEUE_KEY};
