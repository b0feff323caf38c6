//! Shared data models for the ChainCam backend.
//!
//! This crate provides Serde-serializable types for:
//! - Video records and throw outcome metadata
//! - AI analysis payloads
//! - Processing-queue items and the persisted queue document

pub mod queue;
pub mod video;

// Re-export common types
pub use queue::{
    ProcessingQueue, ProcessingStatus, QueueItem, QueueItemId, QueueStats, DEFAULT_MAX_ATTEMPTS,
};
pub use video::{AiAnalysis, FlightPath, FlightPoint, ThrowResult, VideoId, VideoMetadata, VideoRecord};
