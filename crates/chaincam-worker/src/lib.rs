//! Simulated AI analysis worker for ChainCam.
//!
//! This crate provides:
//! - A sequential claim -> analyze -> report loop over the processing queue
//! - The simulated analyzer standing in for the real AI pipeline
//! - Graceful shutdown

pub mod analyzer;
pub mod config;
pub mod error;
pub mod executor;

pub use analyzer::SimulatedAnalyzer;
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::Worker;
