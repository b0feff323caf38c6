//! Document persistence and blob upload client for ChainCam.
//!
//! This crate provides:
//! - A pluggable document backend (in-memory for tests, JSON files on disk
//!   for deployments) holding one JSON document per logical key
//! - The video record store with its degrade-silently read/write policy
//! - A thin HTTP client for the external blob storage service

pub mod backend;
pub mod blob;
pub mod error;
pub mod file;
pub mod records;

pub use backend::{DocumentBackend, MemoryBackend};
pub use blob::{BlobClient, BlobConfig};
pub use error::{StoreError, StoreResult};
pub use file::FileBackend;
pub use records::VideoRecordStore;
