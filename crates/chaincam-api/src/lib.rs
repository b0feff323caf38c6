//! Axum HTTP API for ChainCam.
//!
//! Thin routes over the record store, the processing queue, and the blob
//! upload client: upload a rated throw, list records, hand the next pending
//! video to the AI, and accept the AI completion webhook.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
