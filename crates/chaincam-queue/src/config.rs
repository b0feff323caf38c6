//! Queue configuration.

use chaincam_models::DEFAULT_MAX_ATTEMPTS;

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Ceiling on processing attempts before a failure becomes terminal
    pub max_attempts: u32,
    /// Priority assigned when the caller does not specify one
    pub default_priority: i32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            default_priority: 1,
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_attempts: std::env::var("QUEUE_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_ATTEMPTS),
            default_priority: std::env::var("QUEUE_DEFAULT_PRIORITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
        }
    }
}
