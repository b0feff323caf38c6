//! Worker configuration.

use std::time::Duration;

/// Simulated-worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How long to sleep when the queue is drained
    pub poll_interval: Duration,
    /// Lower bound on simulated analysis latency
    pub min_latency: Duration,
    /// Upper bound on simulated analysis latency
    pub max_latency: Duration,
    /// Probability the AI agrees with the human rating
    pub agree_probability: f64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            min_latency: Duration::from_secs(3),
            max_latency: Duration::from_secs(7),
            agree_probability: 0.7,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            poll_interval: duration_env("WORKER_POLL_INTERVAL_SECS", defaults.poll_interval),
            min_latency: duration_env("WORKER_MIN_LATENCY_SECS", defaults.min_latency),
            max_latency: duration_env("WORKER_MAX_LATENCY_SECS", defaults.max_latency),
            agree_probability: std::env::var("WORKER_AGREE_PROBABILITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.agree_probability),
        }
    }

    /// Zero-latency config for tests.
    pub fn instant() -> Self {
        Self {
            poll_interval: Duration::from_millis(1),
            min_latency: Duration::ZERO,
            max_latency: Duration::ZERO,
            ..Self::default()
        }
    }
}

fn duration_env(var: &str, default: Duration) -> Duration {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}
