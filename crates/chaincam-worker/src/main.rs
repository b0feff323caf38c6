//! Simulated AI worker binary.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chaincam_queue::{QueueConfig, QueueManager};
use chaincam_store::{DocumentBackend, FileBackend, VideoRecordStore};
use chaincam_worker::{Worker, WorkerConfig};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("chaincam=info".parse().expect("valid directive"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting chaincam-worker");

    let backend: Arc<dyn DocumentBackend> = match FileBackend::from_env() {
        Ok(b) => Arc::new(b),
        Err(e) => {
            error!("Failed to open data directory: {}", e);
            std::process::exit(1);
        }
    };
    let records = VideoRecordStore::new(Arc::clone(&backend));
    let queue = Arc::new(QueueManager::new(
        backend,
        records.clone(),
        QueueConfig::from_env(),
    ));

    let worker = Arc::new(Worker::new(WorkerConfig::from_env(), queue, records));

    // Stop the loop on ctrl-c
    let shutdown_worker = Arc::clone(&worker);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            shutdown_worker.trigger_shutdown();
        }
    });

    worker.run().await;
    info!("Worker shutdown complete");
}
