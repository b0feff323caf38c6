//! Worker loop: claim the next pending item, analyze, report back.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, warn};

use chaincam_queue::QueueManager;
use chaincam_store::VideoRecordStore;

use crate::analyzer::SimulatedAnalyzer;
use crate::config::WorkerConfig;

/// Sequential single-consumer worker over the processing queue.
///
/// The queue guarantees claim atomicity only within one process, so one
/// worker per backend is the supported deployment. Failures are reported
/// back through the queue's retry counter; an item that keeps failing goes
/// terminal after its attempts are exhausted.
pub struct Worker {
    config: WorkerConfig,
    queue: Arc<QueueManager>,
    records: VideoRecordStore,
    analyzer: SimulatedAnalyzer,
    shutdown: watch::Sender<bool>,
}

impl Worker {
    /// Create a new worker.
    pub fn new(config: WorkerConfig, queue: Arc<QueueManager>, records: VideoRecordStore) -> Self {
        let analyzer = SimulatedAnalyzer::new(config.clone());
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            queue,
            records,
            analyzer,
            shutdown,
        }
    }

    /// Request the run loop to stop after the in-flight item.
    pub fn trigger_shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Run until shutdown is triggered.
    pub async fn run(&self) {
        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            "starting analysis worker"
        );

        let mut shutdown_rx = self.shutdown.subscribe();
        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            let processed = self.process_next().await;
            if !processed {
                // Queue drained; idle until the next poll or shutdown.
                tokio::select! {
                    _ = shutdown_rx.changed() => {}
                    _ = tokio::time::sleep(self.config.poll_interval) => {}
                }
            }
        }

        info!("analysis worker stopped");
    }

    /// Claim and process one item. Returns `false` when the queue had
    /// nothing claimable.
    pub async fn process_next(&self) -> bool {
        let Some(item) = self.queue.claim_next() else {
            return false;
        };

        let Some(record) = self.records.get_by_id(&item.video_id) else {
            warn!(item_id = %item.id, video_id = %item.video_id, "queued video has no record");
            self.queue.fail(&item.id, "video record not found");
            return true;
        };

        info!(item_id = %item.id, video_id = %record.id, attempt = item.attempts + 1, "processing video");

        match self.analyzer.analyze(&record).await {
            Ok(analysis) => {
                info!(
                    item_id = %item.id,
                    detected = %analysis.detected_result,
                    confidence = analysis.confidence,
                    "analysis complete"
                );
                if self.queue.complete(&item.id, analysis).is_none() {
                    error!(item_id = %item.id, "failed to report completion");
                }
            }
            Err(e) => {
                warn!(item_id = %item.id, "analysis failed: {e}");
                self.queue.fail(&item.id, e.to_string());
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chaincam_models::{ProcessingStatus, ThrowResult, VideoRecord};
    use chaincam_queue::QueueConfig;
    use chaincam_store::{DocumentBackend, MemoryBackend};

    fn worker() -> (Worker, Arc<QueueManager>, VideoRecordStore) {
        let backend: Arc<dyn DocumentBackend> = Arc::new(MemoryBackend::new());
        let records = VideoRecordStore::new(Arc::clone(&backend));
        let queue = Arc::new(QueueManager::new(
            backend,
            records.clone(),
            QueueConfig::default(),
        ));
        let worker = Worker::new(WorkerConfig::instant(), Arc::clone(&queue), records.clone());
        (worker, queue, records)
    }

    #[tokio::test]
    async fn test_process_next_completes_item_and_annotates_record() {
        let (worker, queue, records) = worker();
        let record = VideoRecord::new("https://blob.example/throw.webm", ThrowResult::Ace);
        records.save(&record);
        let item = queue.add_to_queue(&record, 1).unwrap();

        assert!(worker.process_next().await);

        let items = queue.get_all_items();
        assert_eq!(items[0].id, item.id);
        assert_eq!(items[0].status, ProcessingStatus::Completed);

        let annotated = records.get_by_id(&record.id).unwrap();
        assert!(annotated.is_ai_processed());
        assert!(annotated
            .metadata
            .unwrap()
            .ai_analysis
            .unwrap()
            .analyzed_video_url
            .contains("_analyzed"));
    }

    #[tokio::test]
    async fn test_process_next_fails_item_with_missing_record() {
        let (worker, queue, records) = worker();
        let record = VideoRecord::new("https://blob.example/throw.webm", ThrowResult::Hit);
        records.save(&record);
        let item = queue.add_to_queue(&record, 1).unwrap();

        // Wipe the record collection out from under the queue.
        let ghost = VideoRecord::new("https://blob.example/other.webm", ThrowResult::Miss);
        let queue_item = queue.add_to_queue(&ghost, 5).unwrap();

        assert!(worker.process_next().await);
        let updated = queue
            .get_all_items()
            .into_iter()
            .find(|i| i.id == queue_item.id)
            .unwrap();
        assert_eq!(updated.attempts, 1);
        assert_eq!(updated.status, ProcessingStatus::Pending);
        assert_eq!(updated.error.as_deref(), Some("video record not found"));

        // The video with a record is untouched so far.
        let other = queue
            .get_all_items()
            .into_iter()
            .find(|i| i.id == item.id)
            .unwrap();
        assert_eq!(other.status, ProcessingStatus::Pending);
        assert_eq!(other.attempts, 0);
    }

    #[tokio::test]
    async fn test_process_next_reports_analysis_failure() {
        let (worker, queue, records) = worker();
        let record = VideoRecord::new("", ThrowResult::Hit);
        records.save(&record);
        let item = queue.add_to_queue(&record, 1).unwrap();

        assert!(worker.process_next().await);

        let updated = queue
            .get_all_items()
            .into_iter()
            .find(|i| i.id == item.id)
            .unwrap();
        assert_eq!(updated.status, ProcessingStatus::Pending);
        assert_eq!(updated.attempts, 1);
        assert_eq!(
            updated.error.as_deref(),
            Some("Analysis failed: video has no source url")
        );
    }

    #[tokio::test]
    async fn test_process_next_on_empty_queue() {
        let (worker, _, _) = worker();
        assert!(!worker.process_next().await);
    }
}
