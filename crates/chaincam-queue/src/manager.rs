//! Queue manager: persistence and transitions for processing-queue items.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use chaincam_models::{
    AiAnalysis, ProcessingQueue, ProcessingStatus, QueueItem, QueueItemId, QueueStats, VideoRecord,
};
use chaincam_store::{DocumentBackend, VideoRecordStore};

use crate::config::QueueConfig;
use crate::error::QueueResult;

/// Document key the queue is persisted under.
pub const QUEUE_KEY: &str = "processing-queue";

/// Drives queue items through pending -> processing -> completed/failed
/// with bounded retries, persisting the whole queue document on every
/// mutation and mirroring status onto the associated video record.
///
/// Every public operation catches persistence errors at the boundary, logs
/// them, and returns a safe default (`None`, `false`, zeroed stats).
/// Callers inspect return values; no operation raises.
///
/// Mutations serialize on an internal lock, which makes [`claim_next`]
/// atomic for the single-process deployment this queue targets. Sharing
/// the backend between processes would reintroduce the claim race; that
/// deployment needs a conditional update in a real database.
///
/// [`claim_next`]: QueueManager::claim_next
pub struct QueueManager {
    backend: Arc<dyn DocumentBackend>,
    records: VideoRecordStore,
    config: QueueConfig,
    write_lock: Mutex<()>,
}

impl QueueManager {
    /// Create a manager over the given backend and record store.
    pub fn new(
        backend: Arc<dyn DocumentBackend>,
        records: VideoRecordStore,
        config: QueueConfig,
    ) -> Self {
        Self {
            backend,
            records,
            config,
            write_lock: Mutex::new(()),
        }
    }

    /// Enqueue a video for processing.
    ///
    /// Enqueueing an already-queued video is idempotent: the existing item
    /// is returned unchanged. New items are inserted in priority order,
    /// highest first. `None` only when the backend misbehaves.
    pub fn add_to_queue(&self, record: &VideoRecord, priority: i32) -> Option<QueueItem> {
        match self.try_add(record, priority) {
            Ok(item) => Some(item),
            Err(e) => {
                error!(video_id = %record.id, "failed to enqueue video: {e}");
                None
            }
        }
    }

    /// Enqueue with the configured default priority.
    pub fn add_to_queue_default(&self, record: &VideoRecord) -> Option<QueueItem> {
        self.add_to_queue(record, self.config.default_priority)
    }

    /// Read-only peek at the next claimable item: first in priority order
    /// whose status is pending with attempts remaining.
    pub fn get_next_pending_item(&self) -> Option<QueueItem> {
        match self.load() {
            Ok(queue) => queue.next_pending().cloned(),
            Err(e) => {
                error!("failed to read queue: {e}");
                None
            }
        }
    }

    /// Claim the next pending item: atomically transitions it to
    /// processing and returns it. `None` when nothing is claimable.
    pub fn claim_next(&self) -> Option<QueueItem> {
        match self.try_claim_next() {
            Ok(item) => item,
            Err(e) => {
                error!("failed to claim next queue item: {e}");
                None
            }
        }
    }

    /// Apply a status transition to an item by ID.
    ///
    /// A `Failed` report increments the attempt counter and reverts the
    /// item to pending while retries remain; only an exhausted failure is
    /// terminal. Returns the updated item, or `None` when the ID is
    /// unknown (queue unchanged).
    pub fn update_item_status(
        &self,
        item_id: &QueueItemId,
        status: ProcessingStatus,
        error: Option<String>,
    ) -> Option<QueueItem> {
        match self.try_update_status(item_id, status, error, None) {
            Ok(item) => item,
            Err(e) => {
                error!(item_id = %item_id, "failed to update queue item: {e}");
                None
            }
        }
    }

    /// Success report: complete the item and annotate the video record
    /// with the analysis results.
    pub fn complete(&self, item_id: &QueueItemId, analysis: AiAnalysis) -> Option<QueueItem> {
        match self.try_update_status(item_id, ProcessingStatus::Completed, None, Some(analysis)) {
            Ok(item) => item,
            Err(e) => {
                error!(item_id = %item_id, "failed to complete queue item: {e}");
                None
            }
        }
    }

    /// Failure report with a reason.
    pub fn fail(&self, item_id: &QueueItemId, reason: impl Into<String>) -> Option<QueueItem> {
        self.update_item_status(item_id, ProcessingStatus::Failed, Some(reason.into()))
    }

    /// Remove an item from the queue. Explicit operator action; returns
    /// `false` when the ID is unknown.
    pub fn remove_from_queue(&self, item_id: &QueueItemId) -> bool {
        match self.try_remove(item_id) {
            Ok(removed) => removed,
            Err(e) => {
                error!(item_id = %item_id, "failed to remove queue item: {e}");
                false
            }
        }
    }

    /// Look up an item by ID. `None` for unknown ids and backend errors.
    pub fn get_item(&self, item_id: &QueueItemId) -> Option<QueueItem> {
        match self.load() {
            Ok(queue) => queue.find(item_id).cloned(),
            Err(e) => {
                error!(item_id = %item_id, "failed to read queue: {e}");
                None
            }
        }
    }

    /// All items in queue order. Empty on backend errors.
    pub fn get_all_items(&self) -> Vec<QueueItem> {
        match self.load() {
            Ok(queue) => queue.items,
            Err(e) => {
                error!("failed to read queue: {e}");
                Vec::new()
            }
        }
    }

    /// Aggregate counts per status. `failed` counts terminal failures
    /// only. Never raises; zeroed stats on any persistence error.
    pub fn get_queue_stats(&self) -> QueueStats {
        match self.load() {
            Ok(queue) => queue.stats(),
            Err(e) => {
                error!("failed to read queue stats: {e}");
                QueueStats::zeroed()
            }
        }
    }

    /// Remove every completed item and every terminal failure. Returns
    /// the count removed.
    pub fn cleanup_queue(&self) -> usize {
        match self.try_cleanup() {
            Ok(removed) => removed,
            Err(e) => {
                error!("failed to clean up queue: {e}");
                0
            }
        }
    }

    fn try_add(&self, record: &VideoRecord, priority: i32) -> QueueResult<QueueItem> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut queue = self.load()?;

        if let Some(existing) = queue.find_by_video(&record.id) {
            debug!(video_id = %record.id, item_id = %existing.id, "video already queued");
            return Ok(existing.clone());
        }

        let mut item = QueueItem::new(record.id.clone(), priority);
        item.max_attempts = self.config.max_attempts;
        let snapshot = item.clone();
        queue.push_sorted(item);
        self.save(&mut queue)?;

        info!(video_id = %record.id, item_id = %snapshot.id, priority, "enqueued video");
        Ok(snapshot)
    }

    fn try_claim_next(&self) -> QueueResult<Option<QueueItem>> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut queue = self.load()?;

        let Some(item) = queue.items.iter_mut().find(|i| i.is_claimable()) else {
            return Ok(None);
        };
        item.begin_processing();
        let snapshot = item.clone();
        self.save(&mut queue)?;

        self.mirror_to_record(&snapshot, None);
        info!(item_id = %snapshot.id, video_id = %snapshot.video_id, "claimed queue item");
        Ok(Some(snapshot))
    }

    fn try_update_status(
        &self,
        item_id: &QueueItemId,
        status: ProcessingStatus,
        error: Option<String>,
        analysis: Option<AiAnalysis>,
    ) -> QueueResult<Option<QueueItem>> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut queue = self.load()?;

        let Some(item) = queue.find_mut(item_id) else {
            warn!(item_id = %item_id, "status update for unknown queue item");
            return Ok(None);
        };

        match status {
            ProcessingStatus::Pending => {
                item.status = ProcessingStatus::Pending;
                item.updated_at = Utc::now();
            }
            ProcessingStatus::Processing => item.begin_processing(),
            ProcessingStatus::Completed => item.complete(),
            ProcessingStatus::Failed => {
                item.fail(error.unwrap_or_else(|| "unknown error".to_string()));
            }
        }

        let snapshot = item.clone();
        self.save(&mut queue)?;

        self.mirror_to_record(&snapshot, analysis.as_ref());
        info!(
            item_id = %snapshot.id,
            status = %snapshot.status,
            attempts = snapshot.attempts,
            "queue item transitioned"
        );
        Ok(Some(snapshot))
    }

    fn try_remove(&self, item_id: &QueueItemId) -> QueueResult<bool> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut queue = self.load()?;

        let before = queue.items.len();
        queue.items.retain(|item| &item.id != item_id);
        if queue.items.len() == before {
            return Ok(false);
        }
        self.save(&mut queue)?;
        info!(item_id = %item_id, "removed queue item");
        Ok(true)
    }

    fn try_cleanup(&self) -> QueueResult<usize> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut queue = self.load()?;

        let before = queue.items.len();
        queue.items.retain(|item| !item.is_finished());
        let removed = before - queue.items.len();
        self.save(&mut queue)?;

        if removed > 0 {
            info!(removed, "cleaned up finished queue items");
        }
        Ok(removed)
    }

    fn load(&self) -> QueueResult<ProcessingQueue> {
        match self.backend.read(QUEUE_KEY)? {
            Some(doc) => Ok(serde_json::from_str(&doc)?),
            None => Ok(ProcessingQueue::new()),
        }
    }

    fn save(&self, queue: &mut ProcessingQueue) -> QueueResult<()> {
        queue.last_updated = Utc::now();
        let doc = serde_json::to_string(queue)?;
        self.backend.write(QUEUE_KEY, &doc)?;
        Ok(())
    }

    /// Push a denormalized status mirror onto the video record. Best
    /// effort: a missing record is not an error here.
    fn mirror_to_record(&self, item: &QueueItem, analysis: Option<&AiAnalysis>) {
        let Some(mut record) = self.records.get_by_id(&item.video_id) else {
            warn!(video_id = %item.video_id, "no record to mirror queue status onto");
            return;
        };

        let metadata = record.metadata_mut();
        metadata.processing_status = Some(item.status);
        metadata.processing_error = item.error.clone();
        metadata.processing_updated_at = Some(item.updated_at);
        if let Some(analysis) = analysis {
            metadata.ai_processed = true;
            metadata.ai_analysis = Some(analysis.clone());
        }

        if !self.records.update(&record) {
            warn!(video_id = %item.video_id, "failed to mirror queue status onto record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chaincam_models::{ThrowResult, VideoId};
    use chaincam_store::{FileBackend, MemoryBackend, StoreError, StoreResult};

    struct BrokenBackend;

    impl DocumentBackend for BrokenBackend {
        fn read(&self, _key: &str) -> StoreResult<Option<String>> {
            Err(StoreError::backend_unavailable("down"))
        }

        fn write(&self, _key: &str, _value: &str) -> StoreResult<()> {
            Err(StoreError::backend_unavailable("down"))
        }
    }

    fn manager() -> (QueueManager, VideoRecordStore) {
        let backend: Arc<dyn DocumentBackend> = Arc::new(MemoryBackend::new());
        let records = VideoRecordStore::new(Arc::clone(&backend));
        let queue = QueueManager::new(backend, records.clone(), QueueConfig::default());
        (queue, records)
    }

    fn saved_record(records: &VideoRecordStore) -> VideoRecord {
        let record = VideoRecord::new("https://blob.example/clip.webm", ThrowResult::Hit);
        records.save(&record);
        record
    }

    fn analysis() -> AiAnalysis {
        AiAnalysis {
            analyzed_video_url: "https://blob.example/clip_analyzed.webm".into(),
            confidence: 87,
            detected_result: ThrowResult::Hit,
            flight_path: None,
            processing_time_secs: Some(7.2),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_enqueue_is_idempotent_per_video() {
        let (queue, records) = manager();
        let record = saved_record(&records);

        let first = queue.add_to_queue(&record, 1).unwrap();
        let second = queue.add_to_queue(&record, 5).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.priority, 1); // existing item returned unchanged
        assert_eq!(queue.get_all_items().len(), 1);
    }

    #[test]
    fn test_higher_priority_claimed_first() {
        let (queue, records) = manager();
        let a = saved_record(&records);
        let b = saved_record(&records);

        queue.add_to_queue(&a, 1).unwrap();
        queue.add_to_queue(&b, 5).unwrap();

        let claimed = queue.claim_next().unwrap();
        assert_eq!(claimed.video_id, b.id);
        assert_eq!(claimed.status, ProcessingStatus::Processing);
        assert!(claimed.processing_started_at.is_some());

        let next = queue.claim_next().unwrap();
        assert_eq!(next.video_id, a.id);
    }

    #[test]
    fn test_claim_skips_processing_and_exhausted_items() {
        let (queue, records) = manager();
        let record = saved_record(&records);
        let item = queue.add_to_queue(&record, 1).unwrap();

        queue.claim_next().unwrap();
        assert!(queue.claim_next().is_none()); // already processing

        for _ in 0..3 {
            queue.fail(&item.id, "bad frame");
            queue.claim_next();
        }
        let final_item = &queue.get_all_items()[0];
        assert!(final_item.is_terminal_failure());
        assert!(queue.get_next_pending_item().is_none());
        assert!(queue.claim_next().is_none());
    }

    #[test]
    fn test_retryable_failure_becomes_claimable_again() {
        let (queue, records) = manager();
        let record = saved_record(&records);
        let item = queue.add_to_queue(&record, 1).unwrap();

        queue.claim_next().unwrap();
        let failed = queue.fail(&item.id, "timeout").unwrap();

        assert_eq!(failed.status, ProcessingStatus::Pending);
        assert_eq!(failed.attempts, 1);
        assert_eq!(queue.claim_next().unwrap().id, item.id);
    }

    #[test]
    fn test_third_failure_is_terminal() {
        let (queue, records) = manager();
        let record = saved_record(&records);
        let item = queue.add_to_queue(&record, 1).unwrap();

        let mut last = None;
        for _ in 0..3 {
            queue.claim_next();
            last = queue.fail(&item.id, "decode error");
        }

        let last = last.unwrap();
        assert_eq!(last.status, ProcessingStatus::Failed);
        assert_eq!(last.attempts, 3);
        assert!(last.processing_completed_at.is_some());

        // A further failure report keeps it terminal, attempts capped.
        let again = queue.fail(&item.id, "still broken").unwrap();
        assert_eq!(again.status, ProcessingStatus::Failed);
        assert_eq!(again.attempts, 3);
    }

    #[test]
    fn test_get_item_by_id() {
        let (queue, records) = manager();
        let record = saved_record(&records);
        let item = queue.add_to_queue(&record, 1).unwrap();

        assert_eq!(queue.get_item(&item.id), Some(item));
        assert!(queue.get_item(&QueueItemId::from("missing")).is_none());
    }

    #[test]
    fn test_update_unknown_item_is_noop() {
        let (queue, records) = manager();
        let record = saved_record(&records);
        queue.add_to_queue(&record, 1).unwrap();
        let before = queue.get_all_items();

        let missing = QueueItemId::from("missing");
        assert!(queue
            .update_item_status(&missing, ProcessingStatus::Completed, None)
            .is_none());
        assert_eq!(queue.get_all_items(), before);
    }

    #[test]
    fn test_complete_annotates_record() {
        let (queue, records) = manager();
        let record = saved_record(&records);
        let item = queue.add_to_queue(&record, 1).unwrap();

        queue.claim_next().unwrap();
        let done = queue.complete(&item.id, analysis()).unwrap();
        assert_eq!(done.status, ProcessingStatus::Completed);

        let annotated = records.get_by_id(&record.id).unwrap();
        let metadata = annotated.metadata.unwrap();
        assert!(metadata.ai_processed);
        assert_eq!(
            metadata.ai_analysis.unwrap().analyzed_video_url,
            "https://blob.example/clip_analyzed.webm"
        );
        assert_eq!(metadata.processing_status, Some(ProcessingStatus::Completed));
    }

    #[test]
    fn test_failure_mirrors_error_onto_record() {
        let (queue, records) = manager();
        let record = saved_record(&records);
        let item = queue.add_to_queue(&record, 1).unwrap();

        queue.claim_next().unwrap();
        queue.fail(&item.id, "no disc visible").unwrap();

        let mirrored = records.get_by_id(&record.id).unwrap();
        let metadata = mirrored.metadata.unwrap();
        // Retryable failure has already reverted to pending.
        assert_eq!(metadata.processing_status, Some(ProcessingStatus::Pending));
        assert_eq!(metadata.processing_error.as_deref(), Some("no disc visible"));
    }

    #[test]
    fn test_cleanup_removes_exactly_finished_items() {
        let (queue, records) = manager();

        let done = saved_record(&records);
        let done_item = queue.add_to_queue(&done, 1).unwrap();
        queue.claim_next();
        queue.complete(&done_item.id, analysis());

        let dead = saved_record(&records);
        let dead_item = queue.add_to_queue(&dead, 1).unwrap();
        for _ in 0..3 {
            queue.claim_next();
            queue.fail(&dead_item.id, "hopeless");
        }

        let retrying = saved_record(&records);
        let retrying_item = queue.add_to_queue(&retrying, 1).unwrap();
        queue.claim_next();
        queue.fail(&retrying_item.id, "once");

        let waiting = saved_record(&records);
        queue.add_to_queue(&waiting, 1).unwrap();

        assert_eq!(queue.cleanup_queue(), 2);

        let remaining: Vec<VideoId> = queue
            .get_all_items()
            .into_iter()
            .map(|i| i.video_id)
            .collect();
        assert!(remaining.contains(&retrying.id));
        assert!(remaining.contains(&waiting.id));
        assert_eq!(remaining.len(), 2);
    }

    #[test]
    fn test_remove_from_queue() {
        let (queue, records) = manager();
        let record = saved_record(&records);
        let item = queue.add_to_queue(&record, 1).unwrap();

        assert!(queue.remove_from_queue(&item.id));
        assert!(!queue.remove_from_queue(&item.id));
        assert!(queue.get_all_items().is_empty());
    }

    #[test]
    fn test_stats_track_item_set() {
        let (queue, records) = manager();

        let a = saved_record(&records);
        queue.add_to_queue(&a, 1).unwrap();
        let b = saved_record(&records);
        queue.add_to_queue(&b, 2).unwrap();
        queue.claim_next().unwrap();

        let stats = queue.get_queue_stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.processing, 1);
        assert_eq!(stats.completed, 0);
        assert_eq!(stats.failed, 0);
    }

    #[test]
    fn test_broken_backend_degrades_silently() {
        let backend: Arc<dyn DocumentBackend> = Arc::new(BrokenBackend);
        let records = VideoRecordStore::new(Arc::clone(&backend));
        let queue = QueueManager::new(backend, records, QueueConfig::default());
        let record = VideoRecord::new("https://blob.example/x.webm", ThrowResult::Ace);

        assert!(queue.add_to_queue(&record, 1).is_none());
        assert!(queue.get_next_pending_item().is_none());
        assert!(queue.claim_next().is_none());
        assert!(!queue.remove_from_queue(&QueueItemId::from("x")));
        assert_eq!(queue.cleanup_queue(), 0);

        let stats = queue.get_queue_stats();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.failed, 0);
    }

    #[test]
    fn test_queue_survives_reload_from_disk() {
        let dir = tempfile::tempdir().unwrap();

        let items_before = {
            let backend: Arc<dyn DocumentBackend> = Arc::new(FileBackend::new(dir.path()).unwrap());
            let records = VideoRecordStore::new(Arc::clone(&backend));
            let queue = QueueManager::new(backend, records.clone(), QueueConfig::default());
            for priority in [3, 1, 2] {
                let record = saved_record(&records);
                queue.add_to_queue(&record, priority).unwrap();
            }
            queue.claim_next().unwrap();
            queue.get_all_items()
        };

        let backend: Arc<dyn DocumentBackend> = Arc::new(FileBackend::new(dir.path()).unwrap());
        let records = VideoRecordStore::new(Arc::clone(&backend));
        let reloaded = QueueManager::new(backend, records, QueueConfig::default());

        assert_eq!(reloaded.get_all_items(), items_before);
    }
}
