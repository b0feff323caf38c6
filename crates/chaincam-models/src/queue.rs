//! Processing-queue items and the persisted queue document.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::video::VideoId;

/// Ceiling on processing attempts before a failure becomes terminal.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

/// Unique identifier for a queue item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct QueueItemId(pub String);

impl QueueItemId {
    /// Generate a new random queue item ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for QueueItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for QueueItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for QueueItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Processing status of a queue item.
///
/// `Failed` on the wire covers both the retryable and the terminal case;
/// which one applies depends on whether attempts remain. A failure report
/// with attempts remaining reverts the item to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    /// Waiting for a consumer
    #[default]
    Pending,
    /// Claimed by a consumer, work in flight
    Processing,
    /// Processed successfully
    Completed,
    /// Last attempt failed
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::Processing => "processing",
            ProcessingStatus::Completed => "completed",
            ProcessingStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One unit of work: a video awaiting or undergoing asynchronous processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QueueItem {
    /// Unique item ID, assigned at enqueue time
    pub id: QueueItemId,

    /// The associated video record (lookup reference, not ownership)
    pub video_id: VideoId,

    /// Current status
    #[serde(default)]
    pub status: ProcessingStatus,

    /// Higher values are serviced first
    #[serde(default = "default_priority")]
    pub priority: i32,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Refreshed on every transition
    pub updated_at: DateTime<Utc>,

    /// Set once, on entry to `Processing`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_started_at: Option<DateTime<Utc>>,

    /// Set once, on entry to a terminal status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_completed_at: Option<DateTime<Utc>>,

    /// Count of failed processing attempts so far
    #[serde(default)]
    pub attempts: u32,

    /// Ceiling on attempts
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Last failure reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn default_priority() -> i32 {
    1
}

impl QueueItem {
    /// Create a new pending item for a video.
    pub fn new(video_id: VideoId, priority: i32) -> Self {
        let now = Utc::now();
        Self {
            id: QueueItemId::new(),
            video_id,
            status: ProcessingStatus::Pending,
            priority,
            created_at: now,
            updated_at: now,
            processing_started_at: None,
            processing_completed_at: None,
            attempts: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            error: None,
        }
    }

    /// Whether a consumer may claim this item.
    pub fn is_claimable(&self) -> bool {
        self.status == ProcessingStatus::Pending && self.attempts < self.max_attempts
    }

    /// Whether this item failed with no retries remaining.
    pub fn is_terminal_failure(&self) -> bool {
        self.status == ProcessingStatus::Failed && self.attempts >= self.max_attempts
    }

    /// Whether this item is done for good (completed, or failed with
    /// attempts exhausted). These are the items `cleanup` removes.
    pub fn is_finished(&self) -> bool {
        self.status == ProcessingStatus::Completed || self.is_terminal_failure()
    }

    /// Transition to `Processing`. Stamps the processing start time on
    /// first entry.
    pub fn begin_processing(&mut self) {
        let now = Utc::now();
        self.status = ProcessingStatus::Processing;
        if self.processing_started_at.is_none() {
            self.processing_started_at = Some(now);
        }
        self.updated_at = now;
    }

    /// Transition to `Completed`.
    pub fn complete(&mut self) {
        let now = Utc::now();
        self.status = ProcessingStatus::Completed;
        if self.processing_completed_at.is_none() {
            self.processing_completed_at = Some(now);
        }
        self.updated_at = now;
    }

    /// Record a failed attempt. Increments `attempts` and stores the
    /// reason; reverts to `Pending` while retries remain, otherwise the
    /// failure is terminal and the completion time is stamped.
    pub fn fail(&mut self, reason: impl Into<String>) {
        let now = Utc::now();
        self.attempts = (self.attempts + 1).min(self.max_attempts);
        self.error = Some(reason.into());
        self.updated_at = now;

        if self.attempts < self.max_attempts {
            self.status = ProcessingStatus::Pending;
        } else {
            self.status = ProcessingStatus::Failed;
            if self.processing_completed_at.is_none() {
                self.processing_completed_at = Some(now);
            }
        }
    }
}

/// The persisted queue document: the ordered item list plus a
/// last-modified stamp, round-tripped wholesale on every mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProcessingQueue {
    #[serde(default)]
    pub items: Vec<QueueItem>,
    pub last_updated: DateTime<Utc>,
}

impl ProcessingQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            last_updated: Utc::now(),
        }
    }

    /// Find an item by ID.
    pub fn find(&self, id: &QueueItemId) -> Option<&QueueItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Find an item by ID, mutably.
    pub fn find_mut(&mut self, id: &QueueItemId) -> Option<&mut QueueItem> {
        self.items.iter_mut().find(|item| &item.id == id)
    }

    /// Find the item referencing a video, if one is queued.
    pub fn find_by_video(&self, video_id: &VideoId) -> Option<&QueueItem> {
        self.items.iter().find(|item| &item.video_id == video_id)
    }

    /// Insert an item and re-sort by priority, highest first. The sort is
    /// stable, so equal priorities keep insertion order.
    pub fn push_sorted(&mut self, item: QueueItem) {
        self.items.push(item);
        self.items.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// The first claimable item in priority order.
    pub fn next_pending(&self) -> Option<&QueueItem> {
        self.items.iter().find(|item| item.is_claimable())
    }

    /// Aggregate counts per status. `failed` counts only terminal
    /// failures; a retryable failure has already reverted to `Pending`
    /// and is counted there.
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            total: self.items.len(),
            pending: self
                .items
                .iter()
                .filter(|i| i.status == ProcessingStatus::Pending)
                .count(),
            processing: self
                .items
                .iter()
                .filter(|i| i.status == ProcessingStatus::Processing)
                .count(),
            completed: self
                .items
                .iter()
                .filter(|i| i.status == ProcessingStatus::Completed)
                .count(),
            failed: self.items.iter().filter(|i| i.is_terminal_failure()).count(),
            last_updated: self.last_updated,
        }
    }
}

impl Default for ProcessingQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate queue counts for dashboards and admin endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QueueStats {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub last_updated: DateTime<Utc>,
}

impl QueueStats {
    /// All-zero stats, used when the persisted queue cannot be read.
    pub fn zeroed() -> Self {
        Self {
            total: 0,
            pending: 0,
            processing: 0,
            completed: 0,
            failed: 0,
            last_updated: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_creation() {
        let item = QueueItem::new(VideoId::new(), 1);
        assert_eq!(item.status, ProcessingStatus::Pending);
        assert_eq!(item.attempts, 0);
        assert_eq!(item.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert!(item.is_claimable());
    }

    #[test]
    fn test_item_transitions() {
        let mut item = QueueItem::new(VideoId::new(), 1);

        item.begin_processing();
        assert_eq!(item.status, ProcessingStatus::Processing);
        assert!(item.processing_started_at.is_some());
        assert!(!item.is_claimable());

        item.complete();
        assert_eq!(item.status, ProcessingStatus::Completed);
        assert!(item.processing_completed_at.is_some());
        assert!(item.is_finished());
    }

    #[test]
    fn test_retryable_failure_reverts_to_pending() {
        let mut item = QueueItem::new(VideoId::new(), 1);
        item.begin_processing();
        item.fail("network flake");

        assert_eq!(item.status, ProcessingStatus::Pending);
        assert_eq!(item.attempts, 1);
        assert_eq!(item.error.as_deref(), Some("network flake"));
        assert!(item.processing_completed_at.is_none());
        assert!(item.is_claimable());
    }

    #[test]
    fn test_third_failure_is_terminal() {
        let mut item = QueueItem::new(VideoId::new(), 1);
        for _ in 0..3 {
            item.begin_processing();
            item.fail("decode error");
        }

        assert_eq!(item.status, ProcessingStatus::Failed);
        assert_eq!(item.attempts, 3);
        assert!(item.is_terminal_failure());
        assert!(item.processing_completed_at.is_some());
        assert!(!item.is_claimable());
    }

    #[test]
    fn test_processing_started_at_set_once() {
        let mut item = QueueItem::new(VideoId::new(), 1);
        item.begin_processing();
        let first = item.processing_started_at;
        item.fail("flake");
        item.begin_processing();
        assert_eq!(item.processing_started_at, first);
    }

    #[test]
    fn test_priority_ordering_stable() {
        let mut queue = ProcessingQueue::new();
        let low_a = QueueItem::new(VideoId::from("a"), 1);
        let high = QueueItem::new(VideoId::from("b"), 5);
        let low_b = QueueItem::new(VideoId::from("c"), 1);
        queue.push_sorted(low_a);
        queue.push_sorted(high);
        queue.push_sorted(low_b);

        let order: Vec<&str> = queue.items.iter().map(|i| i.video_id.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
        assert_eq!(queue.next_pending().unwrap().video_id.as_str(), "b");
    }

    #[test]
    fn test_stats_count_terminal_failures_only() {
        let mut queue = ProcessingQueue::new();

        let mut retryable = QueueItem::new(VideoId::from("a"), 1);
        retryable.begin_processing();
        retryable.fail("once");

        let mut terminal = QueueItem::new(VideoId::from("b"), 1);
        for _ in 0..3 {
            terminal.begin_processing();
            terminal.fail("always");
        }

        queue.push_sorted(retryable);
        queue.push_sorted(terminal);

        let stats = queue.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.failed, 1);
        assert!(stats.pending + stats.processing + stats.completed + stats.failed <= stats.total);
    }

    #[test]
    fn test_queue_document_round_trip() {
        let mut queue = ProcessingQueue::new();
        for i in 0..4 {
            queue.push_sorted(QueueItem::new(VideoId::new(), i));
        }

        let json = serde_json::to_string(&queue).unwrap();
        let back: ProcessingQueue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, queue);
    }
}
