//! Video record store.

use std::sync::Arc;

use tracing::{error, info};

use chaincam_models::{VideoId, VideoRecord};

use crate::backend::DocumentBackend;
use crate::error::StoreResult;

/// Document key the record collection is persisted under.
pub const RECORDS_KEY: &str = "videos";

/// Persisted collection of [`VideoRecord`]s, round-tripped wholesale on
/// every read and write.
///
/// Persistence failures are caught at every public operation, logged, and
/// converted into a safe default (empty collection, `None`, `false`).
/// Callers inspect return values for not-found outcomes instead of handling
/// errors. This store is a client-session cache, not the system of record;
/// a deployment that needs durability should put a real database behind
/// [`DocumentBackend`].
#[derive(Clone)]
pub struct VideoRecordStore {
    backend: Arc<dyn DocumentBackend>,
}

impl VideoRecordStore {
    /// Create a store over the given backend.
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self { backend }
    }

    /// Append a new record and persist the whole collection.
    ///
    /// No uniqueness check is made; the caller is responsible for calling
    /// this once per newly created record.
    pub fn save(&self, record: &VideoRecord) {
        if let Err(e) = self.try_save(record) {
            error!(video_id = %record.id, "failed to save video record: {e}");
        }
    }

    /// The full collection in insertion order. Empty if no data exists or
    /// the backend misbehaves.
    pub fn get_all(&self) -> Vec<VideoRecord> {
        match self.try_get_all() {
            Ok(records) => records,
            Err(e) => {
                error!("failed to load video records: {e}");
                Vec::new()
            }
        }
    }

    /// Look up a record by ID. `None` for unknown ids and backend errors.
    pub fn get_by_id(&self, id: &VideoId) -> Option<VideoRecord> {
        self.get_all().into_iter().find(|r| &r.id == id)
    }

    /// Replace the record with a matching ID and persist. Returns `false`
    /// when no record matches or the write fails.
    pub fn update(&self, record: &VideoRecord) -> bool {
        match self.try_update(record) {
            Ok(found) => found,
            Err(e) => {
                error!(video_id = %record.id, "failed to update video record: {e}");
                false
            }
        }
    }

    fn try_save(&self, record: &VideoRecord) -> StoreResult<()> {
        let mut records = self.try_get_all()?;
        records.push(record.clone());
        self.persist(&records)?;
        info!(video_id = %record.id, "saved video record");
        Ok(())
    }

    fn try_get_all(&self) -> StoreResult<Vec<VideoRecord>> {
        match self.backend.read(RECORDS_KEY)? {
            Some(doc) => Ok(serde_json::from_str(&doc)?),
            None => Ok(Vec::new()),
        }
    }

    fn try_update(&self, record: &VideoRecord) -> StoreResult<bool> {
        let mut records = self.try_get_all()?;
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(slot) => {
                *slot = record.clone();
                self.persist(&records)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn persist(&self, records: &[VideoRecord]) -> StoreResult<()> {
        let doc = serde_json::to_string(records)?;
        self.backend.write(RECORDS_KEY, &doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::error::StoreError;
    use chaincam_models::ThrowResult;

    /// Backend that fails every call, for exercising the degrade-silently
    /// policy.
    struct BrokenBackend;

    impl DocumentBackend for BrokenBackend {
        fn read(&self, _key: &str) -> StoreResult<Option<String>> {
            Err(StoreError::backend_unavailable("down for maintenance"))
        }

        fn write(&self, _key: &str, _value: &str) -> StoreResult<()> {
            Err(StoreError::backend_unavailable("down for maintenance"))
        }
    }

    fn store() -> VideoRecordStore {
        VideoRecordStore::new(Arc::new(MemoryBackend::new()))
    }

    #[test]
    fn test_save_and_get_all_keeps_insertion_order() {
        let store = store();
        let first = VideoRecord::new("https://blob.example/a.webm", ThrowResult::Ace);
        let second = VideoRecord::new("https://blob.example/b.webm", ThrowResult::Miss);
        store.save(&first);
        store.save(&second);

        let all = store.get_all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, first.id);
        assert_eq!(all[1].id, second.id);
    }

    #[test]
    fn test_get_by_id_unknown_is_none() {
        let store = store();
        store.save(&VideoRecord::new("https://blob.example/a.webm", ThrowResult::Hit));
        assert!(store.get_by_id(&VideoId::from("nope")).is_none());
    }

    #[test]
    fn test_update_replaces_in_place() {
        let store = store();
        let mut record = VideoRecord::new("https://blob.example/a.webm", ThrowResult::Hit);
        store.save(&record);

        record.metadata_mut().ai_processed = true;
        assert!(store.update(&record));

        let reloaded = store.get_by_id(&record.id).unwrap();
        assert!(reloaded.is_ai_processed());
    }

    #[test]
    fn test_update_unknown_returns_false() {
        let store = store();
        let record = VideoRecord::new("https://blob.example/a.webm", ThrowResult::Hit);
        assert!(!store.update(&record));
    }

    #[test]
    fn test_broken_backend_degrades_silently() {
        let store = VideoRecordStore::new(Arc::new(BrokenBackend));
        let record = VideoRecord::new("https://blob.example/a.webm", ThrowResult::Ace);

        store.save(&record); // logged, not propagated
        assert!(store.get_all().is_empty());
        assert!(store.get_by_id(&record.id).is_none());
        assert!(!store.update(&record));
    }

    #[test]
    fn test_malformed_document_degrades_to_empty() {
        let backend = Arc::new(MemoryBackend::new());
        backend.write(RECORDS_KEY, "not json").unwrap();
        let store = VideoRecordStore::new(backend);
        assert!(store.get_all().is_empty());
    }
}
