//! Document backend abstraction.
//!
//! Each logical key maps to one JSON document that is read and written
//! wholesale. Operations are synchronous: documents are small and there is
//! no suspension point inside a store read-modify-write.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::StoreResult;

/// A key-value document store holding one serialized JSON document per key.
///
/// Implementations must be safe to share across threads, but atomicity is
/// per call only: a read-modify-write spanning `read` and `write` needs
/// external serialization (the queue manager takes a lock for this).
pub trait DocumentBackend: Send + Sync {
    /// Read the document stored under `key`, or `None` if absent.
    fn read(&self, key: &str) -> StoreResult<Option<String>>;

    /// Replace the document stored under `key`.
    fn write(&self, key: &str, value: &str) -> StoreResult<()>;
}

/// In-memory backend for tests and ephemeral deployments.
#[derive(Default)]
pub struct MemoryBackend {
    docs: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentBackend for MemoryBackend {
    fn read(&self, key: &str) -> StoreResult<Option<String>> {
        let docs = self.docs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(docs.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut docs = self.docs.lock().unwrap_or_else(|e| e.into_inner());
        docs.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend_round_trip() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.read("videos").unwrap(), None);

        backend.write("videos", "[]").unwrap();
        assert_eq!(backend.read("videos").unwrap().as_deref(), Some("[]"));

        backend.write("videos", "[1]").unwrap();
        assert_eq!(backend.read("videos").unwrap().as_deref(), Some("[1]"));
    }
}
