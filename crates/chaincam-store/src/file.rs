//! File-based document backend.

use std::fs;
use std::path::PathBuf;

use tracing::debug;

use crate::backend::DocumentBackend;
use crate::error::{StoreError, StoreResult};

/// Backend storing one JSON file per logical key under a data directory.
///
/// Writes go through a temp file followed by a rename, so readers never see
/// a half-written document after a crash mid-write.
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Open a backend rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Open the backend at the directory named by `CHAINCAM_DATA_DIR`,
    /// defaulting to `./data`.
    pub fn from_env() -> StoreResult<Self> {
        let dir = std::env::var("CHAINCAM_DATA_DIR").unwrap_or_else(|_| "data".to_string());
        Self::new(dir)
    }

    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        // Keys are store-internal names, not user input, but reject
        // anything that would escape the data dir.
        if key.is_empty() || key.contains(['/', '\\', '.']) {
            return Err(StoreError::invalid_key(key));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl DocumentBackend for FileBackend {
    fn read(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        debug!(key, bytes = value.len(), "wrote document");
        Ok(())
    }
}
