use std::sync::Mutex;

use parley_types::SessionCollection;

use crate::error::{PersistError, Result};
use crate::trait_client::PersistentStore;

/// Keeps the last saved snapshot in memory only
///
/// Used for tests and as the fallback when durable storage is unavailable.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: Mutex<Option<SessionCollection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot
    pub fn with_snapshot(collection: SessionCollection) -> Self {
        Self {
            snapshot: Mutex::new(Some(collection)),
        }
    }

    /// Last saved snapshot, if any
    pub fn snapshot(&self) -> Option<SessionCollection> {
        self.snapshot.lock().ok().and_then(|s| s.clone())
    }
}

impl PersistentStore for MemoryStore {
    fn load(&self) -> Result<Option<SessionCollection>> {
        let guard = self
            .snapshot
            .lock()
            .map_err(|e| PersistError::Unavailable(e.to_string()))?;
        Ok(guard.clone())
    }

    fn save(&self, collection: &SessionCollection) -> Result<()> {
        let mut guard = self
            .snapshot
            .lock()
            .map_err(|e| PersistError::Unavailable(e.to_string()))?;
        *guard = Some(collection.clone());
        Ok(())
    }
}
