use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use parley_types::SessionCollection;

use crate::error::{PersistError, Result};
use crate::trait_client::PersistentStore;

/// Stores the session collection as one pretty-printed JSON file
///
/// Saves go through a temporary sibling file and a rename, so a crash
/// mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Open a store at `path`, creating the parent directory if needed
    ///
    /// Fails with [`PersistError::Unavailable`] when the directory cannot
    /// be created.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                PersistError::Unavailable(format!("{}: {}", parent.display(), e))
            })?;
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "sessions.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl PersistentStore for JsonFileStore {
    fn load(&self) -> Result<Option<SessionCollection>> {
        if !self.path.exists() {
            return Ok(None);
        }

        // Invalid UTF-8 must surface as a serialization error, not io
        let content = fs::read(&self.path)?;
        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        let collection = serde_json::from_slice(&content)?;
        Ok(Some(collection))
    }

    fn save(&self, collection: &SessionCollection) -> Result<()> {
        let json = serde_json::to_string_pretty(collection)?;

        let tmp_path = self.temp_path();
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(json.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
