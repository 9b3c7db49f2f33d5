//! Flat fallback store
//!
//! A synchronous string-keyed store kept as a single JSON object on disk.
//! Every `put` rewrites the whole file using an atomic write (write to temp
//! file, then rename) so a crash never leaves it half-written.
//!
//! Storage location: `~/.local/share/modshelf/fallback.json` (configurable
//! via `Config`)

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use super::error::{StorageError, StorageResult};
use super::ModuleBackend;

/// Synchronous key-value store persisted as one JSON file
pub struct FlatFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FlatFileStore {
    /// Create a store backed by the file at `path`
    ///
    /// The file is created on the first `put`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if anything has been written yet
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the value stored under `key`
    pub fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.read_entries()?;
        Ok(entries.remove(key))
    }

    /// Replace the value stored under `key`
    pub fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.read_entries()?;
        entries.insert(key.to_string(), value.to_string());

        let bytes = serde_json::to_vec_pretty(&entries)?;
        atomic_write(&self.path, &bytes)?;

        debug!(path = %self.path.display(), key, "wrote fallback store");
        Ok(())
    }

    /// Remove `key`, returning whether it was present
    pub fn remove_item(&self, key: &str) -> StorageResult<bool> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.read_entries()?;
        if entries.remove(key).is_none() {
            return Ok(false);
        }

        let bytes = serde_json::to_vec_pretty(&entries)?;
        atomic_write(&self.path, &bytes)?;
        Ok(true)
    }

    fn read_entries(&self) -> StorageResult<BTreeMap<String, String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StorageError::ReadError {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&content).map_err(|e| StorageError::Corrupt {
            backend: "fallback",
            details: e.to_string(),
        })
    }
}

#[async_trait]
impl ModuleBackend for FlatFileStore {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.get_item(key)
    }

    async fn put(&self, key: &str, value: &str) -> StorageResult<()> {
        self.set_item(key, value)
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let temp_path = path.with_extension("tmp");

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    file.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    // Sync to disk before rename
    file.sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|source| StorageError::AtomicWriteFailed {
        from: temp_path.clone(),
        to: path.to_path_buf(),
        source,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_reads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = FlatFileStore::new(temp_dir.path().join("fallback.json"));

        assert!(!store.exists());
        assert!(store.get_item("anything").unwrap().is_none());
    }

    #[test]
    fn test_set_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let store = FlatFileStore::new(temp_dir.path().join("fallback.json"));

        store.set_item("mjmlModulesFallback", "[]").unwrap();
        assert!(store.exists());
        assert_eq!(
            store.get_item("mjmlModulesFallback").unwrap().as_deref(),
            Some("[]")
        );
    }

    #[test]
    fn test_other_keys_survive_writes() {
        let temp_dir = TempDir::new().unwrap();
        let store = FlatFileStore::new(temp_dir.path().join("fallback.json"));

        store.set_item("theme", "dark").unwrap();
        store.set_item("mjmlModulesFallback", "[]").unwrap();

        assert_eq!(store.get_item("theme").unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn test_remove_item() {
        let temp_dir = TempDir::new().unwrap();
        let store = FlatFileStore::new(temp_dir.path().join("fallback.json"));

        store.set_item("key", "value").unwrap();
        assert!(store.remove_item("key").unwrap());
        assert!(!store.remove_item("key").unwrap());
        assert!(store.get_item("key").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file_reports_corruption() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fallback.json");
        fs::write(&path, "{not json").unwrap();

        let store = FlatFileStore::new(&path);
        let err = store.get_item("key").unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let nested_path = temp_dir
            .path()
            .join("a")
            .join("b")
            .join("c")
            .join("file.json");

        atomic_write(&nested_path, b"{}").unwrap();

        assert!(nested_path.exists());
        assert!(!nested_path.with_extension("tmp").exists());
        assert_eq!(fs::read_to_string(&nested_path).unwrap(), "{}");
    }

    #[tokio::test]
    async fn test_backend_trait_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FlatFileStore::new(temp_dir.path().join("fallback.json"));

        store.put("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(store.name(), "fallback");
    }
}
