//! In-memory backend
//!
//! Keeps values in a map owned by the store instance, so tests and embedders
//! get an isolated module set per engine. Switches simulate an unsupported
//! environment or failing reads/writes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::error::{StorageError, StorageResult};
use super::ModuleBackend;

/// Isolated in-memory key-value backend
pub struct MemoryStore {
    name: &'static str,
    entries: Mutex<HashMap<String, String>>,
    available: AtomicBool,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::named("memory")
    }

    /// Create a store reporting `name` in logs
    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            entries: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        }
    }

    /// Toggle the capability probe
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Make every `get` fail
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every `put` fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Raw value under `key`, bypassing the failure switches
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    /// Store a raw value, bypassing the failure switches
    pub fn seed(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModuleBackend for MemoryStore {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        if !self.is_available() {
            return Err(StorageError::Unavailable { backend: self.name });
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::TaskFailed(format!(
                "simulated read failure in '{}'",
                self.name
            )));
        }
        Ok(self.peek(key))
    }

    async fn put(&self, key: &str, value: &str) -> StorageResult<()> {
        if !self.is_available() {
            return Err(StorageError::Unavailable { backend: self.name });
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::TaskFailed(format!(
                "simulated write failure in '{}'",
                self.name
            )));
        }
        self.seed(key, value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_get() {
        let store = MemoryStore::new();
        store.put("k", "v").await.unwrap();

        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_store_rejects_io() {
        let store = MemoryStore::named("primary");
        store.set_available(false);

        assert!(!store.is_available());
        assert!(matches!(
            store.put("k", "v").await,
            Err(StorageError::Unavailable { backend: "primary" })
        ));
        assert!(store.get("k").await.is_err());
    }

    #[tokio::test]
    async fn test_failure_switches() {
        let store = MemoryStore::new();
        store.seed("k", "v");

        store.set_fail_writes(true);
        assert!(store.put("k", "other").await.is_err());
        assert_eq!(store.peek("k").as_deref(), Some("v"));
        assert_eq!(store.write_count(), 0);

        store.set_fail_reads(true);
        assert!(store.get("k").await.is_err());

        store.set_fail_reads(false);
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
