//! Storage layer
//!
//! The engine persists the whole module set as one JSON value through the
//! `ModuleBackend` port. Three implementations exist:
//!
//! - **SQLite** (`SqliteStore`): the primary, structured store
//! - **Flat file** (`FlatFileStore`): a synchronous string-keyed store used
//!   only when the primary is unavailable or fails
//! - **Memory** (`MemoryStore`): isolated in-process store for tests and
//!   embedding
//!
//! Backends only move opaque strings; encoding and version bookkeeping live
//! in the engine.

use std::sync::Arc;

use async_trait::async_trait;

pub mod error;
pub mod fallback;
pub mod memory;
pub mod primary;
pub mod schema;

pub use error::{StorageError, StorageResult};
pub use fallback::FlatFileStore;
pub use memory::MemoryStore;
pub use primary::SqliteStore;
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};

/// Key of the module set inside the primary store's `modules` collection
pub const MODULES_KEY: &str = "modules";

/// Key of the module set inside the fallback store
pub const FALLBACK_KEY: &str = "mjmlModulesFallback";

/// A key-value backend the engine can persist the module set to
#[async_trait]
pub trait ModuleBackend: Send + Sync {
    /// Short name used in logs and status output
    fn name(&self) -> &'static str;

    /// Capability probe, checked before every read and write
    fn is_available(&self) -> bool {
        true
    }

    /// Read the value stored under `key`
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Replace the value stored under `key`
    async fn put(&self, key: &str, value: &str) -> StorageResult<()>;
}

#[async_trait]
impl<T: ModuleBackend + ?Sized> ModuleBackend for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key).await
    }

    async fn put(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).put(key, value).await
    }
}
