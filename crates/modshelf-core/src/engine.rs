//! Module persistence engine
//!
//! The `ModuleEngine` owns a primary and a fallback backend and implements
//! the four module operations on top of them. Every write follows the same
//! cycle:
//!
//! 1. Validate the input (no storage access on failure)
//! 2. Read the current module set
//! 3. Apply the change to an in-memory copy
//! 4. Persist the complete set: primary first, fallback if the primary is
//!    unavailable or the write fails
//! 5. Publish a change notification with the resulting set
//!
//! There is no locking across calls. Concurrent writers race and the last
//! persist wins; callers that need strict ordering serialize their calls.
//!
//! ## Usage
//!
//! ```ignore
//! let engine = ModuleEngine::open(&Config::load()?)?;
//! let mut changes = engine.subscribe();
//!
//! engine
//!     .save_block(&ModuleDefinition::new("hero", "Hero", "<mjml>...</mjml>"))
//!     .await?;
//!
//! let event = changes.recv().await?;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::ModuleError;
use crate::events::{ChangeNotifier, ModulesChanged};
use crate::models::{ModuleDefinition, ModuleRecord, DEFAULT_CATEGORY};
use crate::storage::{
    FlatFileStore, ModuleBackend, SqliteStore, StorageError, FALLBACK_KEY, MODULES_KEY,
};

const DEFAULT_EVENT_CAPACITY: usize = 16;

/// Backend selection as seen by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStatus {
    /// A primary backend was configured and opened
    pub primary_configured: bool,
    /// The primary passes its capability probe
    pub primary_available: bool,
    /// The latest write landed in the fallback while a primary exists
    pub primary_stale: bool,
    /// Backend the next write will try first
    pub active_backend: &'static str,
}

/// Versioned module storage over a primary and a fallback backend
pub struct ModuleEngine {
    primary: Option<Box<dyn ModuleBackend>>,
    fallback: Box<dyn ModuleBackend>,
    notifier: ChangeNotifier,
    default_category: String,
    // Reads skip the primary until it accepts a write again
    primary_stale: AtomicBool,
}

impl ModuleEngine {
    /// Open the engine with SQLite as primary and the flat file as fallback
    ///
    /// A primary that is disabled in the configuration or fails to open is
    /// treated as unavailable; the engine still works from the fallback.
    pub fn open(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir).with_context(|| {
            format!("Failed to create data directory: {:?}", config.data_dir)
        })?;

        let primary: Option<Box<dyn ModuleBackend>> = if config.primary_enabled {
            match SqliteStore::open(&config.primary_path()) {
                Ok(store) => Some(Box::new(store)),
                Err(e) => {
                    warn!(
                        path = %config.primary_path().display(),
                        error = %e,
                        "primary store could not be opened, using fallback only"
                    );
                    None
                }
            }
        } else {
            info!("primary store disabled by configuration");
            None
        };

        let fallback = Box::new(FlatFileStore::new(config.fallback_path()));

        info!(
            data_dir = %config.data_dir.display(),
            primary = primary.is_some(),
            "module engine opened"
        );

        Ok(Self::with_backends(primary, fallback)
            .with_default_category(config.default_category.clone())
            .with_event_capacity(config.event_capacity))
    }

    /// Build an engine over explicit backends
    pub fn with_backends(
        primary: Option<Box<dyn ModuleBackend>>,
        fallback: Box<dyn ModuleBackend>,
    ) -> Self {
        Self {
            primary,
            fallback,
            notifier: ChangeNotifier::new(DEFAULT_EVENT_CAPACITY),
            default_category: DEFAULT_CATEGORY.to_string(),
            primary_stale: AtomicBool::new(false),
        }
    }

    /// Category applied to definitions saved without one
    pub fn with_default_category(mut self, category: impl Into<String>) -> Self {
        let category = category.into();
        let category = category.trim();
        if !category.is_empty() {
            self.default_category = category.to_string();
        }
        self
    }

    /// Per-subscriber event buffer; replaces the notifier, so call before
    /// `subscribe`
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.notifier = ChangeNotifier::new(capacity);
        self
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<ModulesChanged> {
        self.notifier.subscribe()
    }

    /// Category applied to definitions saved without one
    pub fn default_category(&self) -> &str {
        &self.default_category
    }

    // ==================== Operations ====================

    /// Create a module, or update it if the id already exists
    ///
    /// Returns the full module set after the write.
    pub async fn save_block(
        &self,
        definition: &ModuleDefinition,
    ) -> Result<Vec<ModuleRecord>, ModuleError> {
        let valid = definition.validate(&self.default_category)?;
        let mut modules = self.read_modules().await?;
        let now = Utc::now();

        match modules.iter_mut().find(|m| m.id == valid.id) {
            Some(existing) => {
                debug!(id = %valid.id, version = existing.version, "save on existing id, updating");
                existing.apply_update(valid, now);
            }
            None => {
                debug!(id = %valid.id, "creating module");
                modules.push(ModuleRecord::create(valid, now));
            }
        }

        self.commit(modules).await
    }

    /// Replace the content of an existing module, keeping its history
    ///
    /// Returns the full module set after the write.
    pub async fn update_block(
        &self,
        definition: &ModuleDefinition,
    ) -> Result<Vec<ModuleRecord>, ModuleError> {
        let valid = definition.validate(&self.default_category)?;
        let mut modules = self.read_modules().await?;

        let existing = modules
            .iter_mut()
            .find(|m| m.id == valid.id)
            .ok_or_else(|| ModuleError::NotFound {
                id: valid.id.clone(),
            })?;

        debug!(id = %valid.id, from = existing.version, "updating module");
        existing.apply_update(valid, Utc::now());

        self.commit(modules).await
    }

    /// Remove a module
    ///
    /// Returns the remaining module set.
    pub async fn delete_block(&self, id: &str) -> Result<Vec<ModuleRecord>, ModuleError> {
        let id = id.trim();
        let mut modules = self.read_modules().await?;

        let position = modules
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| ModuleError::NotFound { id: id.to_string() })?;

        let removed = modules.remove(position);
        debug!(id = %removed.id, version = removed.version, "deleting module");

        self.commit(modules).await
    }

    /// Read the current module set
    ///
    /// Returns an empty set when nothing has been persisted yet.
    pub async fn load_blocks(&self) -> Result<Vec<ModuleRecord>, ModuleError> {
        self.read_modules().await
    }

    /// Read a single module
    pub async fn get_block(&self, id: &str) -> Result<Option<ModuleRecord>, ModuleError> {
        let id = id.trim();
        Ok(self.read_modules().await?.into_iter().find(|m| m.id == id))
    }

    /// Describe which backend is serving reads and writes
    pub fn storage_status(&self) -> StorageStatus {
        let available = self.available_primary();
        StorageStatus {
            primary_configured: self.primary.is_some(),
            primary_available: available.is_some(),
            primary_stale: self.primary_stale.load(Ordering::SeqCst),
            active_backend: available.map_or(self.fallback.name(), |p| p.name()),
        }
    }

    // ==================== Persistence ====================

    fn available_primary(&self) -> Option<&dyn ModuleBackend> {
        self.primary
            .as_deref()
            .filter(|primary| primary.is_available())
    }

    /// Persist, publish and hand back the new module set
    async fn commit(&self, modules: Vec<ModuleRecord>) -> Result<Vec<ModuleRecord>, ModuleError> {
        let backend = self.persist(&modules).await?;
        debug!(backend, count = modules.len(), "module set persisted");

        self.notifier.emit(modules.clone());
        Ok(modules)
    }

    /// Write the complete set, returning the name of the backend that took it
    async fn persist(&self, modules: &[ModuleRecord]) -> Result<&'static str, ModuleError> {
        let payload = serde_json::to_string(modules).map_err(StorageError::from)?;

        if let Some(primary) = self.available_primary() {
            match primary.put(MODULES_KEY, &payload).await {
                Ok(()) => {
                    self.primary_stale.store(false, Ordering::SeqCst);
                    return Ok(primary.name());
                }
                Err(e) => warn!(
                    backend = primary.name(),
                    error = %e,
                    "primary write failed, falling back"
                ),
            }
        } else if let Some(primary) = &self.primary {
            debug!(backend = primary.name(), "primary unavailable, using fallback");
        }

        if let Err(e) = self.fallback.put(FALLBACK_KEY, &payload).await {
            error!(
                backend = self.fallback.name(),
                error = %e,
                "fallback write failed, modules not saved"
            );
            return Err(e.into());
        }

        if self.primary.is_some() {
            self.primary_stale.store(true, Ordering::SeqCst);
        }
        Ok(self.fallback.name())
    }

    /// Read the module set: primary when available and populated, else fallback
    async fn read_modules(&self) -> Result<Vec<ModuleRecord>, ModuleError> {
        let stale = self.primary_stale.load(Ordering::SeqCst);

        if let Some(primary) = self.available_primary().filter(|_| !stale) {
            match primary.get(MODULES_KEY).await {
                Ok(Some(raw)) => match decode(&raw, primary.name()) {
                    Ok(modules) => return Ok(modules),
                    Err(e) => warn!(
                        backend = primary.name(),
                        error = %e,
                        "primary data unreadable, trying fallback"
                    ),
                },
                Ok(None) => debug!(backend = primary.name(), "primary store is empty"),
                Err(e) => warn!(
                    backend = primary.name(),
                    error = %e,
                    "primary read failed, trying fallback"
                ),
            }
        }

        match self.fallback.get(FALLBACK_KEY).await? {
            Some(raw) => Ok(decode(&raw, self.fallback.name())?),
            None => Ok(Vec::new()),
        }
    }
}

fn decode(raw: &str, backend: &'static str) -> Result<Vec<ModuleRecord>, StorageError> {
    serde_json::from_str(raw).map_err(|e| StorageError::Corrupt {
        backend,
        details: e.to_string(),
    })
}
