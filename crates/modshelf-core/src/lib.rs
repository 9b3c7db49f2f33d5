//! modshelf Core Library
//!
//! This crate provides the persistence layer for user-created modules:
//! reusable content blocks with a label, category, markup payload and a
//! retained version history.
//!
//! # Architecture
//!
//! - **SQLite**: primary store, holding the module set as one JSON value
//! - **Flat file**: fallback store used only when the primary is unavailable
//!   or a primary write fails
//! - **Change channel**: every successful write publishes the full module set
//!
//! # Quick Start
//!
//! ```text
//! let engine = ModuleEngine::open(&Config::load()?)?;
//!
//! // Save a module
//! let def = ModuleDefinition::new("hero", "Hero", "<mjml>...</mjml>");
//! engine.save_block(&def).await?;
//!
//! // List modules
//! let modules = engine.load_blocks().await?;
//! ```
//!
//! # Modules
//!
//! - `engine`: The module operations (main entry point)
//! - `models`: Module records, snapshots and definitions
//! - `events`: Change notifications
//! - `storage`: Backend port and its SQLite, flat-file and memory stores
//! - `config`: Application configuration

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod models;
pub mod storage;

pub use config::Config;
pub use engine::{ModuleEngine, StorageStatus};
pub use error::ModuleError;
pub use events::{ChangeDetail, ModulesChanged, MODULES_CHANGED_EVENT};
pub use models::{ModuleDefinition, ModuleRecord, Snapshot, DEFAULT_CATEGORY};
pub use storage::{FlatFileStore, MemoryStore, ModuleBackend, SqliteStore, StorageError};
