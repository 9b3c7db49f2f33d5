//! Data models for modshelf
//!
//! Defines the module record stored by the engine, the snapshots kept in its
//! history, and the definition callers hand to `save_block`/`update_block`.
//!
//! Records serialize with camelCase keys (`updatedAt`, `savedAt`) so the
//! stored JSON matches what editor-side consumers read.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ModuleError;

/// Category applied when a definition's category is blank
pub const DEFAULT_CATEGORY: &str = "Custom Modules";

/// Value of the `source` metadata tag the engine stamps on every write
pub const METADATA_SOURCE: &str = "user";

/// Metadata keys owned by the engine
pub mod metadata_keys {
    pub const SOURCE: &str = "source";
    pub const SAVED_AT: &str = "savedAt";
}

/// Free-form metadata attached to a module
pub type Metadata = Map<String, Value>;

/// A stored, versioned module
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModuleRecord {
    /// Unique identifier, immutable after creation
    pub id: String,
    /// Display name
    pub label: String,
    /// Grouping shown in the block manager
    pub category: String,
    /// Serialized content payload
    pub markup: String,
    /// Preview image URL; absent when none was supplied at the last write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Free-form metadata, always carrying `source` and `savedAt`
    #[serde(default)]
    pub metadata: Metadata,
    /// Starts at 1, incremented on every update
    pub version: u32,
    /// When this version was written
    pub updated_at: DateTime<Utc>,
    /// Prior versions, most recent first
    #[serde(default)]
    pub history: Vec<Snapshot>,
}

impl ModuleRecord {
    /// Build the first version of a record from a validated definition
    pub(crate) fn create(def: ValidDefinition, now: DateTime<Utc>) -> Self {
        let mut metadata = def.metadata;
        stamp_metadata(&mut metadata, now);

        Self {
            id: def.id,
            label: def.label,
            category: def.category,
            markup: def.markup,
            thumbnail: def.thumbnail,
            metadata,
            version: 1,
            updated_at: now,
            history: Vec::new(),
        }
    }

    /// Supersede the current version with a validated definition
    ///
    /// The outgoing version is captured as a snapshot at the front of
    /// `history`; existing metadata is kept and overlaid with the new keys.
    pub(crate) fn apply_update(&mut self, def: ValidDefinition, now: DateTime<Utc>) {
        self.history.insert(0, self.snapshot());

        self.version += 1;
        self.label = def.label;
        self.category = def.category;
        self.markup = def.markup;
        self.thumbnail = def.thumbnail;
        self.metadata.extend(def.metadata);
        stamp_metadata(&mut self.metadata, now);
        self.updated_at = now;
    }

    /// Capture the current version
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            version: self.version,
            label: self.label.clone(),
            markup: self.markup.clone(),
            updated_at: self.updated_at,
        }
    }

    /// Look up a prior version in `history`
    pub fn history_entry(&self, version: u32) -> Option<&Snapshot> {
        self.history.iter().find(|s| s.version == version)
    }
}

/// An immutable capture of a record as it was before an update
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: u32,
    pub label: String,
    pub markup: String,
    pub updated_at: DateTime<Utc>,
}

/// What a caller asks the engine to store
///
/// Fields are taken as given; trimming, defaulting and validation happen
/// inside the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDefinition {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub markup: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl ModuleDefinition {
    /// Create a definition with the three required fields
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        markup: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            markup: markup.into(),
            ..Self::default()
        }
    }

    /// Set the category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set the thumbnail
    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Trim, default and validate into a form the engine can store
    ///
    /// Fails with `ModuleError::Validation` unless `id`, `label` and
    /// `markup` are non-empty after trimming.
    pub fn validate(&self, default_category: &str) -> Result<ValidDefinition, ModuleError> {
        let id = self.id.trim();
        let label = self.label.trim();
        let markup = self.markup.trim();

        if id.is_empty() || label.is_empty() || markup.is_empty() {
            return Err(ModuleError::Validation);
        }

        let category = self
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(default_category);

        let thumbnail = self
            .thumbnail
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        Ok(ValidDefinition {
            id: id.to_string(),
            label: label.to_string(),
            category: category.to_string(),
            markup: markup.to_string(),
            thumbnail,
            metadata: self.metadata.clone(),
        })
    }
}

/// A trimmed definition that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidDefinition {
    pub id: String,
    pub label: String,
    pub category: String,
    pub markup: String,
    pub thumbnail: Option<String>,
    pub metadata: Metadata,
}

/// Write the engine-owned metadata keys; these always win over caller keys
fn stamp_metadata(metadata: &mut Metadata, now: DateTime<Utc>) {
    metadata.insert(
        metadata_keys::SOURCE.to_string(),
        Value::String(METADATA_SOURCE.to_string()),
    );
    metadata.insert(
        metadata_keys::SAVED_AT.to_string(),
        Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
}
