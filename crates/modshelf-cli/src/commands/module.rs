//! Module command handlers

use std::io::Read;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;

use modshelf_core::{ModuleDefinition, ModuleEngine};

use crate::output::Output;
use crate::slug::module_id_for;

/// Metadata key recording which tool issued the write
const SAVED_FROM_KEY: &str = "savedFrom";
const SAVED_FROM: &str = "cli";

/// Content options shared by save and update
#[derive(Debug, Default)]
pub struct Content {
    pub markup: Option<String>,
    pub file: Option<PathBuf>,
    pub category: Option<String>,
    pub thumbnail: Option<String>,
    pub meta: Vec<String>,
}

impl Content {
    /// Markup from --markup, or from --file ('-' reads stdin)
    fn read_markup(&self) -> Result<Option<String>> {
        if let Some(ref markup) = self.markup {
            return Ok(Some(markup.clone()));
        }

        match self.file {
            Some(ref path) if path.as_os_str() == "-" => {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("Failed to read markup from stdin")?;
                Ok(Some(buf))
            }
            Some(ref path) => std::fs::read_to_string(path)
                .map(Some)
                .with_context(|| format!("Failed to read markup from {:?}", path)),
            None => Ok(None),
        }
    }

    /// Apply category, thumbnail and metadata options to a definition
    fn apply(&self, mut definition: ModuleDefinition) -> Result<ModuleDefinition> {
        if let Some(ref category) = self.category {
            definition.category = Some(category.clone());
        }
        if let Some(ref thumbnail) = self.thumbnail {
            definition.thumbnail = Some(thumbnail.clone());
        }
        for entry in &self.meta {
            let (key, value) = parse_meta(entry)?;
            definition.metadata.insert(key, value);
        }
        definition
            .metadata
            .insert(SAVED_FROM_KEY.to_string(), Value::from(SAVED_FROM));
        Ok(definition)
    }
}

/// Save a module
pub async fn save(
    engine: &ModuleEngine,
    label: String,
    id: Option<String>,
    content: Content,
    output: &Output,
) -> Result<()> {
    let markup = content
        .read_markup()?
        .ok_or_else(|| anyhow!("Provide markup with --markup or --file"))?;
    let id = id.unwrap_or_else(|| module_id_for(&label));

    let definition = content.apply(ModuleDefinition::new(id, label, markup))?;
    let modules = engine
        .save_block(&definition)
        .await
        .context("Failed to save module")?;

    let saved = modules
        .iter()
        .find(|m| m.id == definition.id.trim())
        .ok_or_else(|| anyhow!("Saved module missing from result"))?;

    output.success(&format!("Saved {} (v{})", saved.id, saved.version));
    output.print_module(saved);
    Ok(())
}

/// Update a module, keeping current values for anything not given
pub async fn update(
    engine: &ModuleEngine,
    id: String,
    label: Option<String>,
    content: Content,
    output: &Output,
) -> Result<()> {
    let current = engine
        .get_block(&id)
        .await?
        .ok_or_else(|| anyhow!("Module not found: {}", id))?;

    let markup = content.read_markup()?.unwrap_or(current.markup);
    let mut definition = ModuleDefinition::new(
        current.id.clone(),
        label.unwrap_or(current.label),
        markup,
    );
    definition.category = Some(current.category);
    definition.thumbnail = current.thumbnail;

    let definition = content.apply(definition)?;
    let modules = engine
        .update_block(&definition)
        .await
        .with_context(|| format!("Failed to update module {}", id))?;

    let updated = modules
        .iter()
        .find(|m| m.id == current.id)
        .ok_or_else(|| anyhow!("Updated module missing from result"))?;

    output.success(&format!("Updated {} to v{}", updated.id, updated.version));
    output.print_module(updated);
    Ok(())
}

/// Delete a module
pub async fn delete(engine: &ModuleEngine, id: String, output: &Output) -> Result<()> {
    let remaining = engine
        .delete_block(&id)
        .await
        .with_context(|| format!("Failed to delete module {}", id))?;

    output.success(&format!(
        "Deleted {} ({} module(s) remaining)",
        id.trim(),
        remaining.len()
    ));
    Ok(())
}

/// List modules, optionally filtered by category
pub async fn list(engine: &ModuleEngine, category: Option<String>, output: &Output) -> Result<()> {
    let mut modules = engine.load_blocks().await?;

    if let Some(ref category) = category {
        let wanted = category.trim();
        modules.retain(|m| m.category.eq_ignore_ascii_case(wanted));
    }

    output.print_modules(&modules);
    Ok(())
}

/// Show a single module
pub async fn show(engine: &ModuleEngine, id: String, output: &Output) -> Result<()> {
    let module = engine
        .get_block(&id)
        .await?
        .ok_or_else(|| anyhow!("Module not found: {}", id))?;

    output.print_module(&module);
    Ok(())
}

/// Parse a `key=value` metadata option
///
/// Values that parse as JSON (numbers, booleans, objects) are stored as such;
/// anything else is stored as a string.
fn parse_meta(entry: &str) -> Result<(String, Value)> {
    let Some((key, value)) = entry.split_once('=') else {
        bail!("Invalid metadata '{}': expected KEY=VALUE", entry);
    };

    let key = key.trim();
    if key.is_empty() {
        bail!("Invalid metadata '{}': key is empty", entry);
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::from(value));
    Ok((key.to_string(), value))
}
