//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use modshelf_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "primary_enabled": config.primary_enabled,
                    "default_category": config.default_category,
                    "event_capacity": config.event_capacity,
                    "log_level": config.log_level
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:         {}", config.data_dir.display());
            println!("  primary_enabled:  {}", config.primary_enabled);
            println!("  default_category: {}", config.default_category);
            println!("  event_capacity:   {}", config.event_capacity);
            println!(
                "  log_level:        {}",
                config.log_level.as_deref().unwrap_or("(not set)")
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "primary_enabled" => {
            config.primary_enabled = value
                .parse()
                .context("Invalid value for primary_enabled. Use 'true' or 'false'.")?;
        }
        "default_category" => {
            let value = value.trim();
            if value.is_empty() {
                bail!("default_category cannot be empty");
            }
            config.default_category = value.to_string();
        }
        "event_capacity" => {
            config.event_capacity = value
                .parse()
                .context("Invalid value for event_capacity. Use a positive number.")?;
        }
        "log_level" => {
            config.log_level = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.to_string())
            };
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, primary_enabled, default_category, event_capacity, log_level",
                key
            );
        }
    }
    Ok(())
}
