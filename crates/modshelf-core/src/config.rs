//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/modshelf/config.toml)
//! 3. Environment variables (MODSHELF_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::DEFAULT_CATEGORY;

/// Environment variable prefix
const ENV_PREFIX: &str = "MODSHELF";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for data storage (SQLite primary store, fallback file)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Whether the SQLite primary store should be used at all
    #[serde(default = "default_primary_enabled")]
    pub primary_enabled: bool,

    /// Category applied to modules saved without one
    #[serde(default = "default_category")]
    pub default_category: String,

    /// Buffered change notifications per subscriber
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Log filter used by the CLI when RUST_LOG is unset
    #[serde(default)]
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            primary_enabled: default_primary_enabled(),
            default_category: default_category(),
            event_capacity: default_event_capacity(),
            log_level: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (MODSHELF_DATA_DIR, MODSHELF_PRIMARY_ENABLED,
    ///    MODSHELF_DEFAULT_CATEGORY)
    /// 2. Config file (~/.config/modshelf/config.toml or MODSHELF_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring an explicit path given on the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Configuration rooted at `data_dir` with every other value defaulted
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // MODSHELF_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // MODSHELF_PRIMARY_ENABLED
        if let Ok(val) = std::env::var(format!("{}_PRIMARY_ENABLED", ENV_PREFIX)) {
            self.primary_enabled = val.eq_ignore_ascii_case("true") || val == "1";
        }

        // MODSHELF_DEFAULT_CATEGORY (blank keeps the current value)
        if let Ok(val) = std::env::var(format!("{}_DEFAULT_CATEGORY", ENV_PREFIX)) {
            let val = val.trim();
            if !val.is_empty() {
                self.default_category = val.to_string();
            }
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to the default config file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with MODSHELF_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("modshelf")
            .join("config.toml")
    }

    /// Get the path to the SQLite primary store
    pub fn primary_path(&self) -> PathBuf {
        self.data_dir.join("modules.db")
    }

    /// Get the path to the flat fallback store
    pub fn fallback_path(&self) -> PathBuf {
        self.data_dir.join("fallback.json")
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("modshelf")
}

fn default_primary_enabled() -> bool {
    true
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn default_event_capacity() -> usize {
    16
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "MODSHELF_DATA_DIR",
        "MODSHELF_PRIMARY_ENABLED",
        "MODSHELF_DEFAULT_CATEGORY",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.primary_enabled);
        assert_eq!(config.default_category, "Custom Modules");
        assert_eq!(config.event_capacity, 16);
        assert!(config.data_dir.ends_with("modshelf"));
    }

    #[test]
    fn test_file_paths() {
        let config = Config::with_data_dir("/data/modshelf");

        assert_eq!(
            config.primary_path(),
            PathBuf::from("/data/modshelf/modules.db")
        );
        assert_eq!(
            config.fallback_path(),
            PathBuf::from("/data/modshelf/fallback.json")
        );
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("MODSHELF_DATA_DIR", "/tmp/modshelf-test");
        config.apply_env_overrides();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/modshelf-test"));
    }

    #[test]
    fn test_env_override_primary_enabled() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("MODSHELF_PRIMARY_ENABLED", "false");
        config.apply_env_overrides();
        assert!(!config.primary_enabled);

        env::set_var("MODSHELF_PRIMARY_ENABLED", "1");
        config.apply_env_overrides();
        assert!(config.primary_enabled);

        env::set_var("MODSHELF_PRIMARY_ENABLED", "TRUE");
        config.primary_enabled = false;
        config.apply_env_overrides();
        assert!(config.primary_enabled);
    }

    #[test]
    fn test_env_override_default_category() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("MODSHELF_DEFAULT_CATEGORY", "  Newsletters ");
        config.apply_env_overrides();
        assert_eq!(config.default_category, "Newsletters");

        // Blank values are ignored
        env::set_var("MODSHELF_DEFAULT_CATEGORY", "   ");
        config.apply_env_overrides();
        assert_eq!(config.default_category, "Newsletters");
    }

    #[test]
    fn test_serialization() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config {
            data_dir: PathBuf::from("/data/modshelf"),
            primary_enabled: false,
            default_category: "Footers".to_string(),
            event_capacity: 4,
            log_level: Some("debug".to_string()),
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("data_dir"));
        assert!(toml_str.contains("primary_enabled"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.data_dir, config.data_dir);
        assert_eq!(parsed.primary_enabled, config.primary_enabled);
        assert_eq!(parsed.default_category, config.default_category);
        assert_eq!(parsed.event_capacity, 4);
        assert_eq!(parsed.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_load_from_str_fills_defaults() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert!(config.primary_enabled);
        assert_eq!(config.default_category, DEFAULT_CATEGORY);
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_save_to_path_roundtrip() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("conf").join("config.toml");

        let mut config = Config::with_data_dir(temp_dir.path().join("data"));
        config.default_category = "Headers".to_string();
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_with_cli_override(Some(&path)).unwrap();
        assert_eq!(loaded.data_dir, config.data_dir);
        assert_eq!(loaded.default_category, "Headers");
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = tempfile::TempDir::new().unwrap();
        env::set_var("MODSHELF_DATA_DIR", temp_dir.path().join("data"));

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();

        // Defaults, with the data directory created on load
        assert!(config.primary_enabled);
        assert!(config.data_dir.exists());
    }
}
