//! Configuration management for dashplug.
//!
//! Handles loading configuration from TOML files. Command-line flags and
//! environment variables are layered on top of the file by the CLI.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::plugin::{DEFAULT_REPO_URL, DEFAULT_TIMEOUT_SECS};

/// Local config file name, looked up in the current directory.
pub const LOCAL_CONFIG_FILE: &str = ".dashplug.toml";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Plugin directory settings
    pub plugins: PluginsConfig,

    /// Catalog settings
    pub catalog: CatalogConfig,

    /// Network settings
    pub network: NetworkConfig,
}

/// Plugin directory settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    /// Directory plugins are installed into
    pub path: Option<PathBuf>,

    /// Root of the plugins bundled with the platform
    pub static_root: Option<PathBuf>,
}

/// Catalog settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Base URL of the plugin catalog
    pub repo_url: String,
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Timeout for each catalog request or download, in seconds
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self { repo_url: DEFAULT_REPO_URL.to_string() }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self { timeout_secs: DEFAULT_TIMEOUT_SECS }
    }
}

impl NetworkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration.
    ///
    /// Looks for config in:
    /// 1. `explicit`, when given (must exist)
    /// 2. `.dashplug.toml` in current directory
    /// 3. `~/.config/dashplug/config.toml`
    /// 4. Falls back to defaults
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_file(&expand_path(path));
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(config_dir) = Self::config_dir() {
            let global_config = config_dir.join("config.toml");
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Could not read config {}: {e}", path.display()))?;
        let mut config: Self = toml::from_str(&content)?;
        config.plugins.path = config.plugins.path.map(|p| expand_path(&p));
        config.plugins.static_root = config.plugins.static_root.map(|p| expand_path(&p));
        Ok(config)
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("dashplug"))
    }
}

/// Expand a leading `~` in a user-supplied path.
pub fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).into_owned()),
        None => path.to_path_buf(),
    }
}
