//! Plugin manifest parsing, normalization and registration.
//!
//! A plugin manifest is the `plugin.json` file at the root of every installed
//! plugin. It declares the plugin's identity, dependencies, and the pages an
//! app plugin includes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::types::{is_valid_plugin_id, ANY_PLATFORM_VERSION};
use super::{PluginError, PluginRegistry, PluginResult, PluginType};

/// Plugin manifest as declared in `plugin.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
    /// Plugin type.
    #[serde(rename = "type")]
    pub plugin_type: PluginType,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Unique plugin id.
    pub id: String,
    /// Descriptive metadata.
    #[serde(default)]
    pub info: PluginInfo,
    /// Declared dependencies.
    #[serde(default)]
    pub dependencies: PluginDependencies,
    /// Pages and plugins bundled by an app.
    #[serde(default)]
    pub includes: Vec<PluginInclude>,
    /// Frontend module path.
    #[serde(default)]
    pub module: String,
    /// Base URL the frontend loads the plugin from.
    #[serde(default)]
    pub base_url: String,

    /// Id of the app plugin this plugin is nested in, if any.
    #[serde(skip)]
    pub included_in_app_id: Option<String>,
    /// Absolute directory the plugin was found in.
    #[serde(skip)]
    pub plugin_dir: PathBuf,
    /// Cached readme contents.
    #[serde(skip)]
    pub readme: Option<Vec<u8>>,
}

/// The `info` block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginInfo {
    pub author: PluginInfoLink,
    pub description: String,
    pub links: Vec<PluginInfoLink>,
    pub logos: PluginLogos,
    pub screenshots: Vec<PluginScreenshot>,
    pub version: String,
    pub updated: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginInfoLink {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginLogos {
    pub small: String,
    pub large: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginScreenshot {
    pub path: String,
    pub name: String,
}

/// Declared dependencies of a plugin.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDependencies {
    /// Platform version constraint; `"*"` after normalization when unset.
    #[serde(default)]
    pub grafana_version: String,
    /// Plugins this plugin depends on. `null` in the file decodes as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub plugins: Vec<PluginDependencyItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDependencyItem {
    #[serde(rename = "type")]
    pub plugin_type: PluginType,
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// A page or plugin bundled by an app.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginInclude {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub include_type: String,
    pub id: String,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl PluginManifest {
    /// Parse a manifest from a JSON string.
    pub fn from_json(content: &str) -> PluginResult<Self> {
        serde_json::from_str(content).map_err(|e| PluginError::InvalidManifest(e.to_string()))
    }

    /// Parse a manifest from a file.
    pub fn from_file(path: &Path) -> PluginResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content).map_err(|e| match e {
            PluginError::InvalidManifest(msg) => {
                PluginError::InvalidManifest(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    /// Fill in defaults so callers can rely on dependencies being set.
    pub fn normalize(&mut self) {
        if self.dependencies.grafana_version.is_empty() {
            self.dependencies.grafana_version = ANY_PLATFORM_VERSION.to_string();
        }
    }

    /// Validate the structural minimum needed for registration.
    pub fn validate(&self) -> PluginResult<()> {
        if self.id.is_empty() {
            return Err(PluginError::InvalidManifest("Plugin id is required".to_string()));
        }

        if !is_valid_plugin_id(&self.id) {
            return Err(PluginError::InvalidManifest(format!(
                "Plugin id '{}' must start with an alphanumeric character and contain only \
                 alphanumerics, dots, hyphens, and underscores",
                self.id
            )));
        }

        if self.name.is_empty() {
            return Err(PluginError::InvalidManifest(format!(
                "Plugin '{}' has no name",
                self.id
            )));
        }

        Ok(())
    }

    /// Register this manifest under its id.
    ///
    /// A second registration of the same id is an error; the registry keeps
    /// the first manifest.
    pub fn register(mut self, registry: &mut PluginRegistry, plugin_dir: &Path) -> PluginResult<()> {
        if registry.contains(&self.id) {
            return Err(PluginError::DuplicateId(self.id));
        }

        if registry.is_bundled(plugin_dir) {
            tracing::debug!(plugin = %self.id, "Registering bundled plugin");
        } else {
            tracing::info!(plugin = %self.id, name = %self.name, "Registering plugin");
        }

        self.normalize();
        self.plugin_dir = plugin_dir.to_path_buf();
        registry.insert(self);
        Ok(())
    }
}
