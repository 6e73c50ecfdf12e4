//! Core plugin types.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Kind of plugin, as declared by the manifest's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginType {
    /// App plugin - bundles pages and may include other plugins.
    App,
    /// Data source plugin.
    Datasource,
    /// Panel plugin - a visualization.
    Panel,
    /// Dashboard shipped by an app.
    Dashboard,
}

impl PluginType {
    /// Get the display name for this plugin type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::App => "App",
            Self::Datasource => "Data source",
            Self::Panel => "Panel",
            Self::Dashboard => "Dashboard",
        }
    }

    /// Wire name, as written in `plugin.json`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::App => "app",
            Self::Datasource => "datasource",
            Self::Panel => "panel",
            Self::Dashboard => "dashboard",
        }
    }
}

impl std::fmt::Display for PluginType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Plugin manifest file name.
pub const MANIFEST_FILE: &str = "plugin.json";

/// Readme cached alongside a registered manifest.
pub const README_FILE: &str = "README.md";

/// Wildcard platform version used when a manifest leaves it empty.
pub const ANY_PLATFORM_VERSION: &str = "*";

static PLUGIN_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("valid plugin id regex"));

/// Check that a plugin id is usable as a single directory name.
pub fn is_valid_plugin_id(id: &str) -> bool {
    id != "." && id != ".." && PLUGIN_ID_PATTERN.is_match(id)
}
