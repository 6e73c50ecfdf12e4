//! Plugin acquisition and registry.
//!
//! Plugins are resolved against a remote catalog, downloaded as zip
//! archives, and unpacked into a local plugin directory. Installed plugins
//! are discovered by scanning that directory for `plugin.json` manifests and
//! registering them in a [`PluginRegistry`].
//!
//! # Flow
//!
//! ```text
//! Catalog ──► select_version ──► ArchiveInstaller ──► {path}/{id}/...
//!                                                         │
//!                           PluginRegistry::scan ◄────────┘
//! ```
//!
//! # Example Configuration
//!
//! ```toml
//! [plugins]
//! path = "/var/lib/dashboards/plugins"
//!
//! [catalog]
//! repo_url = "https://grafana.net/api/plugins"
//! ```

mod catalog;
mod error;
mod installer;
mod manager;
mod manifest;
mod registry;
mod types;
mod version;

pub use catalog::{
    ArchiveSource, Catalog, CatalogClient, CatalogPlugin, PluginVersion, DEFAULT_REPO_URL,
    DEFAULT_TIMEOUT_SECS,
};
pub use error::{PluginError, PluginResult};
pub use installer::{
    extract_archive, open_archive, prepare_install_dir, rewrite_entry_path, ArchiveInstaller,
    EntryError, ExtractionReport,
};
pub use manager::{installed, uninstall, InstallOutcome, InstallTarget, PluginManager};
pub use manifest::{
    PluginDependencies, PluginDependencyItem, PluginInclude, PluginInfo, PluginInfoLink,
    PluginLogos, PluginManifest, PluginScreenshot,
};
pub use registry::{AppSetting, EnabledApp, EnabledPlugins, PluginRegistry};
pub use types::{is_valid_plugin_id, PluginType, ANY_PLATFORM_VERSION, MANIFEST_FILE, README_FILE};
pub use version::select_version;
