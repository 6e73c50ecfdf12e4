//! In-process registry of discovered plugin manifests.
//!
//! The registry is populated once, by scanning the plugins directory at
//! startup, and is read-only afterwards. Share it as `Arc<PluginRegistry>`
//! between readers; no lock is needed because nothing mutates it after the
//! scan.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::types::{MANIFEST_FILE, README_FILE};
use super::{PluginError, PluginManifest, PluginResult, PluginType};

/// Per-organization settings for an app plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSetting {
    pub org_id: i64,
    pub plugin_id: String,
    pub enabled: bool,
    pub pinned: bool,
}

/// An app plugin enabled for an organization.
#[derive(Debug, Clone)]
pub struct EnabledApp<'a> {
    pub manifest: &'a PluginManifest,
    /// Whether the app is pinned to the navigation.
    pub pinned: bool,
}

/// Plugins enabled for one organization, grouped by kind.
#[derive(Debug, Clone, Default)]
pub struct EnabledPlugins<'a> {
    pub panels: Vec<&'a PluginManifest>,
    pub data_sources: BTreeMap<String, &'a PluginManifest>,
    pub apps: Vec<EnabledApp<'a>>,
}

impl<'a> EnabledPlugins<'a> {
    /// Create an empty view with every container initialized.
    pub fn new() -> Self {
        Self { panels: Vec::new(), data_sources: BTreeMap::new(), apps: Vec::new() }
    }
}

/// Mapping from plugin id to its manifest.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<String, PluginManifest>,
    /// Root of the plugins bundled with the platform.
    static_root: Option<PathBuf>,
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry that treats plugins under `static_root` as bundled.
    pub fn with_static_root(static_root: impl Into<PathBuf>) -> Self {
        Self { plugins: BTreeMap::new(), static_root: Some(static_root.into()) }
    }

    /// Whether a plugin directory belongs to the bundled set.
    pub fn is_bundled(&self, plugin_dir: &Path) -> bool {
        self.static_root.as_deref().is_some_and(|root| plugin_dir.starts_with(root))
    }

    /// Whether a manifest with this id is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.plugins.contains_key(id)
    }

    pub(crate) fn insert(&mut self, manifest: PluginManifest) {
        self.plugins.entry(manifest.id.clone()).or_insert(manifest);
    }

    /// Look up a plugin by id.
    pub fn lookup(&self, id: &str) -> PluginResult<&PluginManifest> {
        self.plugins.get(id).ok_or_else(|| PluginError::NotFound { plugin_id: id.to_string() })
    }

    /// Number of registered plugins.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Iterate over all manifests, ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &PluginManifest> {
        self.plugins.values()
    }

    /// Iterate over manifests of one kind.
    pub fn by_type(&self, plugin_type: PluginType) -> impl Iterator<Item = &PluginManifest> {
        self.plugins.values().filter(move |p| p.plugin_type == plugin_type)
    }

    /// Plugins enabled for `org_id`.
    ///
    /// Panels and data sources are always enabled. Apps are enabled only when
    /// `settings` holds an enabled entry for the org.
    pub fn enabled_plugins(&self, org_id: i64, settings: &[AppSetting]) -> EnabledPlugins<'_> {
        let mut enabled = EnabledPlugins::new();

        for plugin in self.plugins.values() {
            match plugin.plugin_type {
                PluginType::Panel => enabled.panels.push(plugin),
                PluginType::Datasource => {
                    enabled.data_sources.insert(plugin.id.clone(), plugin);
                }
                PluginType::App => {
                    let setting = settings
                        .iter()
                        .find(|s| s.org_id == org_id && s.plugin_id == plugin.id && s.enabled);
                    if let Some(setting) = setting {
                        enabled.apps.push(EnabledApp { manifest: plugin, pinned: setting.pinned });
                    }
                }
                PluginType::Dashboard => {}
            }
        }

        enabled
    }

    /// Build a registry from every `plugin.json` found under `root`.
    ///
    /// Malformed manifests are skipped with a warning. Two manifests with the
    /// same id are a hard error.
    pub fn scan(root: &Path, static_root: Option<&Path>) -> PluginResult<Self> {
        let mut registry = match static_root {
            Some(static_root) => Self::with_static_root(static_root),
            None => Self::new(),
        };

        if !root.is_dir() {
            return Ok(registry);
        }

        let manifests = WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(path = ?e.path(), error = %e, "Skipping unreadable plugin path");
                    None
                }
            })
            .filter(|e| e.file_type().is_file() && e.file_name() == MANIFEST_FILE);

        for entry in manifests {
            let Some(plugin_dir) = entry.path().parent() else { continue };

            let mut manifest = match PluginManifest::from_file(entry.path()) {
                Ok(manifest) => manifest,
                Err(e) => {
                    tracing::warn!(path = ?entry.path(), error = %e, "Skipping plugin manifest");
                    continue;
                }
            };

            if let Err(e) = manifest.validate() {
                tracing::warn!(path = ?entry.path(), error = %e, "Skipping plugin manifest");
                continue;
            }

            let readme = plugin_dir.join(README_FILE);
            if readme.is_file() {
                manifest.readme = std::fs::read(&readme).ok();
            }

            manifest.register(&mut registry, plugin_dir)?;
        }

        registry.link_included_plugins();
        Ok(registry)
    }

    /// Mark plugins that live inside an app plugin's directory.
    fn link_included_plugins(&mut self) {
        let apps: Vec<(String, PathBuf)> = self
            .by_type(PluginType::App)
            .map(|app| (app.id.clone(), app.plugin_dir.clone()))
            .collect();

        for plugin in self.plugins.values_mut() {
            let parent_app = apps.iter().find(|(app_id, app_dir)| {
                *app_id != plugin.id && plugin.plugin_dir.starts_with(app_dir)
            });
            if let Some((app_id, _)) = parent_app {
                plugin.included_in_app_id = Some(app_id.clone());
            }
        }
    }
}
