//! Plugin manager: resolves, installs, lists and removes plugins.

use std::path::{Path, PathBuf};

use super::installer::{prepare_install_dir, ArchiveInstaller};
use super::types::is_valid_plugin_id;
use super::{
    select_version, ArchiveSource, Catalog, CatalogClient, CatalogPlugin, PluginError,
    PluginRegistry, PluginResult, DEFAULT_REPO_URL,
};
use crate::core::{Config, RetryConfig};

/// A request to install one plugin.
#[derive(Debug, Clone)]
pub struct InstallTarget {
    /// Plugin id in the catalog.
    pub plugin_id: String,
    /// Exact version to install; latest when `None` or empty.
    pub requested_version: Option<String>,
    /// Directory the plugin folder is created in.
    pub install_dir: PathBuf,
    /// Catalog base URL the plugin is resolved against.
    pub repo_url: String,
}

impl InstallTarget {
    pub fn new(plugin_id: impl Into<String>, install_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            requested_version: None,
            install_dir: install_dir.into(),
            repo_url: DEFAULT_REPO_URL.to_string(),
        }
    }

    /// Resolve against a different catalog.
    pub fn with_repo_url(mut self, repo_url: impl Into<String>) -> Self {
        self.repo_url = repo_url.into();
        self
    }

    /// Pin a specific version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.requested_version = Some(version.into());
        self
    }
}

/// Result of a successful install.
#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub plugin_id: String,
    pub version: String,
    /// `{install_dir}/{plugin_id}`.
    pub plugin_dir: PathBuf,
    pub files_written: usize,
}

/// Drives catalog lookup, version selection and archive installation.
pub struct PluginManager<C> {
    catalog: C,
    retry: RetryConfig,
}

impl PluginManager<CatalogClient> {
    /// Create a manager talking to the catalog configured in `config`.
    pub fn from_config(config: &Config) -> PluginResult<Self> {
        let catalog = CatalogClient::new(&config.catalog.repo_url, config.network.timeout())?;
        Ok(Self::new(catalog))
    }

    /// Create a manager talking to the catalog named by `target`.
    pub fn for_target(target: &InstallTarget, config: &Config) -> PluginResult<Self> {
        let catalog = CatalogClient::new(&target.repo_url, config.network.timeout())?;
        Ok(Self::new(catalog))
    }
}

impl<C: Catalog + ArchiveSource> PluginManager<C> {
    /// Create a manager over any catalog implementation.
    pub fn new(catalog: C) -> Self {
        Self { catalog, retry: RetryConfig::once() }
    }

    /// Override the download retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// The underlying catalog.
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Install a plugin from the catalog.
    ///
    /// Dependencies declared by the plugin are not installed.
    pub fn install(&self, target: &InstallTarget) -> PluginResult<InstallOutcome> {
        let plugin_id = target.plugin_id.as_str();
        validate_plugin_id(plugin_id)?;
        prepare_install_dir(&target.install_dir)?;

        let plugin = self.catalog.get_plugin(plugin_id)?;
        let version = select_version(&plugin, target.requested_version.as_deref())?;
        let url = self.catalog.download_url(plugin_id, &version.version);

        tracing::info!(
            plugin = plugin_id,
            version = %version.version,
            url = %url,
            into = ?target.install_dir,
            "Installing plugin"
        );

        let report = ArchiveInstaller::new(&self.catalog)
            .with_retry(self.retry.clone())
            .install(plugin_id, &target.install_dir, &url)?;

        Ok(InstallOutcome {
            plugin_id: plugin_id.to_string(),
            version: version.version.clone(),
            plugin_dir: target.install_dir.join(plugin_id),
            files_written: report.written.len(),
        })
    }

    /// Fetch a plugin's catalog entry, including its versions.
    pub fn remote_plugin(&self, plugin_id: &str) -> PluginResult<CatalogPlugin> {
        validate_plugin_id(plugin_id)?;
        self.catalog.get_plugin(plugin_id)
    }

    /// List every plugin in the catalog.
    pub fn remote_plugins(&self) -> PluginResult<Vec<CatalogPlugin>> {
        self.catalog.list_plugins()
    }
}

/// Scan `plugins_dir` and return the registry of installed plugins.
pub fn installed(plugins_dir: &Path, static_root: Option<&Path>) -> PluginResult<PluginRegistry> {
    PluginRegistry::scan(plugins_dir, static_root)
}

/// Remove `{plugins_dir}/{plugin_id}`.
pub fn uninstall(plugins_dir: &Path, plugin_id: &str) -> PluginResult<PathBuf> {
    validate_plugin_id(plugin_id)?;

    let plugin_dir = plugins_dir.join(plugin_id);
    if !plugin_dir.is_dir() {
        return Err(PluginError::NotFound { plugin_id: plugin_id.to_string() });
    }

    std::fs::remove_dir_all(&plugin_dir)?;
    tracing::info!(plugin = plugin_id, path = ?plugin_dir, "Removed plugin");
    Ok(plugin_dir)
}

fn validate_plugin_id(plugin_id: &str) -> PluginResult<()> {
    if plugin_id.is_empty() {
        return Err(PluginError::InvalidInput("Please specify a plugin to install".to_string()));
    }
    if !is_valid_plugin_id(plugin_id) {
        return Err(PluginError::InvalidInput(format!("Invalid plugin id '{plugin_id}'")));
    }
    Ok(())
}
