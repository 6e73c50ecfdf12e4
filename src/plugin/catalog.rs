//! Remote plugin catalog client.
//!
//! The catalog exposes every published plugin and its releases:
//!
//! - `GET {repo}` lists all plugins
//! - `GET {repo}/{id}` returns one plugin with its versions, newest first
//! - `GET {repo}/{id}/versions/{version}/download` returns the zip archive

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{PluginError, PluginResult};

/// Default catalog URL.
pub const DEFAULT_REPO_URL: &str = "https://grafana.net/api/plugins";

/// Default timeout for catalog requests and downloads.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// A plugin as listed by the catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogPlugin {
    /// Plugin id.
    pub id: String,
    /// Catalog category (panel, datasource, app).
    pub category: String,
    pub description: String,
    /// Project homepage.
    pub url: String,
    /// Known releases. The first entry is the latest.
    pub versions: Vec<PluginVersion>,
}

/// One published release of a plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginVersion {
    pub version: String,
    pub commit: String,
    pub url: String,
}

impl PluginVersion {
    /// Create a version entry with only the version string set.
    pub fn new(version: impl Into<String>) -> Self {
        Self { version: version.into(), ..Default::default() }
    }
}

#[derive(Debug, Deserialize)]
struct CatalogIndex {
    #[serde(default)]
    plugins: Vec<CatalogPlugin>,
}

/// Plugin metadata lookups.
pub trait Catalog {
    /// Fetch one plugin with its version list.
    fn get_plugin(&self, plugin_id: &str) -> PluginResult<CatalogPlugin>;

    /// List every plugin the catalog knows.
    fn list_plugins(&self) -> PluginResult<Vec<CatalogPlugin>>;

    /// URL of the archive for one release.
    fn download_url(&self, plugin_id: &str, version: &str) -> String;
}

/// Source of plugin archives.
pub trait ArchiveSource {
    /// Download a complete archive body.
    fn fetch(&self, url: &str) -> PluginResult<Vec<u8>>;
}

/// HTTP client for the plugin catalog. Every call is a live request.
pub struct CatalogClient {
    repo_url: String,
    client: reqwest::blocking::Client,
}

impl CatalogClient {
    /// Create a client for the catalog at `repo_url`.
    pub fn new(repo_url: &str, timeout: Duration) -> PluginResult<Self> {
        let repo_url = repo_url.trim_end_matches('/');
        if repo_url.is_empty() {
            return Err(PluginError::InvalidInput("Missing catalog URL".to_string()));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(format!("dashplug/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PluginError::Network(e.to_string()))?;

        Ok(Self { repo_url: repo_url.to_string(), client })
    }

    /// The catalog base URL, without a trailing slash.
    pub fn repo_url(&self) -> &str {
        &self.repo_url
    }

    fn get(&self, url: &str) -> PluginResult<reqwest::blocking::Response> {
        tracing::debug!(url, "Catalog request");
        self.client.get(url).send().map_err(|e| PluginError::Network(e.to_string()))
    }
}

impl Catalog for CatalogClient {
    fn get_plugin(&self, plugin_id: &str) -> PluginResult<CatalogPlugin> {
        if plugin_id.is_empty() {
            return Err(PluginError::InvalidInput("Please specify a plugin id".to_string()));
        }

        let response = self.get(&format!("{}/{plugin_id}", self.repo_url))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PluginError::NotFound { plugin_id: plugin_id.to_string() });
        }

        if !response.status().is_success() {
            return Err(PluginError::Network(format!(
                "Failed to fetch plugin {plugin_id}: HTTP {}",
                response.status()
            )));
        }

        let mut plugin: CatalogPlugin = response
            .json()
            .map_err(|e| PluginError::Network(format!("Invalid catalog response: {e}")))?;

        if plugin.id.is_empty() {
            plugin.id = plugin_id.to_string();
        }

        Ok(plugin)
    }

    fn list_plugins(&self) -> PluginResult<Vec<CatalogPlugin>> {
        let response = self.get(&self.repo_url)?;

        if !response.status().is_success() {
            return Err(PluginError::Network(format!(
                "Failed to list plugins: HTTP {}",
                response.status()
            )));
        }

        let index: CatalogIndex = response
            .json()
            .map_err(|e| PluginError::Network(format!("Invalid catalog response: {e}")))?;

        Ok(index.plugins)
    }

    fn download_url(&self, plugin_id: &str, version: &str) -> String {
        format!("{}/{plugin_id}/versions/{version}/download", self.repo_url)
    }
}

impl ArchiveSource for CatalogClient {
    fn fetch(&self, url: &str) -> PluginResult<Vec<u8>> {
        let response = self.get(url)?;

        if !response.status().is_success() {
            return Err(PluginError::Network(format!(
                "Failed to download plugin: HTTP {}",
                response.status()
            )));
        }

        let bytes = response.bytes().map_err(|e| PluginError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
