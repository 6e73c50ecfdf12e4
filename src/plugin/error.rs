//! Plugin subsystem error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;

/// Errors that can occur while resolving, installing, or registering plugins.
#[derive(Debug, Error)]
pub enum PluginError {
    /// No plugin with this id exists in the catalog or registry.
    #[error("Plugin with id {plugin_id} not found")]
    NotFound { plugin_id: String },

    /// The requested version is not listed for the plugin.
    #[error("Could not find version {version} of plugin {plugin_id}")]
    VersionNotFound { plugin_id: String, version: String },

    /// A manifest with the same id is already registered.
    #[error("Plugin with id {0} already exists")]
    DuplicateId(String),

    /// Invalid plugin manifest.
    #[error("Invalid plugin manifest: {0}")]
    InvalidManifest(String),

    /// Bad argument supplied by the caller.
    #[error("{0}")]
    InvalidInput(String),

    /// The install directory is missing and cannot be created, or is not a directory.
    #[error("Path {} is not a directory", .0.display())]
    InvalidInstallDir(PathBuf),

    /// Network error (catalog lookups and archive downloads).
    #[error("Network error: {0}")]
    Network(String),

    /// The downloaded body is not a readable zip archive.
    #[error("Invalid plugin archive: {0}")]
    Archive(String),

    /// A destination file could not be created for lack of write access.
    #[error(
        "Could not create file {}. Permission denied. Make sure you have write access to the plugin directory",
        .path.display()
    )]
    PermissionDenied { path: PathBuf },

    /// One or more archive entries failed to extract.
    #[error("Failed to extract {failed} file(s) of plugin {plugin_id}: {first}")]
    Extraction { plugin_id: String, failed: usize, first: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PluginError {
    /// Whether a fresh attempt at the same download could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Archive(_))
    }
}
