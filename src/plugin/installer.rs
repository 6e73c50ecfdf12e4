//! Archive download and extraction.
//!
//! A plugin release is a zip archive whose single top-level folder is named
//! by whoever built it (often `<repo>-<commit>/`). Extraction rewrites that
//! folder to the plugin id, so every plugin ends up in `{target}/{id}/`.
//!
//! Extraction is best effort: a failing entry is recorded and the remaining
//! entries are still written. The install as a whole is then reported as
//! failed, and files already written are left in place.
//!
//! Two installs of the same plugin into the same directory at the same time
//! are not coordinated and may leave mixed files behind.

use std::fs::{self, File};
use std::io::{self, Cursor, Read, Seek};
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use zip::ZipArchive;

use super::types::is_valid_plugin_id;
use super::{ArchiveSource, PluginError, PluginResult};
use crate::core::{retry_if, RetryConfig};

/// Failure to extract one archive entry.
#[derive(Debug, Error)]
pub enum EntryError {
    /// The entry would be written outside the plugin directory.
    #[error("Refusing to extract '{name}': path escapes the plugin directory")]
    UnsafePath { name: String },

    /// No write access to the destination.
    #[error("Could not create file {}: permission denied", .path.display())]
    PermissionDenied { path: PathBuf },

    /// Any other filesystem failure.
    #[error("Could not write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The entry could not be read from the archive.
    #[error("Could not read archive entry #{index}: {message}")]
    Read { index: usize, message: String },
}

/// Outcome of unpacking one archive.
#[derive(Debug, Default)]
pub struct ExtractionReport {
    /// Files written, in archive order.
    pub written: Vec<PathBuf>,
    /// Entries that failed.
    pub errors: Vec<EntryError>,
}

impl ExtractionReport {
    /// Whether every entry was extracted.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Turn a report with failures into an error.
    ///
    /// A permission failure is surfaced as [`PluginError::PermissionDenied`]
    /// so the operator is told to check write access.
    pub fn into_result(self, plugin_id: &str) -> PluginResult<Self> {
        if self.is_success() {
            return Ok(self);
        }

        let denied = self.errors.iter().find_map(|e| match e {
            EntryError::PermissionDenied { path } => Some(path.clone()),
            _ => None,
        });
        if let Some(path) = denied {
            return Err(PluginError::PermissionDenied { path });
        }

        Err(PluginError::Extraction {
            plugin_id: plugin_id.to_string(),
            failed: self.errors.len(),
            first: self.errors[0].to_string(),
        })
    }
}

/// Make sure `path` is a usable install directory, creating it if missing.
pub fn prepare_install_dir(path: &Path) -> PluginResult<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(PluginError::InvalidInstallDir(path.to_path_buf())),
        Err(_) => fs::create_dir_all(path).map_err(|e| {
            tracing::debug!(path = ?path, error = %e, "Could not create install directory");
            PluginError::InvalidInstallDir(path.to_path_buf())
        }),
    }
}

/// Downloads plugin archives and unpacks them into a plugin directory.
pub struct ArchiveInstaller<'a> {
    source: &'a dyn ArchiveSource,
    retry: RetryConfig,
}

impl<'a> ArchiveInstaller<'a> {
    /// Create an installer that retries a failed download once.
    pub fn new(source: &'a dyn ArchiveSource) -> Self {
        Self { source, retry: RetryConfig::once() }
    }

    /// Override the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Download the archive at `url` and extract it to `{target_dir}/{plugin_id}`.
    pub fn install(
        &self,
        plugin_id: &str,
        target_dir: &Path,
        url: &str,
    ) -> PluginResult<ExtractionReport> {
        if !is_valid_plugin_id(plugin_id) {
            return Err(PluginError::InvalidInput(format!("Invalid plugin id '{plugin_id}'")));
        }
        prepare_install_dir(target_dir)?;

        let mut archive = self.download(url)?;
        let report = extract_archive(&mut archive, plugin_id, target_dir);

        let report = report.into_result(plugin_id)?;
        tracing::info!(plugin = plugin_id, files = report.written.len(), "Installed plugin");
        Ok(report)
    }

    /// Fetch and open the archive, retrying per the configured policy.
    fn download(&self, url: &str) -> PluginResult<ZipArchive<Cursor<Vec<u8>>>> {
        retry_if(
            &self.retry,
            |attempt| {
                tracing::debug!(url, attempt, "Downloading plugin archive");
                let body = self.source.fetch(url)?;
                open_archive(body)
            },
            PluginError::is_transient,
            |attempt, e| {
                tracing::warn!(url, attempt, error = %e, "Failed downloading. Will retry once.");
            },
        )
        .into_result()
    }
}

/// Open an in-memory zip archive.
pub fn open_archive(body: Vec<u8>) -> PluginResult<ZipArchive<Cursor<Vec<u8>>>> {
    ZipArchive::new(Cursor::new(body)).map_err(|e| PluginError::Archive(e.to_string()))
}

/// Extract every entry of `archive` under `target_dir`, in archive order.
///
/// An invalid `plugin_id` rejects every entry as unsafe.
pub fn extract_archive<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    plugin_id: &str,
    target_dir: &Path,
) -> ExtractionReport {
    let mut report = ExtractionReport::default();
    if !is_valid_plugin_id(plugin_id) {
        tracing::warn!(plugin = plugin_id, "Refusing to extract archive for invalid plugin id");
        report.errors = archive
            .file_names()
            .map(|name| EntryError::UnsafePath { name: name.to_string() })
            .collect();
        return report;
    }

    let plugin_root = target_dir.join(plugin_id);

    for index in 0..archive.len() {
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(e) => {
                report.errors.push(EntryError::Read { index, message: e.to_string() });
                continue;
            }
        };

        let name = entry.name().to_string();
        let dest = match rewrite_entry_path(plugin_id, &name) {
            Some(relative) => target_dir.join(relative),
            None => {
                tracing::warn!(entry = %name, "Skipping archive entry with unsafe path");
                report.errors.push(EntryError::UnsafePath { name });
                continue;
            }
        };

        if !is_within(target_dir, &dest) || !is_within(&plugin_root, &dest) {
            tracing::warn!(entry = %name, "Skipping archive entry with unsafe path");
            report.errors.push(EntryError::UnsafePath { name });
            continue;
        }

        let result = if entry.is_dir() {
            fs::create_dir_all(&dest).map_err(|e| entry_io_error(dest.clone(), e))
        } else {
            write_entry(&mut entry, &dest).map(|()| report.written.push(dest.clone()))
        };

        if let Err(e) = result {
            tracing::error!(entry = %name, error = %e, "Failed to extract archive entry");
            report.errors.push(e);
        }
    }

    report
}

fn write_entry(entry: &mut impl Read, dest: &Path) -> Result<(), EntryError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| entry_io_error(dest.to_path_buf(), e))?;
    }

    let mut file = File::create(dest).map_err(|e| entry_io_error(dest.to_path_buf(), e))?;
    io::copy(entry, &mut file).map_err(|e| entry_io_error(dest.to_path_buf(), e))?;
    Ok(())
}

fn entry_io_error(path: PathBuf, source: io::Error) -> EntryError {
    if source.kind() == io::ErrorKind::PermissionDenied {
        EntryError::PermissionDenied { path }
    } else {
        EntryError::Io { path, source }
    }
}

/// Replace the archive's top-level folder with `plugin_id`.
///
/// `repo-clock-panel-abcdef/img/logo.svg` becomes `clock-panel/img/logo.svg`.
/// Entries without a top-level folder are placed under `plugin_id/`.
/// Returns `None` for names that are absolute, use backslashes, carry a drive
/// prefix, or contain `..` below the top-level folder.
pub fn rewrite_entry_path(plugin_id: &str, name: &str) -> Option<PathBuf> {
    if name.is_empty() || name.starts_with('/') || name.contains('\\') {
        return None;
    }

    let rest = name.split_once('/').map_or(name, |(_, rest)| rest);

    let mut path = PathBuf::from(plugin_id);
    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => return None,
            s if s.contains(':') => return None,
            s => path.push(s),
        }
    }

    Some(path)
}

/// Lexical containment check; does not touch the filesystem.
fn is_within(base: &Path, path: &Path) -> bool {
    normalize_lexically(path).starts_with(normalize_lexically(base))
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
