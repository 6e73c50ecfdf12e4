//! # dashplug
//!
//! Plugin acquisition and registry for a dashboarding platform.
//!
//! dashplug resolves a plugin id against a remote catalog, picks a release,
//! downloads its zip archive and unpacks it into the local plugin directory.
//! Installed plugins are discovered by scanning that directory into a
//! [`PluginRegistry`], which guarantees one manifest per plugin id.
//!
//! ## Quick Start
//!
//! ```bash
//! # Install the latest release
//! dashplug --path /var/lib/dashboards/plugins install clock-panel
//!
//! # Pin a version
//! dashplug --path /var/lib/dashboards/plugins install clock-panel 0.9.0
//!
//! # See what is installed
//! dashplug --path /var/lib/dashboards/plugins ls
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod core;
pub mod plugin;

// Re-export commonly used types
pub use crate::core::Config;
pub use plugin::{
    InstallTarget, PluginError, PluginManager, PluginManifest, PluginRegistry, PluginResult,
    PluginType,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "dashplug";
