//! dashplug - install and inspect dashboard plugins from a remote catalog.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dashplug::core::{expand_path, Config};
use dashplug::plugin::{self, InstallTarget, PluginManager};

/// Install and manage dashboard plugins
#[derive(Parser)]
#[command(name = "dashplug")]
#[command(author, version, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Directory plugins are installed into
    #[arg(long, global = true, env = "DASHPLUG_PLUGINS_DIR")]
    path: Option<PathBuf>,

    /// Base URL of the plugin catalog
    #[arg(long, global = true, env = "DASHPLUG_REPO")]
    repo: Option<String>,

    /// Config file to use instead of the default locations
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a plugin from the catalog
    Install {
        /// Plugin id
        plugin_id: String,

        /// Exact version to install (latest if omitted)
        #[arg(value_name = "VERSION")]
        plugin_version: Option<String>,
    },

    /// Uninstall a plugin
    Uninstall {
        /// Plugin id
        plugin_id: String,
    },

    /// List installed plugins
    Ls,

    /// List plugins available in the catalog
    ListRemote,

    /// List the published versions of a plugin
    ListVersions {
        /// Plugin id
        plugin_id: String,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    // Setup logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn,dashplug=info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions { shell } = cli.command {
        cmd_completions(shell);
        return Ok(());
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(repo) = cli.repo {
        config.catalog.repo_url = repo;
    }
    if let Some(path) = cli.path {
        config.plugins.path = Some(expand_path(&path));
    }

    match cli.command {
        Commands::Install { plugin_id, plugin_version } => {
            cmd_install(&config, plugin_id, plugin_version)
        }
        Commands::Uninstall { plugin_id } => cmd_uninstall(&config, &plugin_id),
        Commands::Ls => cmd_ls(&config),
        Commands::ListRemote => cmd_list_remote(&config),
        Commands::ListVersions { plugin_id } => cmd_list_versions(&config, &plugin_id),
        Commands::Completions { .. } => Ok(()),
    }
}

/// The install directory, which must come from `--path` or the config file.
fn plugins_dir(config: &Config) -> Result<&Path> {
    config.plugins.path.as_deref().ok_or_else(|| {
        anyhow::anyhow!("Missing path flag. Use --path <dir> or set plugins.path in the config")
    })
}

fn cmd_install(config: &Config, plugin_id: String, version: Option<String>) -> Result<()> {
    let plugins_dir = plugins_dir(config)?;
    let mut target =
        InstallTarget::new(plugin_id, plugins_dir).with_repo_url(&config.catalog.repo_url);
    if let Some(version) = version {
        target = target.with_version(version);
    }
    let manager = PluginManager::for_target(&target, config)?;

    let outcome = manager
        .install(&target)
        .with_context(|| format!("Failed to install {}", target.plugin_id))?;

    println!("✔ Installed {} @ {} successfully", outcome.plugin_id, outcome.version);
    println!("Restart the server after installing plugins.");
    Ok(())
}

fn cmd_uninstall(config: &Config, plugin_id: &str) -> Result<()> {
    let plugins_dir = plugins_dir(config)?;
    plugin::uninstall(plugins_dir, plugin_id)
        .with_context(|| format!("Failed to uninstall {plugin_id}"))?;

    println!("✔ Removed {plugin_id}");
    Ok(())
}

fn cmd_ls(config: &Config) -> Result<()> {
    let plugins_dir = plugins_dir(config)?;
    let registry = plugin::installed(plugins_dir, config.plugins.static_root.as_deref())
        .context("Failed to scan plugin directory")?;

    if registry.is_empty() {
        println!("No plugins installed in {}", plugins_dir.display());
        return Ok(());
    }

    println!("Installed plugins:");
    for manifest in registry.iter() {
        let version = match manifest.info.version.as_str() {
            "" => "unknown",
            v => v,
        };
        match &manifest.included_in_app_id {
            Some(app) => println!(
                "  {} @ {} ({}, included in {})",
                manifest.id, version, manifest.plugin_type, app
            ),
            None => println!("  {} @ {} ({})", manifest.id, version, manifest.plugin_type),
        }
    }

    Ok(())
}

fn cmd_list_remote(config: &Config) -> Result<()> {
    let manager = PluginManager::from_config(config)?;
    let plugins = manager.remote_plugins().context("Failed to list catalog plugins")?;

    for plugin in plugins {
        let latest = plugin.versions.first().map_or("-", |v| v.version.as_str());
        println!("id: {} version: {}", plugin.id, latest);
    }

    Ok(())
}

fn cmd_list_versions(config: &Config, plugin_id: &str) -> Result<()> {
    let manager = PluginManager::from_config(config)?;
    let plugin = manager.remote_plugin(plugin_id)?;

    for version in &plugin.versions {
        println!("{}", version.version);
    }

    Ok(())
}

fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "dashplug", &mut io::stdout());
}
