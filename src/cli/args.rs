//! CLI argument definitions using clap derive

use crate::config::Config;
use crate::dependency::NetworkMode;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Cartwheel - Carthage dependencies from cache
///
/// Installs a project's Carthage dependencies as xcframeworks, preferring
/// the installed tree, a local archive cache and a package registry over
/// building from source.
#[derive(Parser, Debug)]
#[command(name = "cartwheel")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path (replaces the global config file)
    #[arg(short, long, global = true, env = "CARTWHEEL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip the global config file
    #[arg(long, global = true)]
    pub no_global: bool,

    /// Plain line output even in an interactive terminal
    #[arg(long, global = true)]
    pub plain: bool,

    #[command(flatten)]
    pub project: ProjectArgs,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install all dependencies, from cache where possible
    Bootstrap,

    /// Upload prebuilt xcframeworks to the package registry
    Upload(UploadArgs),

    /// Show configuration
    Config(ConfigArgs),
}

/// Project location and per-run overrides of configuration values
#[derive(Args, Debug, Default, Clone)]
pub struct ProjectArgs {
    /// Project directory (defaults to current directory)
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Path of Cartfile.resolved
    #[arg(long, global = true)]
    pub cartfile_resolved: Option<PathBuf>,

    /// Path of the binary-only dependency manifest
    #[arg(long, global = true)]
    pub binary_manifest: Option<PathBuf>,

    /// Carthage build output directory
    #[arg(long, global = true)]
    pub build_dir: Option<PathBuf>,

    /// Local archive cache directory
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Scratch directory
    #[arg(long, global = true)]
    pub temp_dir: Option<PathBuf>,

    /// Carthage executable
    #[arg(long, global = true)]
    pub carthage_command: Option<String>,

    /// Registry API root, e.g. https://gitlab.example.com/api/v4
    #[arg(long, global = true)]
    pub registry_url: Option<String>,

    /// Registry project id
    #[arg(long, global = true)]
    pub registry_project: Option<String>,

    /// Registry access token
    #[arg(long, global = true, env = "CARTWHEEL_REGISTRY_TOKEN", hide_env_values = true)]
    pub registry_token: Option<String>,

    /// Network mode
    #[arg(long, global = true, value_enum)]
    pub network: Option<NetworkMode>,

    /// Transfer timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

impl ProjectArgs {
    pub fn project_dir(&self) -> PathBuf {
        self.project_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Overwrite configuration values given on the command line
    pub fn apply(&self, config: &mut Config) {
        if let Some(ref path) = self.cartfile_resolved {
            config.paths.cartfile_resolved = path.clone();
        }
        if let Some(ref path) = self.binary_manifest {
            config.paths.binary_manifest = path.clone();
        }
        if let Some(ref path) = self.build_dir {
            config.paths.build_dir = path.clone();
        }
        if let Some(ref path) = self.cache_dir {
            config.paths.cache_dir = path.clone();
        }
        if let Some(ref path) = self.temp_dir {
            config.paths.temp_dir = path.clone();
        }
        if let Some(ref command) = self.carthage_command {
            config.build.carthage_command = command.clone();
        }
        if let Some(ref url) = self.registry_url {
            config.registry.api_url = Some(url.clone());
        }
        if let Some(ref project) = self.registry_project {
            config.registry.project_id = Some(project.clone());
        }
        if let Some(ref token) = self.registry_token {
            config.registry.token = Some(token.clone());
        }
        if let Some(mode) = self.network {
            config.network.mode = mode;
        }
        if let Some(timeout) = self.timeout {
            config.network.timeout_secs = timeout;
        }
    }
}

/// Arguments for the upload command
#[derive(Parser, Debug)]
pub struct UploadArgs {
    /// xcframework directories to upload (not zip archives)
    #[arg(required = true)]
    pub bundles: Vec<PathBuf>,

    /// Version to publish under (default: CFBundleShortVersionString)
    #[arg(long)]
    pub bundle_version: Option<String>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show effective configuration
    Show,

    /// Show configuration file paths
    Path,
}
