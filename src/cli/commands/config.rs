//! Config command - show configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager, LOCAL_CONFIG_FILE};
use crate::error::CartwheelResult;
use std::path::Path;

/// Execute the config command
pub async fn execute(
    args: ConfigArgs,
    config: &Config,
    manager: &ConfigManager,
    project_dir: &Path,
) -> CartwheelResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => show_paths(manager, project_dir),
    }
    Ok(())
}

fn show_config(config: &Config) -> CartwheelResult<()> {
    println!("{}", toml::to_string_pretty(&config.redacted())?);
    Ok(())
}

fn show_paths(manager: &ConfigManager, project_dir: &Path) {
    match manager.path() {
        Some(path) => println!("global: {}", path.display()),
        None => println!("global: (disabled)"),
    }
    match ConfigManager::find_local_config(project_dir) {
        Some(path) => println!("local:  {}", path.display()),
        None => println!("local:  {} (not found)", project_dir.join(LOCAL_CONFIG_FILE).display()),
    }
}
