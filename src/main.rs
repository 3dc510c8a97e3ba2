//! cartwheel - Carthage dependencies from cache
//!
//! CLI entry point that dispatches to subcommands.

use cartwheel::cli::{commands, Cli, Commands};
use cartwheel::config::{ConfigManager, ProjectLayout};
use cartwheel::error::{CartwheelError, CartwheelResult};
use cartwheel::ui::UiContext;
use clap::Parser;
use console::style;
use std::process::ExitCode;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Conventional exit status after SIGINT
const INTERRUPTED_EXIT: u8 = 130;

/// How long cancelled transfers get to remove their files at exit
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

fn main() -> ExitCode {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{} could not start the async runtime: {}", style("Error:").red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async {
        tokio::select! {
            result = run() => result,
            _ = tokio::signal::ctrl_c() => Err(CartwheelError::Interrupted),
        }
    });
    // A transfer stalled on the blocking pool is not waited for
    runtime.shutdown_timeout(SHUTDOWN_GRACE);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(CartwheelError::Interrupted) => {
            eprintln!("{}", style("Interrupted").yellow().bold());
            ExitCode::from(INTERRUPTED_EXIT)
        }
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> CartwheelResult<()> {
    let cli = Cli::parse();

    // Initialize logging: 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("cartwheel=warn"),
        1 => EnvFilter::new("cartwheel=info"),
        _ => EnvFilter::new("cartwheel=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else if cli.no_global {
        debug!("Global config disabled (--no-global)");
        ConfigManager::without_global()
    } else {
        ConfigManager::new()
    };

    let project_dir = cli.project.project_dir();
    let local_config_path = ConfigManager::find_local_config(&project_dir);
    if let Some(ref path) = local_config_path {
        debug!("Found local config: {}", path.display());
    }

    let mut config = config_manager
        .load_merged(local_config_path.as_deref())
        .await?;
    cli.project.apply(&mut config);

    let ctx = if cli.plain {
        UiContext::non_interactive()
    } else {
        UiContext::detect()
    };

    match cli.command {
        Commands::Bootstrap => {
            let layout = ProjectLayout::resolve(&project_dir, &config.paths)?;
            commands::bootstrap(&config, &layout, ctx).await
        }
        Commands::Upload(args) => commands::upload(args, &config, ctx).await,
        Commands::Config(args) => commands::config(args, &config, &config_manager, &project_dir).await,
    }
}
