//! kitprep - Kit application dependency cache manager
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use kitprep::cli::{commands, Cli, Commands};
use kitprep::config::{Config, ConfigManager};
use kitprep::error::{KitprepError, KitprepResult};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(source) = std::error::Error::source(&e) {
                eprintln!("  {} {}", style("caused by:").dim(), source);
            }
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> KitprepResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.settings {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    let local_config_path = if cli.no_local {
        None
    } else {
        let cwd =
            std::env::current_dir().map_err(|e| KitprepError::io("getting current directory", e))?;
        ConfigManager::find_local_config(&cwd)
    };

    let config = config_manager
        .load_merged(local_config_path.as_deref())
        .await?;

    init_logging(cli.verbose, &config);
    kitprep::ui::init_theme();

    match local_config_path {
        Some(ref path) => debug!("Merged local config: {}", path.display()),
        None if cli.no_local => debug!("Local config discovery disabled (--no-local)"),
        None => {}
    }

    let app = cli.app.as_deref();
    match cli.command {
        Commands::Estimate(args) => commands::estimate(args, &config).await,
        Commands::Validate(args) => commands::validate(args, app, &config).await,
        Commands::Prefetch(args) => {
            commands::prefetch(args, app, cli.verbose > 0, &config).await
        }
        Commands::Status(args) => commands::status(args, app, &config).await,
        Commands::Config(args) => commands::config(args, &config_manager, &config).await,
    }
}

/// 0 = warn, 1 = info, 2+ = debug; logs go to stderr so `--json` output stays parseable
fn init_logging(verbose: u8, config: &Config) {
    let filter = match verbose {
        0 => EnvFilter::new("kitprep=warn"),
        1 => EnvFilter::new("kitprep=info"),
        _ => EnvFilter::new("kitprep=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
