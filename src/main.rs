//! slotcache - Build artifact cache controller
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use slotcache::cli::commands::{self, JobContext};
use slotcache::cli::{Cli, Commands};
use slotcache::config::ConfigManager;
use slotcache::error::{SlotCacheError, SlotCacheResult};
use slotcache::platform::detect_os;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> SlotCacheResult<()> {
    let cli = Cli::parse();

    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };

    let project_dir = match cli.project.clone() {
        Some(p) => p.canonicalize().unwrap_or(p),
        None => std::env::current_dir()
            .map_err(|e| SlotCacheError::io("getting current directory", e))?,
    };

    // Find local config unless --no-local is set
    let local_config_path = if cli.no_local {
        None
    } else {
        ConfigManager::find_local_config(&project_dir)
    };

    let config = config_manager
        .load_merged(local_config_path.as_deref())
        .await?;

    init_logging(cli.verbose, &config.general.log_format);
    if let Some(ref path) = local_config_path {
        debug!("Found local config: {}", path.display());
    }

    let os = detect_os(cli.os.as_deref(), config.general.os.as_deref())?;
    let ctx = JobContext {
        config,
        os,
        project_dir,
    };

    match cli.command {
        Commands::Key(args) => commands::key(args, &ctx).await,
        Commands::Restore(args) => commands::restore(args, &ctx).await,
        Commands::Save(args) => commands::save(args, &ctx).await,
        Commands::List(args) => commands::list(args, &ctx).await,
        Commands::Gc(args) => commands::gc(args, &ctx).await,
        Commands::Config(args) => commands::config(args, &config_manager, &ctx).await,
    }
}

/// Initialize logging: 0 = warn, 1 = info, 2+ = debug
fn init_logging(verbose: u8, log_format: &str) {
    let filter = match verbose {
        0 => EnvFilter::new("slotcache=warn"),
        1 => EnvFilter::new("slotcache=info"),
        _ => EnvFilter::new("slotcache=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
