//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// slotcache - Content-keyed build artifact cache for CI jobs
///
/// Derives cache keys from lockfiles and configuration files, restores
/// matching artifacts at job start and saves them at job end.
#[derive(Parser, Debug)]
#[command(name = "slotcache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "SLOTCACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip local .slotcache.toml discovery
    #[arg(long, global = true)]
    pub no_local: bool,

    /// OS identifier used as the key prefix (default: detected)
    #[arg(long, global = true, env = "SLOTCACHE_OS")]
    pub os: Option<String>,

    /// Project directory key inputs are relative to (defaults to current directory)
    #[arg(short, long, global = true)]
    pub project: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the cache key for each slot
    Key(KeyArgs),

    /// Restore cached artifacts before the job runs
    Restore(RestoreArgs),

    /// Save artifacts for slots that missed after the job ran
    Save(SaveArgs),

    /// List stored cache entries
    List(ListArgs),

    /// Remove entries that have not been used recently
    Gc(GcArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Arguments for the key command
#[derive(Parser, Debug)]
pub struct KeyArgs {
    /// Only these slots (repeatable, defaults to all)
    #[arg(short, long)]
    pub slot: Vec<String>,
}

/// Arguments for the restore command
#[derive(Parser, Debug)]
pub struct RestoreArgs {
    /// Only these slots (repeatable, defaults to all)
    #[arg(short, long)]
    pub slot: Vec<String>,

    /// Run state file to record results in (default: from config)
    #[arg(long)]
    pub state_file: Option<PathBuf>,
}

/// Arguments for the save command
#[derive(Parser, Debug)]
pub struct SaveArgs {
    /// Run state file written by restore (default: from config)
    #[arg(long)]
    pub state_file: Option<PathBuf>,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the gc command
#[derive(Parser, Debug)]
pub struct GcArgs {
    /// Remove entries idle for more than N days (default: from config)
    #[arg(long)]
    pub days: Option<u32>,

    /// Dry run - show what would be removed
    #[arg(long)]
    pub dry_run: bool,
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
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for list command
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}
