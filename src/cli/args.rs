//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// kitprep - Kit application dependency cache manager
///
/// Resolves per-application dependency declarations, reports whether the
/// extension cache is ready, and prefetches it before first launch.
#[derive(Parser, Debug)]
#[command(name = "kitprep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug); also passed to the fetch
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Settings file path
    #[arg(long, global = true, env = "KITPREP_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Skip local .kitprep.toml discovery
    #[arg(long, global = true)]
    pub no_local: bool,

    /// Application id; resolves <apps.root>/<id>/dependencies.toml
    #[arg(short, long, global = true)]
    pub app: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Estimate first-run download time
    Estimate(EstimateArgs),

    /// Validate an application's dependency declaration
    Validate(ValidateArgs),

    /// Populate the extension cache
    Prefetch(PrefetchArgs),

    /// Show resolved scope and cache readiness
    Status(StatusArgs),

    /// Show or edit settings
    Config(ConfigArgs),
}

#[derive(Parser, Debug)]
pub struct EstimateArgs {
    /// Link bandwidth in megabits per second (default: estimate.bandwidth_mbps)
    #[arg(short, long)]
    pub bandwidth: Option<f64>,

    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Also confirm every identifier exists in the remote registry
    #[arg(long)]
    pub check_registry: bool,

    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct PrefetchArgs {
    /// Build profile passed to the fetch command (default: prefetch.default_profile)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Fetch even if the cache is already ready
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show effective settings
    Show,

    /// Show settings file path
    Path,

    /// Write default settings
    Init {
        /// Overwrite existing settings
        #[arg(short, long)]
        force: bool,
    },

    /// Set a settings value
    Set {
        /// Dotted key (e.g., cache.ready_threshold)
        key: String,
        /// Value to set
        value: String,
        /// Write to project-local .kitprep.toml instead of global settings
        #[arg(long)]
        local: bool,
    },
}
