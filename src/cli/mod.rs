//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod build;
mod decompose;
mod deploy;
mod info;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::config::{merge_cli_overrides, CliOverrides};
use crate::project::Project;

pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;

/// Packsmith - build multi-version resource packs from one shared asset tree
#[derive(Parser)]
#[command(name = "packsmith")]
#[command(about = "Packsmith - build multi-version resource packs from one shared asset tree")]
#[command(version)]
pub struct Cli {
    /// Path to packsmith.toml (default: search upwards from the current directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build and package one profile, or all of them
    Build {
        /// Profile id or "all"
        #[arg(default_value = "all")]
        profile: String,
    },

    /// Watch sources and rebuild affected profiles on change
    Watch {
        /// Profile id or "all"
        #[arg(default_value = "all")]
        profile: String,

        /// Do not deploy after rebuilding
        #[arg(long)]
        no_deploy: bool,

        /// Debounce window in milliseconds
        #[arg(long, value_name = "MS")]
        debounce: Option<u64>,
    },

    /// Copy built artifacts to their deploy targets
    Deploy {
        /// Profile id or "all"
        #[arg(default_value = "all")]
        profile: String,
    },

    /// List configured profiles
    List,

    /// Show build and deploy state per profile
    Status,

    /// Slice a grid atlas back into per-texture images
    Decompose {
        /// Atlas image (e.g. terrain.png)
        atlas: PathBuf,

        /// Coordinate map (default: built-in table chosen by file name)
        #[arg(long)]
        map: Option<PathBuf>,

        /// Output directory (default: next to the atlas, named after it)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Only report the detected grid
        #[arg(long)]
        detect_only: bool,

        /// Overwrite existing images
        #[arg(long)]
        force: bool,
    },
}

/// Initialise the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `-v` selects debug output.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "packsmith=debug" } else { "packsmith=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}

/// Load the project, reporting failures to stderr.
pub(crate) fn load_project(config: Option<&Path>, overrides: &CliOverrides) -> Option<Project> {
    match Project::load(config) {
        Ok(mut project) => {
            merge_cli_overrides(project.config_mut(), overrides);
            Some(project)
        }
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            None
        }
    }
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Build { profile } => build::run_build(config, &profile),
        Commands::Watch { profile, no_deploy, debounce } => {
            build::run_watch(config, &profile, no_deploy, debounce)
        }
        Commands::Deploy { profile } => deploy::run_deploy(config, &profile),
        Commands::List => info::run_list(config),
        Commands::Status => info::run_status(config),
        Commands::Decompose { atlas, map, out, detect_only, force } => {
            decompose::run_decompose(&atlas, map.as_deref(), out.as_deref(), detect_only, force)
        }
    }
}
