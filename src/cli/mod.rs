//! Command-line interface for writenode.
//!
//! The binary is a thin front end over the library: it loads a pipeline
//! configuration, builds an in-memory host with a single write node and asks
//! the [`WriteNodeHandler`](crate::writenode::WriteNodeHandler) for paths.
//!
//! # Commands
//!
//! - `profiles` - List write-node profiles and their templates
//! - `resolve` - Print the render (or proxy) path a node would use
//! - `files` - List rendered files matching that path
//! - `validate` - Check that every template a profile names exists
//!
//! # Examples
//!
//! ```bash
//! writenode --config pipeline.yml profiles
//! writenode --config pipeline.yml resolve \
//!     --script /proj/sh010/work/nuke/sh010_v003.nk --profile "Exr Render" --output beauty
//! writenode --config pipeline.yml files \
//!     --script /proj/sh010/work/nuke/sh010_v003.nk --profile "Exr Render" --output beauty
//! WRITENODE_CONFIG=pipeline.yml writenode validate
//! ```
//!
//! # Global options
//!
//! - `--config` - Pipeline configuration (TOML or YAML), also read from
//!   `WRITENODE_CONFIG`
//! - `--verbose` - Debug logging
//! - `--quiet` - Errors only

mod common;
mod files;
mod profiles;
mod resolve;
mod validate;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::PipelineConfig;

/// Runtime settings derived from the global flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Log filter directive; `None` keeps `RUST_LOG` or the default
    pub log_level: Option<String>,
    /// Pipeline configuration file
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    /// Creates settings with no overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the global tracing subscriber.
    ///
    /// An explicit level wins over `RUST_LOG`; without either only warnings
    /// are shown. Calling this twice is harmless.
    pub fn init_logging(&self) {
        let filter = match &self.log_level {
            Some(level) => EnvFilter::new(level),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        };
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

    /// Loads the pipeline configuration.
    ///
    /// # Errors
    ///
    /// Fails if no configuration was given or it cannot be read.
    pub fn load_pipeline(&self) -> Result<PipelineConfig> {
        let Some(path) = &self.config_path else {
            bail!("No pipeline configuration given; pass --config or set WRITENODE_CONFIG");
        };
        PipelineConfig::load(path)
    }
}

/// Render-path resolution for compositing write nodes.
#[derive(Parser)]
#[command(
    name = "writenode",
    about = "Resolve write-node render paths from pipeline templates",
    version,
    long_about = "writenode computes the render paths compositing write nodes would use, \
                  from a pipeline configuration of templates, profiles and context."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only report errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Pipeline configuration file (TOML or YAML)
    #[arg(short, long, global = true, env = "WRITENODE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List write-node profiles
    Profiles(profiles::ProfilesCommand),

    /// Print the path a write node would render to
    Resolve(resolve::ResolveCommand),

    /// List rendered files for a write node
    Files(files::FilesCommand),

    /// Check the configuration
    Validate(validate::ValidateCommand),
}

impl Cli {
    /// Runs the selected command.
    ///
    /// # Errors
    ///
    /// Returns the command's failure.
    pub fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config)
    }

    /// Settings derived from the global flags.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            Some("error".to_string())
        } else {
            None
        };

        CliConfig {
            log_level,
            config_path: self.config.clone(),
        }
    }

    /// Runs the selected command with explicit settings.
    ///
    /// # Errors
    ///
    /// Returns the command's failure.
    pub fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();

        match self.command {
            Commands::Profiles(cmd) => cmd.execute(&config),
            Commands::Resolve(cmd) => cmd.execute(&config),
            Commands::Files(cmd) => cmd.execute(&config),
            Commands::Validate(cmd) => cmd.execute(&config),
        }
    }
}
