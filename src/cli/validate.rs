//! Check a pipeline configuration.
//!
//! Loads the file, builds every template, and resolves every template each
//! profile names. Problems are listed per profile; any problem makes the
//! command fail.

use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;
use std::rc::Rc;

use super::CliConfig;
use crate::writenode::{Configuration, SystemClock};

/// Validate the configuration.
#[derive(Args)]
pub struct ValidateCommand {
    /// Exit successfully even when problems are found
    #[arg(long)]
    no_fail: bool,
}

impl ValidateCommand {
    /// Runs the command.
    ///
    /// # Errors
    ///
    /// Fails if the configuration cannot be loaded or, unless `--no-fail`,
    /// if any profile names a missing template.
    pub fn execute(self, config: &CliConfig) -> Result<()> {
        let pipeline = config.load_pipeline()?;
        let configuration = Configuration::from_pipeline(&pipeline, Rc::new(SystemClock))?;
        let problems = configuration.validate();

        if problems.is_empty() {
            println!(
                "{} {} profiles, all templates resolve",
                "✓".green(),
                configuration.profiles().len()
            );
            return Ok(());
        }

        for (profile, error) in &problems {
            println!("{} {}: {}", "✗".red(), profile.bold(), error);
        }
        if self.no_fail {
            return Ok(());
        }
        bail!("{} problem(s) found in the configuration", problems.len());
    }
}
