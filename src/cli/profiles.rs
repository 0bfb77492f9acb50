//! List write-node profiles.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::rc::Rc;

use super::CliConfig;
use crate::writenode::{Configuration, SystemClock};

/// List configured profiles with their templates.
#[derive(Args)]
pub struct ProfilesCommand {
    /// Print names only
    #[arg(long)]
    names_only: bool,
}

impl ProfilesCommand {
    /// Runs the command.
    ///
    /// # Errors
    ///
    /// Fails if the configuration cannot be loaded.
    pub fn execute(self, config: &CliConfig) -> Result<()> {
        let pipeline = config.load_pipeline()?;
        let configuration = Configuration::from_pipeline(&pipeline, Rc::new(SystemClock))?;
        let profiles = configuration.profiles();

        if profiles.is_empty() {
            println!("No write node profiles configured.");
            return Ok(());
        }

        if self.names_only {
            for name in profiles.names() {
                println!("{name}");
            }
            return Ok(());
        }

        for name in profiles.names() {
            let Some(profile) = profiles.get(name) else {
                continue;
            };
            println!("{}", profile.name.cyan().bold());
            println!("  render:  {}", profile.render_template);
            println!("  publish: {}", profile.publish_template);
            if !profile.proxy_render_template.is_empty() {
                println!("  proxy render:  {}", profile.proxy_render_template);
            }
            if !profile.proxy_publish_template.is_empty() {
                println!("  proxy publish: {}", profile.proxy_publish_template);
            }
            if !profile.file_type.is_empty() {
                println!("  file type: {}", profile.file_type);
            }
        }
        println!();
        println!("{}: {} profiles", "Total".green().bold(), profiles.len());
        Ok(())
    }
}
