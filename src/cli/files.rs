//! List rendered files for a write node.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::CliConfig;
use super::common::{NodeArgs, NodeSession};
use crate::writenode::ResolutionMode;

/// List files on disk.
#[derive(Args)]
pub struct FilesCommand {
    #[command(flatten)]
    node: NodeArgs,
}

impl FilesCommand {
    /// Runs the command.
    ///
    /// # Errors
    ///
    /// Fails when the node cannot be created or its path no longer matches
    /// its template.
    pub fn execute(self, config: &CliConfig) -> Result<()> {
        let session = NodeSession::open(config, &self.node)?;
        let files = match self.node.mode() {
            ResolutionMode::Full => session.handler.get_files_on_disk(session.node)?,
            ResolutionMode::Proxy => session.handler.get_proxy_files_on_disk(session.node)?,
        };

        if files.is_empty() {
            eprintln!("{}", "No rendered files found".yellow());
        }
        for file in files {
            println!("{file}");
        }
        Ok(())
    }
}
