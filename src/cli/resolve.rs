//! Print the path a write node would render to.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tracing::debug;

use super::CliConfig;
use super::common::{NodeArgs, NodeSession};
use crate::host::{Host, Knob};
use crate::writenode::ResolutionMode;

/// Resolve a render path.
#[derive(Args)]
pub struct ResolveCommand {
    #[command(flatten)]
    node: NodeArgs,

    /// Also print the path preview and any warning
    #[arg(long)]
    details: bool,
}

impl ResolveCommand {
    /// Runs the command.
    ///
    /// # Errors
    ///
    /// Fails when the node cannot be created or its path cannot be computed.
    pub fn execute(self, config: &CliConfig) -> Result<()> {
        let session = NodeSession::open(config, &self.node)?;
        let path = match self.node.mode() {
            ResolutionMode::Full => session.handler.compute_render_path(session.node)?,
            ResolutionMode::Proxy => session.handler.compute_proxy_path(session.node)?,
        };
        debug!("Resolved {} path: {}", self.node.mode(), path);
        println!("{path}");

        if self.details {
            let knob = |k| session.host.knob_str(session.node, k);
            println!("{} {}", "context:".bright_black(), knob(Knob::PathContext));
            println!("{} {}", "local:".bright_black(), knob(Knob::PathLocal));
            println!("{} {}", "file:".bright_black(), knob(Knob::PathFilename));
            let warning = knob(Knob::RenderWarning);
            if !warning.is_empty() {
                println!("{}\n{}", "Warning".yellow().bold(), warning);
            }
        }
        Ok(())
    }
}
