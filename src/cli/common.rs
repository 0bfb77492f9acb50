//! Shared arguments and setup for commands that work on one write node.

use anyhow::{Context, Result};
use clap::Args;
use std::rc::Rc;

use super::CliConfig;
use crate::host::{Host, InMemoryHost, Knob, NodeId};
use crate::writenode::{ResolutionMode, WriteNodeHandler};

/// Describes the write node to resolve.
#[derive(Args, Debug, Clone)]
pub struct NodeArgs {
    /// Path of the saved script (work file)
    #[arg(short, long)]
    pub script: String,

    /// Write-node profile name
    #[arg(short, long)]
    pub profile: String,

    /// Output name
    #[arg(short, long)]
    pub output: Option<String>,

    /// Image width
    #[arg(long, default_value_t = 1920)]
    pub width: i64,

    /// Image height
    #[arg(long, default_value_t = 1080)]
    pub height: i64,

    /// Resolve the proxy path
    #[arg(long)]
    pub proxy: bool,
}

impl NodeArgs {
    /// The resolution mode asked for.
    #[must_use]
    pub const fn mode(&self) -> ResolutionMode {
        ResolutionMode::from_proxy(self.proxy)
    }
}

/// An in-memory script holding one configured write node.
pub struct NodeSession {
    pub host: Rc<InMemoryHost>,
    pub handler: WriteNodeHandler<InMemoryHost>,
    pub node: NodeId,
}

impl NodeSession {
    /// Loads the configuration, opens `args.script` and creates the node.
    pub fn open(config: &CliConfig, args: &NodeArgs) -> Result<Self> {
        let pipeline = config.load_pipeline()?;

        let host = Rc::new(InMemoryHost::new());
        host.set_script_path(Some(&args.script));
        host.set_default_dimensions(args.width, args.height);
        host.set_proxy(args.proxy);

        let handler = WriteNodeHandler::new(host.clone(), &pipeline)?;
        let node = handler
            .create_new_node(&args.profile)
            .with_context(|| format!("Failed to create a '{}' write node", args.profile))?;

        if let Some(output) = &args.output {
            host.set_knob(node, Knob::OutputName, output.as_str().into());
            handler.on_knob_changed(node, Knob::OutputName);
        }

        Ok(Self {
            host,
            handler,
            node,
        })
    }
}
