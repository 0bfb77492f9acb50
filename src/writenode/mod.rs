//! Write nodes: profiles, path computation, path caching and the lifecycle
//! coordinator.
//!
//! Paths are computed by [`PathComputer`] from a template, the work file,
//! the node's dimensions and its output name. [`WriteNodeHandler`] decides
//! when that happens and keeps each node's cached path stable: a freshly
//! computed path only replaces the cached one if both describe the same
//! output (see [`detect_lock`]).
//!
//! ```no_run
//! use std::rc::Rc;
//! use writenode::config::PipelineConfig;
//! use writenode::host::InMemoryHost;
//! use writenode::writenode::WriteNodeHandler;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = PipelineConfig::load(std::path::Path::new("pipeline.yml"))?;
//! let host = Rc::new(InMemoryHost::new());
//! host.set_script_path(Some("/proj/sh010/work/nuke/sh010_v001.nk"));
//!
//! let handler = WriteNodeHandler::new(host, &config)?;
//! let node = handler.create_new_node("Exr Render")?;
//! println!("{}", handler.compute_render_path(node)?);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod compute;
pub mod configuration;
pub mod handler;
pub mod lock;
pub mod preview;
pub mod profile;
pub mod warning;

pub use cache::{PathCache, ResolutionMode};
pub use compute::{Clock, FixedClock, PathComputer, SystemClock};
pub use configuration::Configuration;
pub use handler::WriteNodeHandler;
pub use lock::{LockReason, PathState, detect_lock};
pub use preview::PathPreview;
pub use profile::{Profile, ProfileTable};
