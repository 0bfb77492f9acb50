//! writenode - render-path resolution for compositing write nodes
//!
//! A write node renders images to a path built from a pipeline template. The
//! path depends on the script the artist is working in, the node's profile,
//! its output name, the image size and the active context. This crate
//! computes those paths, caches them on the node and keeps them stable: once
//! a path has been accepted it is only replaced when the change is expected
//! (a new script version, a new output name, an explicit reset). Anything
//! else locks the path and tells the artist why.
//!
//! # Architecture Overview
//!
//! - A **template** turns fields into a path and a path back into fields
//! - The **context field provider** reads fields from the work file and the
//!   active context
//! - The **path computer** assembles fields and applies the render template
//! - The **path cache & lock detector** memoizes computations per node and
//!   decides whether a new path may replace the cached one
//! - The **lifecycle coordinator** reacts to host events and decides when
//!   paths are recomputed
//!
//! The host application (the node graph) is abstracted behind the
//! [`host::Host`] trait. [`host::InMemoryHost`] implements it for the
//! command line and for tests.
//!
//! # Core Modules
//!
//! - [`core`] - Error types and user-facing error formatting
//! - [`constants`] - Field names, placeholder tokens and defaults
//! - [`templating`] - Path templates, keys, fields and template lookup
//! - [`context`] - The active context and the fields it provides
//! - [`config`] - Pipeline configuration (TOML or YAML)
//! - [`host`] - The host node-graph interface and an in-memory host
//! - [`writenode`] - Profiles, path computation, caching, locking and the
//!   lifecycle coordinator
//! - [`cli`] - The `writenode` command line
//!
//! # Configuration Format
//!
//! ```yaml
//! roots:
//!   primary: /mnt/projects/demo
//! keys:
//!   Shot: { type: str }
//!   version: { type: int, format_spec: "03" }
//!   SEQ: { type: sequence, format_spec: "04" }
//!   output: { type: str, filter_by: alphanumeric }
//! paths:
//!   nuke_shot_work: "{Shot}/work/nuke/{Shot}_v{version}.nk"
//!   nuke_shot_render: "{Shot}/renders/v{version}/{Shot}_{output}.{SEQ}.exr"
//! settings:
//!   template_script_work: nuke_shot_work
//!   write_nodes:
//!     - name: Exr Render
//!       render_template: nuke_shot_render
//!       publish_template: nuke_shot_render
//!       file_type: exr
//! context:
//!   fields: { Shot: sh010 }
//! ```
//!
//! # Command-Line Usage
//!
//! ```bash
//! writenode --config pipeline.yml profiles
//! writenode --config pipeline.yml resolve --script /mnt/projects/demo/sh010/work/nuke/sh010_v003.nk \
//!     --profile "Exr Render" --output beauty
//! writenode --config pipeline.yml validate
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod context;
pub mod core;
pub mod host;
pub mod templating;
pub mod writenode;

// Test utilities (only compiled for tests or with the test-utils feature)
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
