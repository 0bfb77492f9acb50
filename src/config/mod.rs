//! Pipeline configuration.
//!
//! One file (TOML or YAML) describes the storage roots, template keys and
//! path templates, the write-node profiles, and the active context:
//!
//! ```yaml
//! roots:
//!   primary: /mnt/projects/demo
//! keys:
//!   Shot: { type: str }
//!   version: { type: int, format_spec: "03" }
//!   SEQ: { type: sequence, format_spec: "04" }
//!   output: { type: str, filter_by: alphanumeric }
//!   width: { type: int }
//!   height: { type: int }
//! paths:
//!   nuke_shot_work: "{Shot}/work/nuke/{Shot}_v{version}.nk"
//!   nuke_shot_render: "{Shot}/renders/v{version}/{width}x{height}/{Shot}[_{output}].{SEQ}.exr"
//! settings:
//!   template_script_work: nuke_shot_work
//!   write_nodes:
//!     - name: Exr Render
//!       render_template: nuke_shot_render
//!       publish_template: nuke_shot_render
//!       file_type: exr
//!       settings: { datatype: 16 bit half }
//!       tile_color: [0, 128, 255]
//!       promote_write_knobs: [compression]
//! context:
//!   name: Shot sh010
//!   fields: { Shot: sh010 }
//!   entity_locations: [/mnt/projects/demo/sh010]
//! ```
//!
//! Everything is parsed into immutable values. A context switch loads a new
//! [`PipelineConfig`] and hands it over wholesale.

pub mod parser;

pub use parser::{ConfigFormat, parse_config, parse_config_str};

use anyhow::Result;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::context::Context;
use crate::templating::TemplateConfig;

/// One entry of `settings.write_nodes`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProfileDefinition {
    /// Unique profile name shown to the artist
    pub name: String,
    /// Template for full-resolution renders
    pub render_template: String,
    /// Template for full-resolution publishes
    pub publish_template: String,
    /// Template for proxy renders; falls back to `render_template`
    pub proxy_render_template: String,
    /// Template for proxy publishes; falls back to `publish_template`
    pub proxy_publish_template: String,
    /// Encoder file type (`exr`, `dpx`, ...)
    pub file_type: String,
    /// Encoder settings applied with the profile
    pub settings: BTreeMap<String, serde_json::Value>,
    /// RGB node colour; anything but three components restores the default
    pub tile_color: Option<Vec<i64>>,
    /// Encoder knobs exposed on the write node
    pub promote_write_knobs: Vec<String>,
    /// Published file type recorded by publish workflows
    #[serde(alias = "tank_type")]
    pub published_file_type: Option<String>,
}

/// The `settings` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Name of the work-file template
    pub template_script_work: Option<String>,
    /// Write-node profiles, in display order
    pub write_nodes: Vec<ProfileDefinition>,
}

/// A complete pipeline configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Roots, keys and path templates
    #[serde(flatten)]
    pub templates: TemplateConfig,
    /// Application settings
    pub settings: AppSettings,
    /// The active context
    pub context: Context,
}

impl PipelineConfig {
    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing or malformed.
    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = parse_config(path)?;
        debug!(
            "Loaded configuration from {}: {} templates, {} write node profiles",
            path.display(),
            config.templates.paths.len(),
            config.settings.write_nodes.len()
        );
        Ok(config)
    }

    /// Parses configuration text.
    ///
    /// # Errors
    ///
    /// Fails if the text is malformed.
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        parse_config_str(content, format)
    }
}
