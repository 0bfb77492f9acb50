//! Test fixtures for pipeline configurations and write-node handlers
//!
//! [`PipelineFixture`] holds configuration text rooted at a placeholder that
//! tests replace with a real directory when files on disk matter.
//! [`HandlerFixture`] wires an [`InMemoryHost`] to a [`WriteNodeHandler`]
//! reading dates from a [`FixedClock`].

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::config::{ConfigFormat, PipelineConfig};
use crate::host::{Host, InMemoryHost, Knob, NodeId};
use crate::writenode::{FixedClock, WriteNodeHandler};

/// Root the fixture templates live under unless moved with
/// [`PipelineFixture::at_root`].
pub const FIXTURE_ROOT: &str = "/proj";

/// Shot of the fixture context.
pub const FIXTURE_SHOT: &str = "sh010";

const ROOT_TOKEN: &str = "@ROOT@";

const TEMPLATES: &str = r#"
roots:
  primary: "@ROOT@"
keys:
  Shot: { type: str }
  Step: { type: str }
  version: { type: int, format_spec: "03" }
  SEQ: { type: sequence, format_spec: "04" }
  eye: { type: str }
  output: { type: str, filter_by: alphanumeric }
  width: { type: int }
  height: { type: int }
  YYYY: { type: int }
  MM: { type: int, format_spec: "02" }
  DD: { type: int, format_spec: "02" }
paths:
  nuke_shot_work: "{Shot}/work/nuke/{Shot}_v{version}.nk"
  nuke_shot_render: "{Shot}/renders/v{version}/{Shot}_{output}.{SEQ}.exr"
  nuke_shot_publish: "{Shot}/publish/v{version}/{Shot}_{output}.{SEQ}.exr"
  nuke_shot_render_proxy: "{Shot}/renders/v{version}/{width}x{height}/{Shot}_{output}.{SEQ}.exr"
  nuke_shot_render_optional: "{Shot}/renders/v{version}/{Shot}[_{output}].{SEQ}.dpx"
  nuke_shot_render_dated: "{Shot}/renders/{YYYY}_{MM}_{DD}/v{version}/{width}x{height}/{Shot}.{SEQ}.exr"
context:
  name: Shot sh010, Comp
  fields: { Shot: sh010, Step: comp }
  entity_locations: ["@ROOT@/sh010"]
"#;

const EXR_PROFILE: &str = r#"
    - name: Exr Render
      render_template: nuke_shot_render
      publish_template: nuke_shot_publish
      proxy_render_template: nuke_shot_render_proxy
      file_type: exr
      settings: { datatype: "16 bit half", compression: "Zip (1 scanline)" }
      tile_color: [0, 128, 255]
      promote_write_knobs: [compression, gamma]
      published_file_type: Rendered Image
"#;

const DPX_PROFILE: &str = r#"
    - name: Dpx Render
      render_template: nuke_shot_render_optional
      publish_template: nuke_shot_render_optional
      file_type: dpx
"#;

const DATED_PROFILE: &str = r#"
    - name: Dated Render
      render_template: nuke_shot_render_dated
      publish_template: nuke_shot_render_dated
      file_type: exr
"#;

const BROKEN_PROFILE: &str = r#"
    - name: Broken Render
      render_template: nuke_shot_rendr
      publish_template: nuke_shot_publish
      file_type: exr
"#;

/// Pipeline configuration text used by tests.
#[derive(Clone, Debug)]
pub struct PipelineFixture {
    pub content: String,
    pub name: String,
}

impl PipelineFixture {
    fn from_profiles(name: &str, profiles: &[&str]) -> Self {
        let mut content = TEMPLATES.trim_start().to_string();
        content.push_str("settings:\n  template_script_work: nuke_shot_work\n  write_nodes:");
        if profiles.is_empty() {
            content.push_str(" []\n");
        }
        for profile in profiles {
            content.push_str(profile);
        }
        Self {
            name: name.to_string(),
            content: content.replace(ROOT_TOKEN, FIXTURE_ROOT),
        }
    }

    /// Exr (required output, proxy template), Dpx (optional output) and
    /// Dated (resolution and date in the path) profiles.
    pub fn standard() -> Self {
        Self::from_profiles("standard", &[EXR_PROFILE, DPX_PROFILE, DATED_PROFILE])
    }

    /// The standard configuration after the Exr profile was removed.
    pub fn without_exr() -> Self {
        Self::from_profiles("without_exr", &[DPX_PROFILE, DATED_PROFILE])
    }

    /// A configuration with a profile naming a template that does not exist.
    pub fn broken_profile() -> Self {
        Self::from_profiles("broken_profile", &[EXR_PROFILE, BROKEN_PROFILE])
    }

    /// A configuration that is not valid YAML.
    pub fn invalid_syntax() -> Self {
        Self {
            name: "invalid_syntax".to_string(),
            content: "roots: [unclosed\nkeys: {".to_string(),
        }
    }

    /// Moves every template under `root`.
    #[must_use]
    pub fn at_root(mut self, root: &Path) -> Self {
        let root = root.to_string_lossy().replace('\\', "/");
        self.content = self.content.replace(&format!("\"{FIXTURE_ROOT}"), &format!("\"{root}"));
        self
    }

    /// Parses the configuration.
    pub fn parse(&self) -> Result<PipelineConfig> {
        PipelineConfig::parse(&self.content, ConfigFormat::Yaml)
            .with_context(|| format!("Failed to parse pipeline fixture '{}'", self.name))
    }

    /// Writes the configuration as `pipeline.yml` into `dir`.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join("pipeline.yml");
        fs::write(&path, &self.content)
            .with_context(|| format!("Failed to write pipeline fixture to {}", path.display()))?;
        Ok(path)
    }
}

/// The date the fixture clock starts on.
pub fn fixture_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap_or_default()
}

/// Path of version `version` of the fixture shot's work file below `root`.
pub fn work_file_at(root: &str, version: u32) -> String {
    format!("{root}/{FIXTURE_SHOT}/work/nuke/{FIXTURE_SHOT}_v{version:03}.nk")
}

/// Path of version `version` of the fixture shot's work file.
pub fn work_file(version: u32) -> String {
    work_file_at(FIXTURE_ROOT, version)
}

/// A handler over an in-memory host with a settable clock.
pub struct HandlerFixture {
    pub host: Rc<InMemoryHost>,
    pub handler: Rc<WriteNodeHandler<InMemoryHost>>,
    pub clock: Rc<FixedClock>,
}

impl HandlerFixture {
    /// A handler for the standard configuration with an unsaved script.
    pub fn new() -> Result<Self> {
        Self::with_pipeline(&PipelineFixture::standard())
    }

    /// A handler for `fixture` with an unsaved script.
    pub fn with_pipeline(fixture: &PipelineFixture) -> Result<Self> {
        let config = fixture.parse()?;
        let host = Rc::new(InMemoryHost::new());
        let clock = Rc::new(FixedClock::new(fixture_date()));
        let handler = WriteNodeHandler::with_clock(Rc::clone(&host), &config, clock.clone())?;
        Ok(Self {
            host,
            handler: Rc::new(handler),
            clock,
        })
    }

    /// A handler for the standard configuration with the script saved as
    /// `version`.
    pub fn saved(version: u32) -> Result<Self> {
        let fixture = Self::new()?;
        fixture.save_as(version);
        Ok(fixture)
    }

    /// Points the host at version `version` of the work file without
    /// notifying the handler.
    pub fn save_as(&self, version: u32) {
        self.host.set_script_path(Some(&work_file(version)));
    }

    /// Saves as `version` and notifies the handler.
    pub fn save_and_notify(&self, version: u32) {
        self.save_as(version);
        self.handler.on_script_save(&work_file(version));
    }

    /// Creates a node with `profile` and, when given, sets its output name.
    pub fn create_node(&self, profile: &str, output: Option<&str>) -> Result<NodeId> {
        let node = self.handler.create_new_node(profile)?;
        if let Some(output) = output {
            self.set_output(node, output);
        }
        Ok(node)
    }

    /// Edits the output knob the way an artist would.
    pub fn set_output(&self, node: NodeId, output: &str) {
        self.host.set_knob(node, Knob::OutputName, output.into());
        self.handler.on_knob_changed(node, Knob::OutputName);
    }

    /// The node's cached full-resolution path.
    pub fn cached_path(&self, node: NodeId) -> String {
        self.host.knob_str(node, Knob::CachedPath)
    }

    /// The node's cached proxy path.
    pub fn cached_proxy_path(&self, node: NodeId) -> String {
        self.host.knob_str(node, Knob::CachedProxyPath)
    }

    /// The warning shown on the node.
    pub fn path_warning(&self, node: NodeId) -> String {
        self.host.knob_str(node, Knob::PathWarning)
    }
}

/// The path the standard configuration produces for the Exr profile.
pub fn exr_render_path(version: u32, output: &str) -> String {
    format!(
        "{FIXTURE_ROOT}/{FIXTURE_SHOT}/renders/v{version:03}/{FIXTURE_SHOT}_{output}.%04d.exr"
    )
}
