//! The host node-graph collaborator.
//!
//! Write nodes live inside a compositing application. Everything the
//! write-node layer needs from it goes through the [`Host`] trait: node
//! identity and naming, image dimensions, typed knob storage, the current
//! script path and the node's internal encoder.
//!
//! Knobs are addressed by the closed [`Knob`] enum rather than by string, so
//! the set of values a write node persists is fixed at compile time.
//!
//! The host calls back into the write-node layer synchronously on a single
//! thread, and some reads (notably [`Host::dimensions`]) can themselves
//! trigger callbacks. Implementations therefore use `&self` everywhere.

mod memory;

pub use memory::{EncoderState, InMemoryHost};

use serde_json::Value;
use std::fmt;

/// Identity of a node in the host graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Knobs a write node carries.
///
/// Values persisted with the document are the source of truth for a node's
/// state; caches elsewhere are rebuilt from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Knob {
    /// Selected profile name (`Str`)
    ProfileName,
    /// Profile names offered for selection (`List`)
    ProfileChoices,
    /// Output name (`Str`)
    OutputName,
    /// Mirror the node name into the output name (`Bool`)
    UseNameAsOutput,
    /// Output knob shown (`Bool`)
    OutputVisible,
    /// Output knob editable (`Bool`)
    OutputEnabled,
    /// Last accepted full-resolution path (`Str`)
    CachedPath,
    /// Last accepted proxy path (`Str`)
    CachedProxyPath,
    /// Script path the cache was last validated against (`Str`)
    LastKnownScript,
    /// Render template name cached from the profile (`Str`)
    RenderTemplate,
    /// Publish template name cached from the profile (`Str`)
    PublishTemplate,
    /// Proxy render template name cached from the profile (`Str`)
    ProxyRenderTemplate,
    /// Proxy publish template name cached from the profile (`Str`)
    ProxyPublishTemplate,
    /// Encoder file type cached from the profile (`Str`)
    FileType,
    /// Encoder settings cached from the profile (`Json` object)
    FileSettings,
    /// Encoder knobs promoted onto the node (`List`)
    PromotedKnobs,
    /// User values of promoted knobs (`Json` object)
    PromotedSettings,
    /// Warning text about the path (`Str`)
    PathWarning,
    /// Reset-path button shown (`Bool`)
    ResetPathVisible,
    /// Warning text about the render mode (`Str`)
    RenderWarning,
    /// Preview: context directory (`Str`)
    PathContext,
    /// Preview: directories below the context (`Str`)
    PathLocal,
    /// Preview: file name (`Str`)
    PathFilename,
    /// Node label (`Str`)
    Label,
    /// Packed RGB node colour (`Int`)
    TileColor,
    /// Node disabled (`Bool`)
    Disable,
}

impl Knob {
    /// Persisted knob name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProfileName => "profile_name",
            Self::ProfileChoices => "profile_choices",
            Self::OutputName => "output",
            Self::UseNameAsOutput => "use_name_as_output",
            Self::OutputVisible => "output_visible",
            Self::OutputEnabled => "output_enabled",
            Self::CachedPath => "cached_path",
            Self::CachedProxyPath => "cached_proxy_path",
            Self::LastKnownScript => "last_known_script",
            Self::RenderTemplate => "render_template",
            Self::PublishTemplate => "publish_template",
            Self::ProxyRenderTemplate => "proxy_render_template",
            Self::ProxyPublishTemplate => "proxy_publish_template",
            Self::FileType => "file_type",
            Self::FileSettings => "file_type_settings",
            Self::PromotedKnobs => "promoted_knobs",
            Self::PromotedSettings => "promoted_settings",
            Self::PathWarning => "path_warning",
            Self::ResetPathVisible => "reset_path_visible",
            Self::RenderWarning => "render_warning",
            Self::PathContext => "path_context",
            Self::PathLocal => "path_local",
            Self::PathFilename => "path_filename",
            Self::Label => "label",
            Self::TileColor => "tile_color",
            Self::Disable => "disable",
        }
    }
}

impl fmt::Display for Knob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A knob value.
#[derive(Debug, Clone, PartialEq)]
pub enum KnobValue {
    /// Text
    Str(String),
    /// Flag
    Bool(bool),
    /// Integer
    Int(i64),
    /// List of strings
    List(Vec<String>),
    /// Structured value
    Json(Value),
}

impl KnobValue {
    /// Text payload.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Flag payload.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer payload.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// List payload.
    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Structured payload.
    #[must_use]
    pub const fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }
}

impl From<&str> for KnobValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for KnobValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<bool> for KnobValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for KnobValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<Vec<String>> for KnobValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<Value> for KnobValue {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// A placeholder left in a script by tools that cannot create write nodes.
///
/// On script load each placeholder is replaced by a real write node using the
/// named profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderNode {
    /// The placeholder's node identity
    pub id: NodeId,
    /// Profile name from the placeholder metadata
    pub profile: String,
    /// Output name from the `output` (or legacy `channel`) metadata
    pub output: Option<String>,
}

/// Operations the write-node layer needs from the host application.
pub trait Host {
    /// All write nodes in the current script, in creation order.
    fn nodes(&self) -> Vec<NodeId>;

    /// True if `node` exists.
    fn contains(&self, node: NodeId) -> bool;

    /// The node's name.
    fn node_name(&self, node: NodeId) -> Option<String>;

    /// Renames a node.
    fn rename_node(&self, node: NodeId, name: &str);

    /// Names of every node in the script, write nodes or not.
    fn node_names(&self) -> Vec<String>;

    /// Creates a write node named `name`.
    fn create_node(&self, name: &str) -> NodeId;

    /// Deletes a node.
    fn delete_node(&self, node: NodeId);

    /// Full-resolution output dimensions. May trigger host callbacks.
    fn dimensions(&self, node: NodeId) -> (i64, i64);

    /// Proxy output dimensions. May trigger host callbacks.
    fn proxy_dimensions(&self, node: NodeId) -> (i64, i64);

    /// True when the script is in proxy mode.
    fn is_proxy(&self) -> bool;

    /// Reads a knob.
    fn knob(&self, node: NodeId, knob: Knob) -> Option<KnobValue>;

    /// Writes a knob.
    fn set_knob(&self, node: NodeId, knob: Knob, value: KnobValue);

    /// Path the script was last saved to; `None` if never saved.
    fn current_script_path(&self) -> Option<String>;

    /// Sets the encoder's file type. Returns false if the type is unsupported.
    fn set_encoder_file_type(&self, node: NodeId, file_type: &str) -> bool;

    /// The encoder's current file type.
    fn encoder_file_type(&self, node: NodeId) -> String;

    /// Sets an encoder knob. Returns false if the encoder has no such knob.
    fn set_encoder_knob(&self, node: NodeId, name: &str, value: &Value) -> bool;

    /// Reads an encoder knob.
    fn encoder_knob(&self, node: NodeId, name: &str) -> Option<Value>;

    /// True if the encoder has a knob called `name`.
    fn encoder_has_knob(&self, node: NodeId, name: &str) -> bool;

    /// Mirrors the node's disabled state onto the encoder.
    fn set_encoder_disabled(&self, node: NodeId, disabled: bool);

    /// Placeholder nodes waiting to be converted.
    fn placeholder_nodes(&self) -> Vec<PlaceholderNode>;

    /// Reads a text knob, empty if unset.
    fn knob_str(&self, node: NodeId, knob: Knob) -> String {
        self.knob(node, knob).and_then(|v| v.as_str().map(str::to_string)).unwrap_or_default()
    }

    /// Reads a flag knob, false if unset.
    fn knob_bool(&self, node: NodeId, knob: Knob) -> bool {
        self.knob(node, knob).and_then(|v| v.as_bool()).unwrap_or(false)
    }

    /// Writes a knob only when the value differs.
    ///
    /// Returns true if the knob changed.
    fn update_knob(&self, node: NodeId, knob: Knob, value: KnobValue) -> bool {
        if self.knob(node, knob).as_ref() == Some(&value) {
            return false;
        }
        self.set_knob(node, knob, value);
        true
    }
}
