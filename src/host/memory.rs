//! A host that keeps its node graph in memory.
//!
//! Used by the command-line front end and by tests. Node knobs, encoder state
//! and the script path are plain data. A dimension hook lets tests reproduce
//! hosts whose geometry queries call back into the write-node layer.

use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};

use super::{Host, Knob, KnobValue, NodeId, PlaceholderNode};

/// File types the in-memory encoder accepts.
const SUPPORTED_FILE_TYPES: [&str; 7] = ["exr", "dpx", "tiff", "jpeg", "png", "mov", "cin"];

/// Knobs the in-memory encoder exposes.
const ENCODER_KNOBS: [&str; 8] = [
    "channels",
    "colorspace",
    "datatype",
    "compression",
    "autocrop",
    "metadata",
    "quality",
    "raw",
];

/// The internal encoder of one write node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncoderState {
    /// Current file type; blank means "detect from extension"
    pub file_type: String,
    /// Knob values that differ from the encoder defaults
    pub knobs: BTreeMap<String, Value>,
    /// Disabled flag mirrored from the node
    pub disabled: bool,
}

#[derive(Debug, Clone)]
struct NodeRecord {
    name: String,
    knobs: HashMap<Knob, KnobValue>,
    dimensions: (i64, i64),
    proxy_dimensions: (i64, i64),
    encoder: EncoderState,
}

#[derive(Debug, Default)]
struct HostState {
    next_id: u64,
    nodes: BTreeMap<NodeId, NodeRecord>,
    other_node_names: Vec<String>,
    placeholders: Vec<PlaceholderNode>,
    script_path: Option<String>,
    default_dimensions: Option<(i64, i64)>,
}

type DimensionHook = Box<dyn Fn(NodeId)>;

/// An in-memory [`Host`].
#[derive(Default)]
pub struct InMemoryHost {
    state: RefCell<HostState>,
    proxy: Cell<bool>,
    dimension_hook: RefCell<Option<DimensionHook>>,
    dimension_queries: Cell<usize>,
}

impl std::fmt::Debug for InMemoryHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryHost")
            .field("state", &self.state)
            .field("proxy", &self.proxy.get())
            .field("dimension_queries", &self.dimension_queries.get())
            .finish_non_exhaustive()
    }
}

impl InMemoryHost {
    /// Creates an empty, unsaved script with HD output dimensions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets (or clears) the path the script is saved at.
    pub fn set_script_path(&self, path: Option<&str>) {
        self.state.borrow_mut().script_path = path.map(str::to_string);
    }

    /// Switches proxy mode.
    pub fn set_proxy(&self, proxy: bool) {
        self.proxy.set(proxy);
    }

    /// Dimensions given to nodes created from now on.
    pub fn set_default_dimensions(&self, width: i64, height: i64) {
        self.state.borrow_mut().default_dimensions = Some((width, height));
    }

    /// Changes one node's full-resolution dimensions.
    pub fn set_dimensions(&self, node: NodeId, width: i64, height: i64) {
        if let Some(record) = self.state.borrow_mut().nodes.get_mut(&node) {
            record.dimensions = (width, height);
        }
    }

    /// Changes one node's proxy dimensions.
    pub fn set_proxy_dimensions(&self, node: NodeId, width: i64, height: i64) {
        if let Some(record) = self.state.borrow_mut().nodes.get_mut(&node) {
            record.proxy_dimensions = (width, height);
        }
    }

    /// Installs a callback run at the start of every dimension query.
    pub fn set_dimension_hook(&self, hook: impl Fn(NodeId) + 'static) {
        *self.dimension_hook.borrow_mut() = Some(Box::new(hook));
    }

    /// Removes the dimension hook.
    pub fn clear_dimension_hook(&self) {
        self.dimension_hook.borrow_mut().take();
    }

    /// Number of dimension queries answered so far.
    #[must_use]
    pub fn dimension_queries(&self) -> usize {
        self.dimension_queries.get()
    }

    /// Adds a non-write node, only relevant for name clashes.
    pub fn add_other_node(&self, name: &str) {
        self.state.borrow_mut().other_node_names.push(name.to_string());
    }

    /// Adds a placeholder node carrying `profile` and `output` metadata.
    pub fn add_placeholder(&self, profile: &str, output: Option<&str>) -> NodeId {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = NodeId(state.next_id);
        state.placeholders.push(PlaceholderNode {
            id,
            profile: profile.to_string(),
            output: output.map(str::to_string),
        });
        id
    }

    /// The encoder of `node`.
    #[must_use]
    pub fn encoder(&self, node: NodeId) -> Option<EncoderState> {
        self.state.borrow().nodes.get(&node).map(|r| r.encoder.clone())
    }

    fn run_dimension_hook(&self, node: NodeId) {
        self.dimension_queries.set(self.dimension_queries.get() + 1);
        let hook = self.dimension_hook.borrow();
        if let Some(hook) = hook.as_ref() {
            hook(node);
        }
    }
}

impl Host for InMemoryHost {
    fn nodes(&self) -> Vec<NodeId> {
        self.state.borrow().nodes.keys().copied().collect()
    }

    fn contains(&self, node: NodeId) -> bool {
        self.state.borrow().nodes.contains_key(&node)
    }

    fn node_name(&self, node: NodeId) -> Option<String> {
        self.state.borrow().nodes.get(&node).map(|r| r.name.clone())
    }

    fn rename_node(&self, node: NodeId, name: &str) {
        if let Some(record) = self.state.borrow_mut().nodes.get_mut(&node) {
            record.name = name.to_string();
        }
    }

    fn node_names(&self) -> Vec<String> {
        let state = self.state.borrow();
        state
            .nodes
            .values()
            .map(|r| r.name.clone())
            .chain(state.other_node_names.iter().cloned())
            .collect()
    }

    fn create_node(&self, name: &str) -> NodeId {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = NodeId(state.next_id);
        let dimensions = state.default_dimensions.unwrap_or((1920, 1080));
        state.nodes.insert(
            id,
            NodeRecord {
                name: name.to_string(),
                knobs: HashMap::new(),
                dimensions,
                proxy_dimensions: (dimensions.0 / 2, dimensions.1 / 2),
                encoder: EncoderState::default(),
            },
        );
        id
    }

    fn delete_node(&self, node: NodeId) {
        let mut state = self.state.borrow_mut();
        state.nodes.remove(&node);
        state.placeholders.retain(|p| p.id != node);
    }

    fn dimensions(&self, node: NodeId) -> (i64, i64) {
        self.run_dimension_hook(node);
        self.state.borrow().nodes.get(&node).map_or((0, 0), |r| r.dimensions)
    }

    fn proxy_dimensions(&self, node: NodeId) -> (i64, i64) {
        self.run_dimension_hook(node);
        self.state.borrow().nodes.get(&node).map_or((0, 0), |r| r.proxy_dimensions)
    }

    fn is_proxy(&self) -> bool {
        self.proxy.get()
    }

    fn knob(&self, node: NodeId, knob: Knob) -> Option<KnobValue> {
        self.state.borrow().nodes.get(&node).and_then(|r| r.knobs.get(&knob).cloned())
    }

    fn set_knob(&self, node: NodeId, knob: Knob, value: KnobValue) {
        if let Some(record) = self.state.borrow_mut().nodes.get_mut(&node) {
            record.knobs.insert(knob, value);
        }
    }

    fn current_script_path(&self) -> Option<String> {
        self.state.borrow().script_path.clone()
    }

    fn set_encoder_file_type(&self, node: NodeId, file_type: &str) -> bool {
        let supported = file_type.trim().is_empty() || SUPPORTED_FILE_TYPES.contains(&file_type);
        let mut state = self.state.borrow_mut();
        let Some(record) = state.nodes.get_mut(&node) else {
            return false;
        };
        if supported {
            record.encoder.file_type = file_type.to_string();
        }
        supported
    }

    fn encoder_file_type(&self, node: NodeId) -> String {
        self.state
            .borrow()
            .nodes
            .get(&node)
            .map(|r| r.encoder.file_type.clone())
            .unwrap_or_default()
    }

    fn set_encoder_knob(&self, node: NodeId, name: &str, value: &Value) -> bool {
        if !ENCODER_KNOBS.contains(&name) {
            return false;
        }
        let mut state = self.state.borrow_mut();
        match state.nodes.get_mut(&node) {
            Some(record) => {
                record.encoder.knobs.insert(name.to_string(), value.clone());
                true
            }
            None => false,
        }
    }

    fn encoder_knob(&self, node: NodeId, name: &str) -> Option<Value> {
        self.state.borrow().nodes.get(&node).and_then(|r| r.encoder.knobs.get(name).cloned())
    }

    fn encoder_has_knob(&self, node: NodeId, name: &str) -> bool {
        self.contains(node) && ENCODER_KNOBS.contains(&name)
    }

    fn set_encoder_disabled(&self, node: NodeId, disabled: bool) {
        if let Some(record) = self.state.borrow_mut().nodes.get_mut(&node) {
            record.encoder.disabled = disabled;
        }
    }

    fn placeholder_nodes(&self) -> Vec<PlaceholderNode> {
        self.state.borrow().placeholders.clone()
    }
}
