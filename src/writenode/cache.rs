//! Advisory per-node path cache.
//!
//! Holds, for every (node, resolution mode), the inputs of the last
//! computation and its outcome so an unchanged node does not recompute. It
//! also tracks which nodes are rendering and which (node, mode) pairs are
//! mid-update. None of it is authoritative: the node's knobs are, and the
//! cache can be dropped at any time.

use chrono::NaiveDate;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;

use super::lock::PathState;
use crate::context::Context;
use crate::core::PathComputationError;
use crate::host::{Knob, NodeId};

/// Full-resolution or proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionMode {
    /// Full resolution
    Full,
    /// Proxy resolution
    Proxy,
}

impl ResolutionMode {
    /// The mode for a proxy flag.
    #[must_use]
    pub const fn from_proxy(is_proxy: bool) -> Self {
        if is_proxy { Self::Proxy } else { Self::Full }
    }

    /// The other mode.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Full => Self::Proxy,
            Self::Proxy => Self::Full,
        }
    }

    /// The knob holding this mode's cached path.
    #[must_use]
    pub const fn cached_path_knob(self) -> Knob {
        match self {
            Self::Full => Knob::CachedPath,
            Self::Proxy => Knob::CachedProxyPath,
        }
    }
}

impl fmt::Display for ResolutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full-res"),
            Self::Proxy => write!(f, "proxy"),
        }
    }
}

/// Everything a computed path depends on besides configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputationInputs {
    /// Active context
    pub context: Context,
    /// Output width
    pub width: i64,
    /// Output height
    pub height: i64,
    /// Output name
    pub output: String,
    /// Current script path
    pub script_path: Option<String>,
    /// Date the path's date fields were taken from
    pub date: NaiveDate,
}

/// A memoized computation.
#[derive(Debug, Clone)]
pub struct CachedComputation {
    /// Inputs the outcome was computed from
    pub inputs: ComputationInputs,
    /// The path, or the error that prevented it
    pub outcome: Result<String, PathComputationError>,
}

type CacheKey = (NodeId, ResolutionMode);

/// Side cache plus re-entrancy and render bookkeeping.
#[derive(Debug, Default)]
pub struct PathCache {
    computations: RefCell<HashMap<CacheKey, CachedComputation>>,
    states: RefCell<HashMap<CacheKey, PathState>>,
    updating: RefCell<HashSet<CacheKey>>,
    rendering: RefCell<HashSet<NodeId>>,
}

impl PathCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The memoized outcome for `inputs`, if the last computation used
    /// exactly these inputs.
    #[must_use]
    pub fn lookup(
        &self,
        node: NodeId,
        mode: ResolutionMode,
        inputs: &ComputationInputs,
    ) -> Option<Result<String, PathComputationError>> {
        self.computations
            .borrow()
            .get(&(node, mode))
            .filter(|entry| &entry.inputs == inputs)
            .map(|entry| entry.outcome.clone())
    }

    /// Records a computation.
    pub fn store(
        &self,
        node: NodeId,
        mode: ResolutionMode,
        inputs: ComputationInputs,
        outcome: Result<String, PathComputationError>,
    ) {
        self.computations.borrow_mut().insert(
            (node, mode),
            CachedComputation {
                inputs,
                outcome,
            },
        );
    }

    /// The last recorded state.
    #[must_use]
    pub fn state(&self, node: NodeId, mode: ResolutionMode) -> PathState {
        self.states.borrow().get(&(node, mode)).copied().unwrap_or_default()
    }

    /// Records a state.
    pub fn set_state(&self, node: NodeId, mode: ResolutionMode, state: PathState) {
        self.states.borrow_mut().insert((node, mode), state);
    }

    /// Forgets everything about `node` except its render flag.
    pub fn forget(&self, node: NodeId) {
        for mode in [ResolutionMode::Full, ResolutionMode::Proxy] {
            self.computations.borrow_mut().remove(&(node, mode));
            self.states.borrow_mut().remove(&(node, mode));
        }
    }

    /// Drops every memoized computation.
    pub fn clear(&self) {
        self.computations.borrow_mut().clear();
    }

    /// Marks the start of an update of (node, mode).
    ///
    /// Returns `None` if an update of the same pair is already running; the
    /// caller must then not recompute. The returned guard ends the update
    /// when dropped.
    #[must_use]
    pub fn begin_update(&self, node: NodeId, mode: ResolutionMode) -> Option<UpdateGuard<'_>> {
        if self.updating.borrow_mut().insert((node, mode)) {
            Some(UpdateGuard {
                updating: &self.updating,
                key: (node, mode),
            })
        } else {
            None
        }
    }

    /// True while an update of (node, mode) is running.
    #[must_use]
    pub fn is_updating(&self, node: NodeId, mode: ResolutionMode) -> bool {
        self.updating.borrow().contains(&(node, mode))
    }

    /// Marks `node` as rendering.
    pub fn start_rendering(&self, node: NodeId) {
        self.rendering.borrow_mut().insert(node);
    }

    /// Clears the rendering mark.
    pub fn finish_rendering(&self, node: NodeId) {
        self.rendering.borrow_mut().remove(&node);
    }

    /// True while `node` is rendering.
    #[must_use]
    pub fn is_rendering(&self, node: NodeId) -> bool {
        self.rendering.borrow().contains(&node)
    }
}

/// An in-progress update; dropping it ends the update.
#[derive(Debug)]
pub struct UpdateGuard<'a> {
    updating: &'a RefCell<HashSet<CacheKey>>,
    key: CacheKey,
}

impl Drop for UpdateGuard<'_> {
    fn drop(&mut self) {
        self.updating.borrow_mut().remove(&self.key);
    }
}
