//! The node lifecycle coordinator.
//!
//! [`WriteNodeHandler`] reacts to host events (node creation, knob edits,
//! script load and save, render start and end, context switches) and
//! decides when a node's render paths are recomputed, reused or reset.
//!
//! # State
//!
//! The node's knobs are the source of truth. The handler keeps only
//! transient, rebuildable state next to them:
//!
//! - the active [`Configuration`], replaced wholesale on context change
//! - the [`PathCache`] (memoized computations, re-entrancy and render flags)
//! - the set of fully constructed nodes, which gates knob callbacks
//! - memoized path previews
//!
//! All of it lives in `RefCell`/`Rc` because the host drives everything from
//! a single thread and may call back into the handler while a host query is
//! running. No `RefCell` borrow is held across a call into the host.

use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

use super::cache::{ComputationInputs, PathCache, ResolutionMode};
use super::compute::{Clock, SystemClock};
use super::configuration::Configuration;
use super::lock::{PathState, detect_lock};
use super::preview::{PathPreview, PreviewCache};
use super::profile::Profile;
use super::warning::{frozen_path_warning, locked_path_warning, proxy_collision_warning};
use crate::config::PipelineConfig;
use crate::constants::{
    AUTO_DETECT_FILE_TYPE, DEFAULT_NODE_NAME_PREFIX, DEFAULT_OUTPUT_NAME, FILE_DISCOVERY_SKIP_KEYS,
    OUTPUT_KEYS, PROFILE_NOT_FOUND_SUFFIX,
};
use crate::core::{PathComputationError, WriteNodeError};
use crate::host::{Host, Knob, KnobValue, NodeId};
use crate::templating::Template;

/// The four templates a profile names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TemplateRole {
    Render,
    Publish,
    ProxyRender,
    ProxyPublish,
}

impl TemplateRole {
    const fn knob(self) -> Knob {
        match self {
            Self::Render => Knob::RenderTemplate,
            Self::Publish => Knob::PublishTemplate,
            Self::ProxyRender => Knob::ProxyRenderTemplate,
            Self::ProxyPublish => Knob::ProxyPublishTemplate,
        }
    }

    fn name_in(self, profile: &Profile) -> &str {
        match self {
            Self::Render => &profile.render_template,
            Self::Publish => &profile.publish_template,
            Self::ProxyRender => &profile.proxy_render_template,
            Self::ProxyPublish => &profile.proxy_publish_template,
        }
    }
}

/// What a path computation for one node and mode is built from.
struct RenderSettings {
    template: Option<Arc<dyn Template>>,
    width: i64,
    height: i64,
    output: String,
}

/// The templates of one profile, resolved.
struct ProfileTemplates {
    render: Arc<dyn Template>,
    publish: Arc<dyn Template>,
    proxy_render: Option<Arc<dyn Template>>,
    proxy_publish: Option<Arc<dyn Template>>,
}

impl ProfileTemplates {
    fn resolve(config: &Configuration, profile: &Profile) -> Result<Self, WriteNodeError> {
        let resolver = config.resolver();
        Ok(Self {
            render: resolver.resolve(&profile.render_template)?,
            publish: resolver.resolve(&profile.publish_template)?,
            proxy_render: resolver.resolve_optional(&profile.proxy_render_template)?,
            proxy_publish: resolver.resolve_optional(&profile.proxy_publish_template)?,
        })
    }
}

fn uses_output_key(template: &dyn Template) -> bool {
    OUTPUT_KEYS.iter().any(|key| template.has_key(key))
}

/// Coordinates path computation for every write node of one host.
pub struct WriteNodeHandler<H: Host> {
    host: Rc<H>,
    config: RefCell<Rc<Configuration>>,
    clock: Rc<dyn Clock>,
    cache: PathCache,
    previews: PreviewCache,
    constructed: RefCell<HashSet<NodeId>>,
}

impl<H: Host> std::fmt::Debug for WriteNodeHandler<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteNodeHandler")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .field("constructed", &self.constructed)
            .finish_non_exhaustive()
    }
}

impl<H: Host> WriteNodeHandler<H> {
    /// Creates a handler for `host` using the system clock.
    ///
    /// # Errors
    ///
    /// Fails if the configuration's templates cannot be built.
    pub fn new(host: Rc<H>, config: &PipelineConfig) -> Result<Self, WriteNodeError> {
        Self::with_clock(host, config, Rc::new(SystemClock))
    }

    /// Creates a handler reading dates from `clock`.
    ///
    /// # Errors
    ///
    /// Fails if the configuration's templates cannot be built.
    pub fn with_clock(
        host: Rc<H>,
        config: &PipelineConfig,
        clock: Rc<dyn Clock>,
    ) -> Result<Self, WriteNodeError> {
        let configuration = Configuration::from_pipeline(config, clock.clone())?;
        Ok(Self {
            host,
            config: RefCell::new(Rc::new(configuration)),
            clock,
            cache: PathCache::new(),
            previews: PreviewCache::new(),
            constructed: RefCell::new(HashSet::new()),
        })
    }

    /// The host.
    #[must_use]
    pub const fn host(&self) -> &Rc<H> {
        &self.host
    }

    /// The active configuration.
    #[must_use]
    pub fn configuration(&self) -> Rc<Configuration> {
        self.config.borrow().clone()
    }

    /// Profile names in configuration order.
    #[must_use]
    pub fn profile_names(&self) -> Vec<String> {
        self.configuration().profiles().names().to_vec()
    }

    /// Every write node of the host.
    #[must_use]
    pub fn get_nodes(&self) -> Vec<NodeId> {
        self.host.nodes()
    }

    /// The profile name stored on `node`.
    #[must_use]
    pub fn get_node_profile_name(&self, node: NodeId) -> String {
        self.host.knob_str(node, Knob::ProfileName)
    }

    /// The published file type of `node`'s profile.
    #[must_use]
    pub fn get_node_published_file_type(&self, node: NodeId) -> Option<String> {
        self.configuration()
            .profiles()
            .get(&self.get_node_profile_name(node))
            .and_then(|profile| profile.published_file_type.clone())
    }

    /// True once `node` finished setup.
    #[must_use]
    pub fn is_constructed(&self, node: NodeId) -> bool {
        self.constructed.borrow().contains(&node)
    }

    /// The last recorded state of `node`'s path in `mode`.
    #[must_use]
    pub fn path_state(&self, node: NodeId, mode: ResolutionMode) -> PathState {
        self.cache.state(node, mode)
    }

    /// `(hits, misses)` of the path preview cache.
    #[must_use]
    pub fn preview_stats(&self) -> (usize, usize) {
        self.previews.stats()
    }

    fn ensure_node(&self, node: NodeId) -> Result<(), WriteNodeError> {
        if self.host.contains(node) {
            Ok(())
        } else {
            Err(WriteNodeError::NodeNotFound {
                node: node.to_string(),
            })
        }
    }

    fn display_name(&self, node: NodeId) -> String {
        self.host.node_name(node).unwrap_or_else(|| node.to_string())
    }

    /// True if the node names a profile that is no longer configured.
    fn profile_is_missing(&self, config: &Configuration, node: NodeId) -> bool {
        let name = self.host.knob_str(node, Knob::ProfileName);
        !name.is_empty() && !config.profiles().contains(&name)
    }

    // ---------------------------------------------------------------------
    // Templates
    // ---------------------------------------------------------------------

    /// The template name for `role`: from the profile when it exists (and
    /// cached on the node), otherwise from the node's cache.
    fn template_name(&self, config: &Configuration, node: NodeId, role: TemplateRole) -> String {
        match config.profiles().get(&self.host.knob_str(node, Knob::ProfileName)) {
            Some(profile) => {
                let name = role.name_in(&profile).to_string();
                self.host.update_knob(node, role.knob(), name.clone().into());
                name
            }
            None => self.host.knob_str(node, role.knob()),
        }
    }

    fn template(
        &self,
        config: &Configuration,
        node: NodeId,
        role: TemplateRole,
    ) -> Option<Arc<dyn Template>> {
        let name = self.template_name(config, node, role);
        match config.resolver().resolve_optional(&name) {
            Ok(template) => template,
            Err(e) => {
                warn!("Node '{}': {}", self.display_name(node), e);
                None
            }
        }
    }

    fn template_with_fallback(
        &self,
        config: &Configuration,
        node: NodeId,
        role: TemplateRole,
    ) -> Option<Arc<dyn Template>> {
        let fallback = match role {
            TemplateRole::ProxyRender => TemplateRole::Render,
            TemplateRole::ProxyPublish => TemplateRole::Publish,
            other => other,
        };
        self.template(config, node, role).or_else(|| self.template(config, node, fallback))
    }

    fn render_role(mode: ResolutionMode) -> TemplateRole {
        match mode {
            ResolutionMode::Full => TemplateRole::Render,
            ResolutionMode::Proxy => TemplateRole::ProxyRender,
        }
    }

    /// The render template of `node`.
    #[must_use]
    pub fn get_render_template(&self, node: NodeId) -> Option<Arc<dyn Template>> {
        self.template(&self.configuration(), node, TemplateRole::Render)
    }

    /// The publish template of `node`.
    #[must_use]
    pub fn get_publish_template(&self, node: NodeId) -> Option<Arc<dyn Template>> {
        self.template(&self.configuration(), node, TemplateRole::Publish)
    }

    /// The proxy render template of `node`, falling back to the render
    /// template.
    #[must_use]
    pub fn get_proxy_render_template(&self, node: NodeId) -> Option<Arc<dyn Template>> {
        self.template_with_fallback(&self.configuration(), node, TemplateRole::ProxyRender)
    }

    /// The proxy publish template of `node`, falling back to the publish
    /// template.
    #[must_use]
    pub fn get_proxy_publish_template(&self, node: NodeId) -> Option<Arc<dyn Template>> {
        self.template_with_fallback(&self.configuration(), node, TemplateRole::ProxyPublish)
    }

    // ---------------------------------------------------------------------
    // Path computation
    // ---------------------------------------------------------------------

    /// Collects template, dimensions and output name for `mode`.
    ///
    /// Without a proxy template the proxy path uses the full-resolution
    /// template and dimensions.
    fn gather_render_settings(
        &self,
        config: &Configuration,
        node: NodeId,
        mode: ResolutionMode,
    ) -> RenderSettings {
        let template = self.template(config, node, Self::render_role(mode));
        let (width, height) = match mode {
            ResolutionMode::Proxy if template.is_none() => {
                return self.gather_render_settings(config, node, ResolutionMode::Full);
            }
            ResolutionMode::Proxy => self.host.proxy_dimensions(node),
            ResolutionMode::Full => self.host.dimensions(node),
        };

        let output = match &template {
            Some(t) if uses_output_key(t.as_ref()) => self.host.knob_str(node, Knob::OutputName),
            _ => String::new(),
        };

        RenderSettings {
            template,
            width,
            height,
            output,
        }
    }

    fn compute_path(&self, node: NodeId, mode: ResolutionMode) -> Result<String, WriteNodeError> {
        self.ensure_node(node)?;
        let config = self.configuration();
        if self.profile_is_missing(&config, node) {
            return Ok(self.host.knob_str(node, mode.cached_path_knob()));
        }

        let settings = self.gather_render_settings(&config, node, mode);
        let script_path = self.host.current_script_path();
        Ok(config.computer().compute(
            settings.template.as_deref(),
            script_path.as_deref(),
            settings.width,
            settings.height,
            &settings.output,
        )?)
    }

    /// Computes the full-resolution path of `node` without touching its
    /// state.
    ///
    /// A node whose profile is no longer configured returns its cached path.
    ///
    /// # Errors
    ///
    /// [`WriteNodeError::PathComputation`] when no path can be built,
    /// [`WriteNodeError::NodeNotFound`] for unknown nodes.
    pub fn compute_render_path(&self, node: NodeId) -> Result<String, WriteNodeError> {
        self.compute_path(node, ResolutionMode::Full)
    }

    /// Computes the proxy path of `node`; see
    /// [`compute_render_path`](Self::compute_render_path).
    ///
    /// # Errors
    ///
    /// As [`compute_render_path`](Self::compute_render_path).
    pub fn compute_proxy_path(&self, node: NodeId) -> Result<String, WriteNodeError> {
        self.compute_path(node, ResolutionMode::Proxy)
    }

    /// The cached path of `node`, computed (errors ignored) when nothing is
    /// cached.
    #[must_use]
    pub fn get_render_path(&self, node: NodeId, mode: ResolutionMode) -> String {
        let path = self.host.knob_str(node, mode.cached_path_knob());
        if !path.is_empty() {
            return path;
        }
        self.compute_path(node, mode).unwrap_or_else(|e| {
            trace!("No {} path for node '{}': {}", mode, self.display_name(node), e);
            String::new()
        })
    }

    /// Recomputes (or reuses) the path of `node` in `mode` and updates the
    /// node's knobs. Returns the path the node should render to.
    fn update_render_path(&self, node: NodeId, mode: ResolutionMode, force_reset: bool) -> String {
        let cached_knob = mode.cached_path_knob();
        let cached_path = self.host.knob_str(node, cached_knob);

        if self.cache.is_rendering(node) {
            return cached_path;
        }
        let Some(_guard) = self.cache.begin_update(node, mode) else {
            trace!("Re-entrant {} path update for node {} skipped", mode, node);
            return cached_path;
        };

        let config = self.configuration();
        if self.profile_is_missing(&config, node) {
            debug!(
                "Profile '{}' of node '{}' is not configured; keeping the cached {} path",
                self.host.knob_str(node, Knob::ProfileName),
                self.display_name(node),
                mode
            );
            return cached_path;
        }

        let script_path = self.host.current_script_path();
        let settings = self.gather_render_settings(&config, node, mode);
        let inputs = ComputationInputs {
            context: config.context().clone(),
            width: settings.width,
            height: settings.height,
            output: settings.output.clone(),
            script_path: script_path.clone(),
            date: self.clock.today(),
        };

        let memoized = if force_reset { None } else { self.cache.lookup(node, mode, &inputs) };
        let outcome = match memoized {
            Some(outcome) => {
                trace!("Reusing the {} path computed for node {}", mode, node);
                outcome
            }
            None => config.computer().compute(
                settings.template.as_deref(),
                script_path.as_deref(),
                settings.width,
                settings.height,
                &settings.output,
            ),
        };
        self.cache.store(node, mode, inputs, outcome.clone());

        let mut path_warning = String::new();
        let mut reset_visible = false;
        let render_path = match outcome {
            Err(e) => {
                debug!(
                    "Unable to compute the {} path for node '{}': {}",
                    mode,
                    self.display_name(node),
                    e
                );
                path_warning = frozen_path_warning(&e.to_string(), !cached_path.is_empty());
                let state = if cached_path.is_empty() {
                    PathState::Uncached
                } else {
                    PathState::ValidWithWarning
                };
                self.cache.set_state(node, mode, state);
                cached_path
            }
            Ok(path) => {
                let lock = if force_reset {
                    None
                } else {
                    detect_lock(settings.template.as_deref(), &path, &cached_path)
                };

                let surfaced = match &lock {
                    Some(reason) => {
                        info!(
                            "The {} path of node '{}' is locked ({}); keeping '{}'",
                            mode,
                            self.display_name(node),
                            reason,
                            cached_path
                        );
                        path_warning = locked_path_warning();
                        reset_visible = true;
                        self.cache.set_state(node, mode, PathState::Locked);
                        cached_path.clone()
                    }
                    None => {
                        self.cache.set_state(node, mode, PathState::Valid);
                        path
                    }
                };

                if lock.is_none() || cached_path.is_empty() {
                    self.host.update_knob(node, cached_knob, surfaced.clone().into());
                }
                if force_reset || self.host.knob_str(node, Knob::LastKnownScript).is_empty() {
                    self.host.update_knob(
                        node,
                        Knob::LastKnownScript,
                        script_path.clone().unwrap_or_default().into(),
                    );
                }
                surfaced
            }
        };

        // The proxy path is also maintained outside proxy mode; only the
        // active mode drives the node's feedback knobs.
        if mode == ResolutionMode::from_proxy(self.host.is_proxy()) {
            self.host.update_knob(node, Knob::PathWarning, path_warning.into());
            self.host.update_knob(node, Knob::ResetPathVisible, reset_visible.into());

            let render_warning = if mode == ResolutionMode::Proxy
                && self.get_render_path(node, ResolutionMode::Full) == render_path
            {
                proxy_collision_warning()
            } else {
                String::new()
            };
            self.host.update_knob(node, Knob::RenderWarning, render_warning.into());

            self.update_output_knobs(&config, node);
            self.update_path_preview(&config, node, &render_path);
        }

        render_path
    }

    /// Forces both paths of `node` to be recomputed from the current script
    /// and configuration. Clears any lock.
    ///
    /// # Errors
    ///
    /// [`WriteNodeError::NodeNotFound`] for unknown nodes.
    pub fn reset_render_path(&self, node: NodeId) -> Result<(), WriteNodeError> {
        self.ensure_node(node)?;
        let mode = ResolutionMode::from_proxy(self.host.is_proxy());
        self.update_render_path(node, mode, true);
        self.update_render_path(node, mode.other(), true);
        Ok(())
    }

    /// True if `node`'s full-resolution path is locked, or cannot be
    /// computed at all.
    #[must_use]
    pub fn render_path_is_locked(&self, node: NodeId) -> bool {
        let Ok(render_path) = self.compute_render_path(node) else {
            return true;
        };
        let cached_path = self.get_render_path(node, ResolutionMode::Full);
        let config = self.configuration();
        let template = self.template_with_fallback(&config, node, TemplateRole::Render);
        detect_lock(template.as_deref(), &render_path, &cached_path).is_some()
    }

    fn files_on_disk(
        &self,
        node: NodeId,
        mode: ResolutionMode,
    ) -> Result<Vec<String>, WriteNodeError> {
        self.ensure_node(node)?;
        let config = self.configuration();
        let path = self.get_render_path(node, mode);
        let template = self
            .template_with_fallback(&config, node, Self::render_role(mode))
            .ok_or(PathComputationError::MissingTemplate)?;

        let fields = template.extract_fields(&path).map_err(|e| {
            debug!("Path '{}' does not match '{}': {}", path, template.name(), e);
            WriteNodeError::UnresolvedPath {
                path: path.clone(),
                template: template.name().to_string(),
            }
        })?;

        let files = config.resolver().source().paths_from_template(
            template.as_ref(),
            &fields,
            &FILE_DISCOVERY_SKIP_KEYS,
        )?;
        debug!("Found {} files on disk for node '{}'", files.len(), self.display_name(node));
        Ok(files)
    }

    /// Rendered files matching `node`'s full-resolution path, every frame
    /// and view, sorted.
    ///
    /// # Errors
    ///
    /// [`WriteNodeError::UnresolvedPath`] when the path no longer matches
    /// its template, or the discovery error.
    pub fn get_files_on_disk(&self, node: NodeId) -> Result<Vec<String>, WriteNodeError> {
        self.files_on_disk(node, ResolutionMode::Full)
    }

    /// Rendered files matching `node`'s proxy path.
    ///
    /// # Errors
    ///
    /// As [`get_files_on_disk`](Self::get_files_on_disk).
    pub fn get_proxy_files_on_disk(&self, node: NodeId) -> Result<Vec<String>, WriteNodeError> {
        self.files_on_disk(node, ResolutionMode::Proxy)
    }

    // ---------------------------------------------------------------------
    // Node feedback
    // ---------------------------------------------------------------------

    fn output_is_used(&self, config: &Configuration, node: NodeId) -> bool {
        [TemplateRole::Render, TemplateRole::ProxyRender]
            .into_iter()
            .filter_map(|role| self.template(config, node, role))
            .any(|t| uses_output_key(t.as_ref()))
    }

    fn update_output_knobs(&self, config: &Configuration, node: NodeId) {
        let used = self.output_is_used(config, node);
        let name_as_output = self.host.knob_bool(node, Knob::UseNameAsOutput);
        self.host.update_knob(node, Knob::OutputEnabled, (used && !name_as_output).into());
        self.host.update_knob(node, Knob::OutputVisible, used.into());
    }

    fn update_path_preview(&self, config: &Configuration, node: NodeId, path: &str) {
        let label = format!("Write {}", self.host.knob_str(node, Knob::ProfileName));
        self.host.update_knob(node, Knob::Label, label.into());

        let PathPreview {
            context,
            local,
            file_name,
        } = self.previews.preview(path, config.context());
        self.host.update_knob(node, Knob::PathContext, context.into());
        self.host.update_knob(node, Knob::PathLocal, local.into());
        self.host.update_knob(node, Knob::PathFilename, file_name.into());
    }

    // ---------------------------------------------------------------------
    // Profiles and encoder settings
    // ---------------------------------------------------------------------

    fn profile_choices(config: &Configuration, current: &str) -> Vec<String> {
        let mut choices = config.profiles().names().to_vec();
        if !current.is_empty() && !config.profiles().contains(current) {
            choices.insert(0, format!("{current}{PROFILE_NOT_FOUND_SUFFIX}"));
        }
        choices
    }

    /// Applies `profile_name` to `node`.
    ///
    /// With `reset_all` every encoder setting of the profile is applied;
    /// otherwise promoted knobs keep the values the artist chose. A profile
    /// that is not configured restores the settings cached on the node.
    fn set_profile(
        &self,
        config: &Configuration,
        node: NodeId,
        profile_name: &str,
        reset_all: bool,
    ) -> Result<(), WriteNodeError> {
        let Some(profile) = config.profiles().get(profile_name) else {
            debug!(
                "Node '{}' uses unknown profile '{}'; applying cached file settings",
                self.display_name(node),
                profile_name
            );
            self.apply_cached_file_format_settings(node);
            return Ok(());
        };

        let ProfileTemplates {
            render,
            publish,
            proxy_render,
            proxy_publish,
        } = match ProfileTemplates::resolve(config, &profile) {
            Ok(templates) => templates,
            Err(e) => {
                warn!(
                    "Profile '{}' cannot be applied to node '{}': {}",
                    profile_name,
                    self.display_name(node),
                    e
                );
                self.apply_cached_file_format_settings(node);
                return Err(e);
            }
        };

        debug!("Changing the profile for node '{}' to: {}", self.display_name(node), profile_name);
        let old_profile_name = self.host.knob_str(node, Knob::ProfileName);

        self.host.update_knob(
            node,
            Knob::ProfileChoices,
            config.profiles().names().to_vec().into(),
        );
        self.host.update_knob(node, Knob::ProfileName, profile_name.into());

        self.populate_format_settings(
            node,
            &profile.file_type,
            &profile.file_settings,
            reset_all,
            &profile.promote_write_knobs,
        );
        self.host.update_knob(node, Knob::FileType, profile.file_type.clone().into());
        let settings: Map<String, Value> =
            profile.file_settings.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        self.host.update_knob(node, Knob::FileSettings, Value::Object(settings).into());

        let promoted: Vec<String> = profile
            .promote_write_knobs
            .iter()
            .filter(|name| {
                let exists = self.host.encoder_has_knob(node, name);
                if !exists {
                    warn!("Knob {} does not exist and will not be promoted.", name);
                }
                exists
            })
            .cloned()
            .collect();
        self.host.update_knob(node, Knob::PromotedKnobs, promoted.into());

        self.host.update_knob(node, Knob::RenderTemplate, render.name().into());
        self.host.update_knob(node, Knob::PublishTemplate, publish.name().into());
        self.host.update_knob(
            node,
            Knob::ProxyRenderTemplate,
            proxy_render.as_ref().map_or("", |t| t.name()).into(),
        );
        self.host.update_knob(
            node,
            Knob::ProxyPublishTemplate,
            proxy_publish.as_ref().map_or("", |t| t.name()).into(),
        );
        self.host.update_knob(node, Knob::TileColor, profile.packed_tile_color().into());

        if profile_name != old_profile_name {
            if !self.output_is_used(config, node) {
                self.host.update_knob(node, Knob::OutputName, "".into());
            }
            self.reset_render_path(node)?;
        }
        Ok(())
    }

    /// Sets the encoder's file type and settings.
    ///
    /// An unsupported file type reverts the encoder to auto-detection and
    /// applies nothing else.
    fn populate_format_settings(
        &self,
        node: NodeId,
        file_type: &str,
        settings: &BTreeMap<String, Value>,
        reset_all: bool,
        promoted: &[String],
    ) {
        if !self.host.set_encoder_file_type(node, file_type) {
            error!(
                "Write node configuration refers to an invalid file format '{}'! Reverting to auto-detect mode instead.",
                file_type
            );
            self.host.set_encoder_file_type(node, AUTO_DETECT_FILE_TYPE);
            return;
        }

        for (name, value) in settings {
            if !reset_all && promoted.contains(name) {
                continue;
            }
            if !self.host.set_encoder_knob(node, name, value) {
                error!(
                    "{} is not a valid setting for file format {}. It will be ignored.",
                    name, file_type
                );
            }
        }

        if reset_all {
            return;
        }
        if let Some(KnobValue::Json(Value::Object(saved))) =
            self.host.knob(node, Knob::PromotedSettings)
        {
            for (name, value) in saved.iter().filter(|(name, _)| promoted.contains(name)) {
                trace!("Restoring promoted encoder knob {} = {}", name, value);
                if !self.host.set_encoder_knob(node, name, value) {
                    debug!("Promoted knob {} could not be restored", name);
                }
            }
        }
    }

    /// Re-applies the file type and settings cached on the node; used when
    /// its profile is gone.
    fn apply_cached_file_format_settings(&self, node: NodeId) {
        let file_type = self.host.knob_str(node, Knob::FileType);
        if file_type.is_empty() {
            return;
        }

        let settings: BTreeMap<String, Value> = match self.host.knob(node, Knob::FileSettings) {
            Some(KnobValue::Json(Value::Object(map))) => map.into_iter().collect(),
            None => BTreeMap::new(),
            Some(other) => {
                warn!(
                    "Failed to read cached file settings from node '{}': unexpected value {:?}",
                    self.display_name(node),
                    other
                );
                BTreeMap::new()
            }
        };
        let promoted = self
            .host
            .knob(node, Knob::PromotedKnobs)
            .and_then(|v| v.as_list().map(<[String]>::to_vec))
            .unwrap_or_default();

        self.populate_format_settings(node, &file_type, &settings, false, &promoted);
    }

    /// Writes the encoder's current values of the promoted knobs onto the
    /// node so they survive a reload.
    fn persist_promoted_settings(&self, node: NodeId) {
        let promoted = self
            .host
            .knob(node, Knob::PromotedKnobs)
            .and_then(|v| v.as_list().map(<[String]>::to_vec))
            .unwrap_or_default();
        let values: Map<String, Value> = promoted
            .into_iter()
            .filter_map(|name| self.host.encoder_knob(node, &name).map(|value| (name, value)))
            .collect();
        self.host.update_knob(node, Knob::PromotedSettings, Value::Object(values).into());
    }

    // ---------------------------------------------------------------------
    // Output names
    // ---------------------------------------------------------------------

    fn set_output(&self, node: NodeId, output_name: &str) {
        debug!("Changing the output for node '{}' to: {}", self.display_name(node), output_name);
        self.host.update_knob(node, Knob::OutputName, output_name.into());
        if let Err(e) = self.reset_render_path(node) {
            warn!("{}", e);
        }
    }

    /// Picks an output name for a new node that is unique among nodes of the
    /// same profile. `None` when the node has one already or the render
    /// template has no output key.
    fn initial_output_name(&self, config: &Configuration, node: NodeId) -> Option<String> {
        if !self.host.knob_str(node, Knob::OutputName).is_empty() {
            return None;
        }
        let template = self.template(config, node, TemplateRole::Render)?;
        let keys: Vec<&str> =
            OUTPUT_KEYS.iter().copied().filter(|key| template.has_key(key)).collect();
        if keys.is_empty() {
            return None;
        }

        let default = keys
            .iter()
            .find_map(|key| template.key_default(key))
            .map_or_else(|| DEFAULT_OUTPUT_NAME.to_string(), |value| value.to_string());
        let optional = keys.iter().all(|key| template.key_is_optional(key));

        let profile = self.host.knob_str(node, Knob::ProfileName);
        let used: HashSet<String> = self
            .host
            .nodes()
            .into_iter()
            .filter(|other| {
                *other != node && self.host.knob_str(*other, Knob::ProfileName) == profile
            })
            .map(|other| self.host.knob_str(other, Knob::OutputName))
            .collect();

        let base = if optional && !used.contains("") { String::new() } else { default };
        let mut name = base.clone();
        let mut postfix = 1;
        while used.contains(&name) {
            name = format!("{base}{postfix}");
            postfix += 1;
        }
        Some(name)
    }

    // ---------------------------------------------------------------------
    // Host events
    // ---------------------------------------------------------------------

    /// Sets up a node that was just created or loaded.
    ///
    /// Selects the node's profile (the first one for brand new nodes),
    /// mirrors the disabled flag onto the encoder and, when the node uses its
    /// name as output, re-applies the name. Knob callbacks are ignored until
    /// this has run.
    ///
    /// # Errors
    ///
    /// [`WriteNodeError::NodeNotFound`] for unknown nodes. A profile that
    /// cannot be applied is logged, not returned.
    pub fn setup_new_node(&self, node: NodeId) -> Result<(), WriteNodeError> {
        self.ensure_node(node)?;
        let config = self.configuration();

        let current = self.host.knob_str(node, Knob::ProfileName);
        self.host.update_knob(
            node,
            Knob::ProfileChoices,
            Self::profile_choices(&config, &current).into(),
        );

        let (profile_name, reset_all) = if current.is_empty() {
            (config.profiles().first().map(|p| p.name.clone()).unwrap_or_default(), true)
        } else {
            (current, false)
        };
        if let Err(e) = self.set_profile(&config, node, &profile_name, reset_all) {
            warn!("Setting up node '{}': {}", self.display_name(node), e);
        }

        self.host.set_encoder_disabled(node, self.host.knob_bool(node, Knob::Disable));

        if self.host.knob_bool(node, Knob::UseNameAsOutput) {
            if let Some(name) = self.host.node_name(node) {
                self.set_output(node, &name);
            }
        }

        self.constructed.borrow_mut().insert(node);
        debug!("Write node '{}' set up with profile '{}'", self.display_name(node), profile_name);
        Ok(())
    }

    /// Sets up a node the artist created and gives it an initial output name.
    ///
    /// # Errors
    ///
    /// As [`setup_new_node`](Self::setup_new_node).
    pub fn on_user_create(&self, node: NodeId) -> Result<(), WriteNodeError> {
        self.setup_new_node(node)?;
        let config = self.configuration();
        if let Some(name) = self.initial_output_name(&config, node) {
            if name != self.host.knob_str(node, Knob::OutputName) {
                self.set_output(node, &name);
            }
        }
        Ok(())
    }

    /// Reacts to the artist selecting a profile.
    ///
    /// # Errors
    ///
    /// [`WriteNodeError::ProfileNotFound`] for unknown profiles, or the
    /// template error that prevented applying it.
    pub fn on_profile_selected(
        &self,
        node: NodeId,
        profile_name: &str,
    ) -> Result<(), WriteNodeError> {
        self.ensure_node(node)?;
        if !self.is_constructed(node) {
            return Ok(());
        }
        let config = self.configuration();
        if !config.profiles().contains(profile_name) {
            return Err(WriteNodeError::ProfileNotFound {
                name: profile_name.to_string(),
                available: config.profiles().names().to_vec(),
            });
        }
        self.set_profile(&config, node, profile_name, true)
    }

    /// Reacts to a knob edited on a constructed node.
    pub fn on_knob_changed(&self, node: NodeId, knob: Knob) {
        if !self.is_constructed(node) {
            trace!("Ignoring change of {} on node {} during setup", knob, node);
            return;
        }

        match knob {
            Knob::OutputName => {
                let output = if self.host.knob_bool(node, Knob::UseNameAsOutput) {
                    self.host.node_name(node).unwrap_or_default()
                } else {
                    self.host.knob_str(node, Knob::OutputName)
                };
                self.set_output(node, &output);
            }
            Knob::UseNameAsOutput => {
                let name_as_output = self.host.knob_bool(node, Knob::UseNameAsOutput);
                self.host.update_knob(node, Knob::OutputEnabled, (!name_as_output).into());
                if name_as_output {
                    if let Some(name) = self.host.node_name(node) {
                        self.set_output(node, &name);
                    }
                }
            }
            Knob::Disable => {
                self.host.set_encoder_disabled(node, self.host.knob_bool(node, Knob::Disable));
            }
            _ => {}
        }
    }

    /// Reacts to a node being renamed.
    pub fn on_node_renamed(&self, node: NodeId) {
        if !self.is_constructed(node) || !self.host.knob_bool(node, Knob::UseNameAsOutput) {
            return;
        }
        if let Some(name) = self.host.node_name(node) {
            self.set_output(node, &name);
        }
    }

    /// The host asks for the path to render to. `None` until the node is
    /// set up.
    #[must_use]
    pub fn on_compute_path(&self, node: NodeId, mode: ResolutionMode) -> Option<String> {
        if !self.is_constructed(node) {
            return None;
        }
        Some(self.update_render_path(node, mode, false))
    }

    /// A render of `node` is about to start.
    pub fn on_before_render(&self, node: NodeId) {
        self.cache.start_rendering(node);
    }

    /// A render of `node` finished.
    pub fn on_after_render(&self, node: NodeId) {
        self.cache.finish_rendering(node);
    }

    /// `node` was deleted.
    pub fn on_node_deleted(&self, node: NodeId) {
        self.cache.forget(node);
        self.cache.finish_rendering(node);
        self.constructed.borrow_mut().remove(&node);
    }

    /// The script was saved to `script_path`.
    ///
    /// Nodes last validated against a different script are reset so they do
    /// not keep rendering into the old file's location. A node that fails to
    /// reset is logged and skipped.
    pub fn on_script_save(&self, script_path: &str) {
        for node in self.host.nodes() {
            if !self.is_constructed(node) {
                continue;
            }
            if self.host.knob_str(node, Knob::LastKnownScript) != script_path {
                debug!(
                    "Script saved as a new file; resetting the paths of node '{}'",
                    self.display_name(node)
                );
                if let Err(e) = self.reset_render_path(node) {
                    warn!(
                        "Failed to reset the render path of node '{}': {}",
                        self.display_name(node),
                        e
                    );
                }
            }
            self.persist_promoted_settings(node);
        }
    }

    /// A script was loaded: sets up its nodes and converts placeholders.
    pub fn on_script_load(&self) -> Vec<NodeId> {
        for node in self.host.nodes() {
            if self.is_constructed(node) {
                continue;
            }
            if let Err(e) = self.setup_new_node(node) {
                warn!("{}", e);
            }
        }
        self.process_placeholder_nodes()
    }

    /// Creates a write node using `profile_name`.
    ///
    /// The node is called `RenderWrite<N>` with the first unused `N`.
    ///
    /// # Errors
    ///
    /// - [`WriteNodeError::ProfileNotFound`] for unknown profiles
    /// - [`WriteNodeError::ScriptNotSaved`] when the script was never saved
    /// - [`WriteNodeError::NotAWorkFile`] when it was saved outside the work
    ///   area
    pub fn create_new_node(&self, profile_name: &str) -> Result<NodeId, WriteNodeError> {
        let config = self.configuration();
        if !config.profiles().contains(profile_name) {
            return Err(WriteNodeError::ProfileNotFound {
                name: profile_name.to_string(),
                available: config.profiles().names().to_vec(),
            });
        }

        let script_path = self.host.current_script_path().ok_or(WriteNodeError::ScriptNotSaved)?;
        if !config.computer().field_provider().is_work_file(Some(&script_path)) {
            return Err(WriteNodeError::NotAWorkFile {
                path: script_path,
            });
        }

        let existing: HashSet<String> = self.host.node_names().into_iter().collect();
        let mut index = 1;
        let name = loop {
            let candidate = format!("{DEFAULT_NODE_NAME_PREFIX}{index}");
            if !existing.contains(&candidate) {
                break candidate;
            }
            index += 1;
        };

        let node = self.host.create_node(&name);
        info!("Created write node '{}' with profile '{}'", name, profile_name);
        self.set_profile(&config, node, profile_name, true)?;
        self.on_user_create(node)?;
        Ok(node)
    }

    /// Replaces placeholder nodes with real write nodes. Returns the created
    /// nodes.
    pub fn process_placeholder_nodes(&self) -> Vec<NodeId> {
        let config = self.configuration();
        let mut created = Vec::new();
        for placeholder in self.host.placeholder_nodes() {
            if !config.profiles().contains(&placeholder.profile) {
                warn!(
                    "Unknown write node profile '{}' on placeholder {}; it will not be converted",
                    placeholder.profile, placeholder.id
                );
                continue;
            }

            match self.create_new_node(&placeholder.profile) {
                Ok(node) => {
                    self.set_output(node, placeholder.output.as_deref().unwrap_or(""));
                    self.host.delete_node(placeholder.id);
                    created.push(node);
                }
                Err(e) => warn!("Failed to convert placeholder {}: {}", placeholder.id, e),
            }
        }
        created
    }

    /// Switches to a new context's configuration and resets every node.
    ///
    /// # Errors
    ///
    /// Fails if the new configuration cannot be built; the previous one then
    /// stays active.
    pub fn set_configuration(&self, config: &PipelineConfig) -> Result<(), WriteNodeError> {
        let configuration = Rc::new(Configuration::from_pipeline(config, self.clock.clone())?);
        *self.config.borrow_mut() = configuration.clone();
        self.cache.clear();
        self.previews.clear();
        info!("Context changed to '{}'", configuration.context());

        for node in self.host.nodes() {
            let current = self.host.knob_str(node, Knob::ProfileName);
            self.host.update_knob(
                node,
                Knob::ProfileChoices,
                Self::profile_choices(&configuration, &current).into(),
            );
            if let Err(e) = self.reset_render_path(node) {
                warn!(
                    "Failed to reset the render path of node '{}': {}",
                    self.display_name(node),
                    e
                );
            }
        }
        Ok(())
    }
}
