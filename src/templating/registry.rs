//! Template registry built from configuration.
//!
//! The registry owns every named [`PathTemplate`] of one configuration. It is
//! immutable once built; a configuration change builds a new registry.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use strsim::levenshtein;
use tracing::debug;

use super::error::TemplateError;
use super::key::{KeyDefinition, TemplateKey};
use super::path_template::PathTemplate;
use super::{Template, TemplateSource};
use crate::constants::DEFAULT_ROOT_NAME;

/// Maximum Levenshtein distance, as a percentage of the requested name's
/// length, for a template name to be offered as a suggestion.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// A path entry under `paths:`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PathDefinition {
    /// Bare definition string, resolved against the default root.
    Simple(String),
    /// Definition with an explicit storage root.
    Detailed {
        /// Template definition
        definition: String,
        /// Name of the storage root the definition is relative to
        #[serde(default)]
        root_name: Option<String>,
    },
}

/// The `roots`, `keys` and `paths` sections of a pipeline configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Named storage roots; values may use `~` and `$VAR`
    pub roots: BTreeMap<String, String>,
    /// Key declarations
    pub keys: BTreeMap<String, KeyDefinition>,
    /// Named template definitions
    pub paths: BTreeMap<String, PathDefinition>,
}

/// All templates of one configuration, addressed by name.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, Arc<PathTemplate>>,
}

impl TemplateRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds every template declared in `config`.
    ///
    /// # Errors
    ///
    /// Returns the first key or template definition that fails to parse, or an
    /// unknown storage root.
    pub fn from_config(config: &TemplateConfig) -> Result<Self, TemplateError> {
        let mut keys = BTreeMap::new();
        for (name, def) in &config.keys {
            keys.insert(name.clone(), TemplateKey::from_definition(name, def)?);
        }

        let mut roots = BTreeMap::new();
        for (name, raw) in &config.roots {
            let expanded = shellexpand::full(raw).map_err(|e| TemplateError::InvalidDefinition {
                definition: raw.clone(),
                reason: format!("cannot expand root '{name}': {e}"),
            })?;
            roots.insert(name.clone(), expanded.replace('\\', "/"));
        }

        let mut registry = Self::new();
        for (name, path) in &config.paths {
            let (definition, root_name) = match path {
                PathDefinition::Simple(definition) => (definition, None),
                PathDefinition::Detailed {
                    definition,
                    root_name,
                } => (definition, root_name.as_deref()),
            };
            let full = join_root(name, definition, root_name, &roots)?;
            registry.insert(PathTemplate::new(name.clone(), full, &keys)?);
        }

        debug!("Loaded {} path templates", registry.templates.len());
        Ok(registry)
    }

    /// Adds (or replaces) a template.
    pub fn insert(&mut self, template: PathTemplate) {
        self.templates.insert(template.name().to_string(), Arc::new(template));
    }

    /// Number of templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// True when no templates are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    fn suggestions(&self, target: &str) -> Vec<String> {
        let mut scored: Vec<(&String, usize)> =
            self.templates.keys().map(|name| (name, levenshtein(target, name))).collect();
        scored.sort_by_key(|(_, dist)| *dist);
        scored
            .into_iter()
            .filter(|(_, dist)| *dist <= target.len() * SIMILARITY_THRESHOLD_PERCENT / 100)
            .take(3)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl TemplateSource for TemplateRegistry {
    fn template_by_name(&self, name: &str) -> Result<Arc<dyn Template>, TemplateError> {
        match self.templates.get(name) {
            Some(template) => {
                let template: Arc<dyn Template> = template.clone();
                Ok(template)
            }
            None => Err(TemplateError::NotFound {
                name: name.to_string(),
                suggestions: self.suggestions(name),
            }),
        }
    }

    fn template_names(&self) -> Vec<String> {
        self.templates.keys().cloned().collect()
    }
}

fn is_absolute(definition: &str) -> bool {
    let bytes = definition.as_bytes();
    definition.starts_with('/')
        || definition.starts_with('\\')
        || (bytes.len() > 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic())
}

fn join_root(
    template: &str,
    definition: &str,
    root_name: Option<&str>,
    roots: &BTreeMap<String, String>,
) -> Result<String, TemplateError> {
    let root = match root_name {
        Some(name) => Some(roots.get(name).ok_or_else(|| TemplateError::UnknownRoot {
            template: template.to_string(),
            root: name.to_string(),
        })?),
        None if is_absolute(definition) => None,
        None => roots.get(DEFAULT_ROOT_NAME),
    };

    Ok(match root {
        Some(root) => format!(
            "{}/{}",
            root.trim_end_matches('/'),
            definition.replace('\\', "/").trim_start_matches('/')
        ),
        None => definition.to_string(),
    })
}
