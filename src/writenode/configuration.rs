//! The immutable per-context view of a pipeline configuration.

use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, warn};

use super::compute::{Clock, PathComputer};
use super::profile::ProfileTable;
use crate::config::PipelineConfig;
use crate::context::{Context, ContextFieldProvider};
use crate::core::WriteNodeError;
use crate::templating::{TemplateRegistry, TemplateResolver};

/// Templates, profiles and the path computer for one context.
///
/// Built once and never mutated. A context switch builds a new value and
/// replaces the old one wholesale.
#[derive(Debug, Clone)]
pub struct Configuration {
    resolver: TemplateResolver,
    profiles: ProfileTable,
    computer: PathComputer,
}

impl Configuration {
    /// Builds the configuration from a parsed pipeline file.
    ///
    /// # Errors
    ///
    /// Fails if a template or key definition is invalid, or if the work-file
    /// template is named but not defined.
    pub fn from_pipeline(
        config: &PipelineConfig,
        clock: Rc<dyn Clock>,
    ) -> Result<Self, WriteNodeError> {
        let registry = TemplateRegistry::from_config(&config.templates)?;
        let resolver = TemplateResolver::new(Arc::new(registry));

        let script_template = match config.settings.template_script_work.as_deref() {
            Some(name) => Some(resolver.resolve(name)?),
            None => {
                warn!("No work-file template configured; render paths cannot be computed");
                None
            }
        };

        let profiles = ProfileTable::new(&config.settings.write_nodes);
        debug!(
            "Configuration for context '{}': {} profiles",
            config.context,
            profiles.len()
        );

        Ok(Self {
            resolver,
            profiles,
            computer: PathComputer::new(
                ContextFieldProvider::new(config.context.clone(), script_template),
                clock,
            ),
        })
    }

    /// Template lookups.
    #[must_use]
    pub const fn resolver(&self) -> &TemplateResolver {
        &self.resolver
    }

    /// Configured profiles.
    #[must_use]
    pub const fn profiles(&self) -> &ProfileTable {
        &self.profiles
    }

    /// The path computer.
    #[must_use]
    pub const fn computer(&self) -> &PathComputer {
        &self.computer
    }

    /// The active context.
    #[must_use]
    pub const fn context(&self) -> &Context {
        self.computer.field_provider().context()
    }

    /// Checks that every template a profile names exists.
    ///
    /// Returns one error per missing template; empty when everything
    /// resolves.
    #[must_use]
    pub fn validate(&self) -> Vec<(String, WriteNodeError)> {
        let mut problems = Vec::new();
        for name in self.profiles.names() {
            let Some(profile) = self.profiles.get(name) else {
                continue;
            };
            for required in [&profile.render_template, &profile.publish_template] {
                if let Err(e) = self.resolver.resolve(required) {
                    problems.push((profile.name.clone(), e));
                }
            }
            for optional in [&profile.proxy_render_template, &profile.proxy_publish_template] {
                if let Err(e) = self.resolver.resolve_optional(optional) {
                    problems.push((profile.name.clone(), e));
                }
            }
        }
        problems
    }
}
