//! The active pipeline context and the fields it contributes to paths.
//!
//! A [`Context`] describes what the artist is working on (project, entity,
//! task, user) as a set of template fields. The [`ContextFieldProvider`]
//! combines it with the fields parsed from the current script path; both are
//! plain reads with no state of their own.

use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::templating::{Fields, Template};

/// The active project/entity/task context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(default)]
pub struct Context {
    /// Human-readable description, e.g. `Shot sh010, Comp`
    pub name: String,
    /// Template fields derived from the context (`Shot`, `Sequence`, `Step`, ...)
    pub fields: Fields,
    /// Filesystem locations of the context's entities, used to split previews
    pub entity_locations: Vec<String>,
}

impl Context {
    /// Context fields restricted to the keys `template` declares.
    #[must_use]
    pub fn as_template_fields(&self, template: &dyn Template) -> Fields {
        self.fields
            .iter()
            .filter(|(key, _)| template.has_key(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "<empty context>")
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// Supplies the fields a render path is built from.
#[derive(Debug, Clone, Default)]
pub struct ContextFieldProvider {
    context: Context,
    script_template: Option<Arc<dyn Template>>,
}

impl ContextFieldProvider {
    /// Creates a provider for `context`, reading script fields through
    /// `script_template` (the work-file template).
    #[must_use]
    pub fn new(context: Context, script_template: Option<Arc<dyn Template>>) -> Self {
        Self {
            context,
            script_template,
        }
    }

    /// The active context.
    #[must_use]
    pub const fn context(&self) -> &Context {
        &self.context
    }

    /// The work-file template, if configured.
    #[must_use]
    pub fn script_template(&self) -> Option<&Arc<dyn Template>> {
        self.script_template.as_ref()
    }

    /// Fields parsed from the current script path.
    ///
    /// Empty when the script was never saved, no work-file template is
    /// configured, or the path does not match it. Callers treat empty as
    /// "cannot compute a path".
    #[must_use]
    pub fn current_script_fields(&self, script_path: Option<&str>) -> Fields {
        let (Some(path), Some(template)) = (script_path, &self.script_template) else {
            trace!("No saved script or no work-file template; script fields are empty");
            return Fields::new();
        };

        match template.extract_fields(path) {
            Ok(fields) => fields,
            Err(e) => {
                debug!("Script '{}' is not a work file: {}", path, e);
                Fields::new()
            }
        }
    }

    /// True if `script_path` is a saved, recognized work file.
    #[must_use]
    pub fn is_work_file(&self, script_path: Option<&str>) -> bool {
        match (script_path, &self.script_template) {
            (Some(path), Some(template)) => template.validate(path),
            _ => false,
        }
    }

    /// Context fields applicable to `template`.
    #[must_use]
    pub fn context_fields(&self, template: &dyn Template) -> Fields {
        self.context.as_template_fields(template)
    }
}
