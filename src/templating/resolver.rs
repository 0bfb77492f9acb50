//! Template lookups by name.

use std::sync::Arc;

use super::{Template, TemplateSource};
use crate::core::WriteNodeError;

/// Resolves template names against a [`TemplateSource`].
///
/// Nothing is cached: configuration can change between calls (a context
/// switch builds a new source), so callers resolve again after every change.
#[derive(Debug, Clone)]
pub struct TemplateResolver {
    source: Arc<dyn TemplateSource>,
}

impl TemplateResolver {
    /// Creates a resolver over `source`.
    #[must_use]
    pub fn new(source: Arc<dyn TemplateSource>) -> Self {
        Self {
            source,
        }
    }

    /// The underlying source.
    #[must_use]
    pub fn source(&self) -> &Arc<dyn TemplateSource> {
        &self.source
    }

    /// Looks up `name`.
    ///
    /// # Errors
    ///
    /// [`WriteNodeError::TemplateNotFound`], with similar names as suggestions.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Template>, WriteNodeError> {
        self.source.template_by_name(name).map_err(WriteNodeError::from)
    }

    /// Looks up `name`, treating an empty name as "not configured".
    ///
    /// # Errors
    ///
    /// As [`resolve`](Self::resolve) for non-empty names.
    pub fn resolve_optional(
        &self,
        name: &str,
    ) -> Result<Option<Arc<dyn Template>>, WriteNodeError> {
        if name.is_empty() {
            return Ok(None);
        }
        self.resolve(name).map(Some)
    }
}
