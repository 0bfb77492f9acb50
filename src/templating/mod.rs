//! Path templating for render outputs.
//!
//! Pipeline configurations describe where files live with named path
//! templates such as:
//!
//! ```text
//! {Shot}/renders/v{version}/{width}x{height}/{Shot}[_{output}].{SEQ}.exr
//! ```
//!
//! This module turns those definitions into something the write-node layer
//! can work with:
//!
//! - [`TemplateKey`]: typed keys (`str`, `int`, `sequence`) with defaults,
//!   choices, filters and padding
//! - [`PathTemplate`]: parsing, path generation ([`Template::apply_fields`])
//!   and the inverse, field extraction ([`Template::extract_fields`])
//! - [`TemplateRegistry`]: every template of one configuration, by name
//! - [`TemplateResolver`]: name lookups that turn misses into
//!   user-facing errors
//! - [`discovery`]: enumerating rendered files that match a template
//!
//! # Traits
//!
//! The write-node layer only ever talks to [`Template`] and
//! [`TemplateSource`]. Tests and alternative template engines plug in there.
//!
//! # Optional sections
//!
//! Text in square brackets is written only when every key inside it has a
//! value. A key that appears only in optional sections is optional:
//!
//! ```
//! use std::collections::BTreeMap;
//! use writenode::templating::{Fields, PathTemplate, Template, TemplateKey};
//!
//! let keys: BTreeMap<_, _> = [TemplateKey::string("Shot"), TemplateKey::string("output")]
//!     .into_iter()
//!     .map(|k| (k.name().to_string(), k))
//!     .collect();
//! let template = PathTemplate::new("t", "/r/{Shot}[_{output}].exr", &keys).unwrap();
//!
//! let mut fields = Fields::new();
//! fields.insert("Shot".into(), "sh010".into());
//! assert_eq!(template.apply_fields(&fields).unwrap(), "/r/sh010.exr");
//! assert!(template.key_is_optional("output"));
//! ```

use std::fmt::Debug;
use std::sync::Arc;

pub mod discovery;
pub mod error;
pub mod fields;
pub mod key;
pub mod path_template;
pub mod registry;
pub mod resolver;

pub use error::TemplateError;
pub use fields::{FieldValue, Fields};
pub use key::{KeyDefinition, KeyType, TemplateKey};
pub use path_template::PathTemplate;
pub use registry::{PathDefinition, TemplateConfig, TemplateRegistry};
pub use resolver::TemplateResolver;

/// A named path template.
pub trait Template: Debug + Send + Sync {
    /// Template name as configured.
    fn name(&self) -> &str;

    /// Full definition, including the storage root.
    fn definition(&self) -> &str;

    /// Key names in order of first appearance.
    fn keys(&self) -> Vec<String>;

    /// True if the template references `key`.
    fn has_key(&self, key: &str) -> bool;

    /// True if `key` appears only inside optional sections.
    fn key_is_optional(&self, key: &str) -> bool;

    /// The default value declared for `key`.
    fn key_default(&self, key: &str) -> Option<FieldValue>;

    /// True if `value` is acceptable for `key`. Unknown keys reject everything.
    fn validate_value(&self, key: &str, value: &FieldValue) -> bool;

    /// Builds a path from `fields`.
    ///
    /// # Errors
    ///
    /// [`TemplateError::MissingFields`] when a required key has neither a value
    /// nor a default, [`TemplateError::InvalidValue`] when a value is rejected.
    fn apply_fields(&self, fields: &Fields) -> Result<String, TemplateError>;

    /// Parses `path` back into fields.
    ///
    /// # Errors
    ///
    /// [`TemplateError::NoMatch`] when the path does not fit the template,
    /// [`TemplateError::InconsistentValue`] when a repeated key disagrees.
    fn extract_fields(&self, path: &str) -> Result<Fields, TemplateError>;

    /// A glob matching every path of this template with `fields` fixed.
    ///
    /// Keys listed in `skip_keys` or missing from `fields` become `*`.
    fn glob_pattern(&self, fields: &Fields, skip_keys: &[&str]) -> Result<String, TemplateError>;

    /// True if `path` can be parsed by this template.
    fn validate(&self, path: &str) -> bool {
        self.extract_fields(path).is_ok()
    }
}

/// Supplies templates by name.
pub trait TemplateSource: Debug + Send + Sync {
    /// Looks up a template.
    ///
    /// # Errors
    ///
    /// [`TemplateError::NotFound`] when no template has that name.
    fn template_by_name(&self, name: &str) -> Result<Arc<dyn Template>, TemplateError>;

    /// Every template name, sorted.
    fn template_names(&self) -> Vec<String>;

    /// Existing files matching `template` with `fields` fixed.
    fn paths_from_template(
        &self,
        template: &dyn Template,
        fields: &Fields,
        skip_keys: &[&str],
    ) -> Result<Vec<String>, TemplateError> {
        discovery::find_matching_paths(template, fields, skip_keys)
    }
}
