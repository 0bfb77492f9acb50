//! Errors raised by the path-template engine.

use thiserror::Error;

/// Failures of template parsing, path generation and field extraction.
///
/// The type is `Clone` so a recorded failure can be replayed later without
/// recomputing it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// No template with this name exists in the configuration.
    #[error("Template '{name}' is not defined in the current configuration")]
    NotFound {
        /// The requested template name
        name: String,
        /// Similar template names that do exist
        suggestions: Vec<String>,
    },

    /// The template definition could not be parsed.
    #[error("Invalid template definition '{definition}': {reason}")]
    InvalidDefinition {
        /// The offending definition string
        definition: String,
        /// What is wrong with it
        reason: String,
    },

    /// The definition references a key that is not declared.
    #[error("Template '{template}' references undeclared key '{key}'")]
    UnknownKey {
        /// Template name
        template: String,
        /// The undeclared key
        key: String,
    },

    /// The template names a storage root that is not configured.
    #[error("Template '{template}' uses unknown storage root '{root}'")]
    UnknownRoot {
        /// Template name
        template: String,
        /// The missing root name
        root: String,
    },

    /// A key definition is malformed.
    #[error("Invalid definition for key '{key}': {reason}")]
    InvalidKey {
        /// Key name
        key: String,
        /// What is wrong with it
        reason: String,
    },

    /// Required fields were not supplied when building a path.
    #[error(
        "Cannot build a path from template '{template}': missing required fields {}",
        .missing.join(", ")
    )]
    MissingFields {
        /// Template name
        template: String,
        /// Names of the missing required keys
        missing: Vec<String>,
    },

    /// A value is not acceptable for a key.
    #[error("'{value}' is not a valid value for key '{key}': {reason}")]
    InvalidValue {
        /// Key name
        key: String,
        /// The rejected value
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// A path does not match the template.
    #[error("Path '{path}' does not match template '{template}'")]
    NoMatch {
        /// Template name
        template: String,
        /// The path that failed to match
        path: String,
    },

    /// A key that occurs several times captured different values.
    #[error(
        "Path '{path}' has conflicting values for key '{key}' in template '{template}': '{first}' and '{second}'"
    )]
    InconsistentValue {
        /// Template name
        template: String,
        /// The path being parsed
        path: String,
        /// Repeated key
        key: String,
        /// First captured value
        first: String,
        /// Conflicting captured value
        second: String,
    },

    /// Enumerating files on disk failed.
    #[error("Failed to search for files matching '{pattern}': {reason}")]
    Discovery {
        /// Glob pattern that was searched
        pattern: String,
        /// Underlying failure
        reason: String,
    },
}
