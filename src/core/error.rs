//! Error handling for writenode.
//!
//! Errors come in three layers:
//!
//! - [`TemplateError`] from the templating collaborator
//! - [`PathComputationError`] from the path computer; always recoverable, the
//!   caller falls back to the cached path and shows the message as a warning
//! - [`WriteNodeError`] for everything a caller of the library can see
//!
//! The CLI works with [`anyhow::Error`] and converts failures with
//! [`user_friendly_error`] into an [`ErrorContext`], which prints the error,
//! optional details and an actionable suggestion in colour.
//!
//! ```rust,no_run
//! use writenode::core::{WriteNodeError, user_friendly_error};
//!
//! let error = anyhow::Error::from(WriteNodeError::ScriptNotSaved);
//! user_friendly_error(error).display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

use crate::templating::TemplateError;

/// Why a render path could not be computed.
///
/// The messages are shown verbatim on the node, so they are written for
/// artists rather than developers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathComputationError {
    /// The profile does not name a usable template for this resolution mode.
    #[error("Unable to determine the render template for this node!")]
    MissingTemplate,

    /// The script was never saved, or its path does not match the work-file
    /// template.
    #[error("The current script is not a recognized work file!")]
    NotAWorkFile,

    /// The template needs an output name and none is set.
    #[error("A valid output name is required by this profile for the '{key}' field!")]
    OutputNameRequired {
        /// `output` or the legacy `channel`
        key: String,
    },

    /// The output name fails the key's validation.
    #[error("The output name '{name}' contains illegal characters!")]
    IllegalOutputName {
        /// The rejected name
        name: String,
    },

    /// The template could not be applied to the assembled fields.
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Errors surfaced by the write-node library.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WriteNodeError {
    /// A profile or setting references a template that does not exist.
    #[error("Template '{name}' could not be found")]
    TemplateNotFound {
        /// The requested template name
        name: String,
        /// Similar names that do exist
        suggestions: Vec<String>,
    },

    /// The templating collaborator failed.
    #[error(transparent)]
    Template(TemplateError),

    /// A render path could not be computed.
    #[error(transparent)]
    PathComputation(#[from] PathComputationError),

    /// No profile with this name is configured.
    #[error("Write node profile '{name}' is not configured")]
    ProfileNotFound {
        /// The requested profile
        name: String,
        /// Profiles that are configured
        available: Vec<String>,
    },

    /// The host has no node with this identity.
    #[error("Node {node} does not exist")]
    NodeNotFound {
        /// Node identity as displayed
        node: String,
    },

    /// The script has never been saved.
    #[error("Please save the script before creating write nodes")]
    ScriptNotSaved,

    /// The script is saved outside the work area.
    #[error("The current script is not a work file: {path}")]
    NotAWorkFile {
        /// Path of the current script
        path: String,
    },

    /// A path cannot be read back with its template, so its files cannot be
    /// listed.
    #[error("Unable to resolve files on disk: '{path}' does not match template '{template}'")]
    UnresolvedPath {
        /// The render path
        path: String,
        /// The template it was checked against
        template: String,
    },

    /// The configuration file does not exist.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The configuration path
        path: String,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse {file}: {reason}")]
    ConfigParse {
        /// The configuration file
        file: String,
        /// Parser message
        reason: String,
    },

    /// Anything else.
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl From<TemplateError> for WriteNodeError {
    fn from(error: TemplateError) -> Self {
        match error {
            TemplateError::NotFound {
                name,
                suggestions,
            } => Self::TemplateNotFound {
                name,
                suggestions,
            },
            other => Self::Template(other),
        }
    }
}

/// An error paired with optional details and a suggestion for the user.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: WriteNodeError,
    /// How to fix it
    pub suggestion: Option<String>,
    /// Background on why it happened
    pub details: Option<String>,
}

impl ErrorContext {
    /// Wraps an error with no suggestion or details.
    #[must_use]
    pub const fn new(error: WriteNodeError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Adds a suggestion, shown in green.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Adds details, shown in yellow.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Prints the error to stderr with terminal colours.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Converts any error into an [`ErrorContext`] with a suggestion where one is
/// known.
///
/// The error chain is searched for [`WriteNodeError`], [`PathComputationError`]
/// and [`TemplateError`] first, then for I/O and parser errors. Anything else
/// keeps its message and full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    for cause in error.chain() {
        if let Some(e) = cause.downcast_ref::<WriteNodeError>() {
            return create_error_context(e.clone());
        }
        if let Some(e) = cause.downcast_ref::<PathComputationError>() {
            return create_error_context(WriteNodeError::PathComputation(e.clone()));
        }
        if let Some(e) = cause.downcast_ref::<TemplateError>() {
            return create_error_context(WriteNodeError::from(e.clone()));
        }
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        if io_error.kind() == std::io::ErrorKind::NotFound {
            return ErrorContext::new(WriteNodeError::Other {
                message: io_error.to_string(),
            })
            .with_suggestion("Check that the file or directory exists and the path is correct");
        }
    }

    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }
    ErrorContext::new(WriteNodeError::Other {
        message,
    })
}

fn create_error_context(error: WriteNodeError) -> ErrorContext {
    match &error {
        WriteNodeError::TemplateNotFound {
            suggestions,
            ..
        } => {
            let context = ErrorContext::new(error.clone()).with_details(
                "Every template named by a write node profile must be defined under 'paths'",
            );
            if suggestions.is_empty() {
                context.with_suggestion("Add the template to the configuration or fix the profile")
            } else {
                context.with_suggestion(format!("Did you mean: {}?", suggestions.join(", ")))
            }
        }
        WriteNodeError::ProfileNotFound {
            available,
            ..
        } => {
            let context = ErrorContext::new(error.clone());
            if available.is_empty() {
                context.with_suggestion("Add a profile under 'settings.write_nodes'")
            } else {
                context.with_suggestion(format!("Available profiles: {}", available.join(", ")))
            }
        }
        WriteNodeError::ScriptNotSaved => ErrorContext::new(error)
            .with_suggestion("Save the script into the work area, then create the node again"),
        WriteNodeError::NotAWorkFile {
            ..
        }
        | WriteNodeError::PathComputation(PathComputationError::NotAWorkFile) => {
            ErrorContext::new(error)
                .with_suggestion("Save the script with a name that matches 'template_script_work'")
                .with_details("Render paths are built from fields read out of the script's path")
        }
        WriteNodeError::PathComputation(PathComputationError::IllegalOutputName {
            ..
        }) => ErrorContext::new(error).with_suggestion(
            "Use only the characters the output key allows; path separators are never allowed",
        ),
        WriteNodeError::PathComputation(PathComputationError::OutputNameRequired {
            ..
        }) => ErrorContext::new(error).with_suggestion("Pass an output name with --output"),
        WriteNodeError::UnresolvedPath {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Reset the render path so it is rebuilt from the current template"),
        WriteNodeError::ConfigNotFound {
            ..
        } => ErrorContext::new(error).with_suggestion("Check the path passed with --config"),
        WriteNodeError::ConfigParse {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check the syntax of the configuration file")
            .with_details("Configuration files may be TOML (.toml) or YAML (.yml, .yaml)"),
        WriteNodeError::Template(TemplateError::UnknownKey {
            ..
        }) => ErrorContext::new(error).with_suggestion("Declare the key under 'keys'"),
        _ => ErrorContext::new(error),
    }
}
