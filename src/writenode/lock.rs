//! Lock detection.
//!
//! A cached path is locked when a freshly computed path no longer describes
//! the same output. Both paths are parsed back into fields with the render
//! template and compared, ignoring fields that are expected to drift between
//! runs (resolution and date).

use std::collections::BTreeSet;
use std::fmt;

use crate::constants::VOLATILE_FIELDS;
use crate::templating::Template;

/// Why a cached path is locked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockReason {
    /// No render template is available to compare with.
    NoTemplate,
    /// A path no longer parses with the template: the template's static text
    /// changed or the path was produced elsewhere.
    StaticPartChanged,
    /// Both paths parse but disagree on non-volatile fields.
    FieldsDiverged {
        /// The fields that differ, or that only one path has
        fields: Vec<String>,
    },
}

impl fmt::Display for LockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoTemplate => write!(f, "no render template"),
            Self::StaticPartChanged => write!(f, "the template no longer matches the cached path"),
            Self::FieldsDiverged {
                fields,
            } => write!(f, "fields changed: {}", fields.join(", ")),
        }
    }
}

/// The observable state of one node's path in one resolution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathState {
    /// No path has ever been accepted.
    #[default]
    Uncached,
    /// The cached path reflects the current inputs.
    Valid,
    /// The path could not be computed; the previous cached path (if any) is
    /// surfaced together with a warning.
    ValidWithWarning,
    /// The cached path is retained although the inputs moved on.
    Locked,
}

/// Decides whether `cached_path` is locked against `render_path`.
///
/// An empty cached path is never locked.
#[must_use]
pub fn detect_lock(
    template: Option<&dyn Template>,
    render_path: &str,
    cached_path: &str,
) -> Option<LockReason> {
    let Some(template) = template else {
        return Some(LockReason::NoTemplate);
    };
    if cached_path.is_empty() {
        return None;
    }

    let (Ok(previous), Ok(current)) =
        (template.extract_fields(cached_path), template.extract_fields(render_path))
    else {
        return Some(LockReason::StaticPartChanged);
    };

    let names: BTreeSet<&String> = previous.keys().chain(current.keys()).collect();
    let diverged: Vec<String> = names
        .into_iter()
        .filter(|name| match (previous.get(*name), current.get(*name)) {
            (Some(before), Some(after)) => {
                before != after && !VOLATILE_FIELDS.contains(&name.as_str())
            }
            _ => true,
        })
        .cloned()
        .collect();

    if diverged.is_empty() {
        None
    } else {
        Some(LockReason::FieldsDiverged {
            fields: diverged,
        })
    }
}
