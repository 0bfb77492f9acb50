//! Enumerating rendered files that match a template.
//!
//! Rendered frames share every field of the render path except the frame
//! number (and view). Discovery globs the filesystem with those keys left as
//! wildcards, then keeps only the hits the template can parse back into the
//! same static fields.

use tracing::{debug, trace};

use super::error::TemplateError;
use super::fields::Fields;
use super::Template;

/// Lists existing files matching `template` with `fields` fixed.
///
/// Keys in `skip_keys` (and keys absent from `fields`) may take any value.
/// The result is sorted and uses forward slashes.
///
/// # Errors
///
/// Returns [`TemplateError::Discovery`] if the glob pattern is invalid.
pub fn find_matching_paths(
    template: &dyn Template,
    fields: &Fields,
    skip_keys: &[&str],
) -> Result<Vec<String>, TemplateError> {
    let pattern = template.glob_pattern(fields, skip_keys)?;
    debug!("Searching for files matching '{}'", pattern);

    let entries = glob::glob(&pattern).map_err(|e| TemplateError::Discovery {
        pattern: pattern.clone(),
        reason: e.to_string(),
    })?;

    let mut matches = Vec::new();
    for entry in entries.filter_map(Result::ok) {
        if !entry.is_file() {
            continue;
        }
        let path = entry.to_string_lossy().replace('\\', "/");
        let Ok(found) = template.extract_fields(&path) else {
            trace!("Skipping '{}': does not match template '{}'", path, template.name());
            continue;
        };

        let agrees = fields
            .iter()
            .filter(|(name, _)| !skip_keys.contains(&name.as_str()))
            .filter(|(name, _)| template.has_key(name))
            .all(|(name, value)| {
                found.get(name).is_none_or(|v| v == value || v.to_string() == value.to_string())
            });
        if agrees {
            matches.push(path);
        } else {
            trace!("Skipping '{}': static fields differ", path);
        }
    }

    matches.sort();
    debug!("Found {} files for template '{}'", matches.len(), template.name());
    Ok(matches)
}
