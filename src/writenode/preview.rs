//! Path preview: splitting a render path for display.
//!
//! For `/mnt/proj/shotXYZ/renders/v003/hello.%04d.exr` inside the entity
//! location `/mnt/proj/shotXYZ` the preview is:
//!
//! - context: `/mnt/proj/shotXYZ`
//! - local: `renders/v003`
//! - file name: `hello.%04d.exr`
//!
//! Without a matching entity location the whole directory is the context.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use tracing::trace;

use crate::context::Context;

/// The three parts of a previewed path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathPreview {
    /// Entity location the path lives in
    pub context: String,
    /// Directories below the entity location
    pub local: String,
    /// File name
    pub file_name: String,
}

impl PathPreview {
    /// Splits `path` against `context`'s entity locations.
    #[must_use]
    pub fn split(path: &str, context: &Context) -> Self {
        let normalized = path.replace('\\', "/");
        let (dir, file_name) = match normalized.rfind('/') {
            Some(i) => (&normalized[..i], &normalized[i + 1..]),
            None => ("", normalized.as_str()),
        };

        let location = context
            .entity_locations
            .iter()
            .map(|l| l.replace('\\', "/"))
            .filter(|l| dir.starts_with(l.as_str()))
            .max_by_key(String::len);

        match location {
            Some(location) => Self {
                local: dir[location.len()..].trim_start_matches('/').to_string(),
                context: location,
                file_name: file_name.to_string(),
            },
            None => Self {
                context: dir.to_string(),
                local: String::new(),
                file_name: file_name.to_string(),
            },
        }
    }
}

/// Memoizes previews per (path, context).
#[derive(Debug, Default)]
pub struct PreviewCache {
    entries: RefCell<HashMap<(String, Context), PathPreview>>,
    hits: Cell<usize>,
    misses: Cell<usize>,
}

impl PreviewCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The preview of `path` under `context`.
    pub fn preview(&self, path: &str, context: &Context) -> PathPreview {
        let key = (path.to_string(), context.clone());
        if let Some(preview) = self.entries.borrow().get(&key) {
            self.hits.set(self.hits.get() + 1);
            return preview.clone();
        }

        self.misses.set(self.misses.get() + 1);
        let preview = PathPreview::split(path, context);
        trace!("Path preview for '{}': {:?}", path, preview);
        self.entries.borrow_mut().insert(key, preview.clone());
        preview
    }

    /// Drops every entry and resets the statistics.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
        self.hits.set(0);
        self.misses.set(0);
    }

    /// `(hits, misses)` since creation or the last clear.
    #[must_use]
    pub fn stats(&self) -> (usize, usize) {
        (self.hits.get(), self.misses.get())
    }
}
