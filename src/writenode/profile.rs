//! Write-node profiles.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::warn;

use crate::config::ProfileDefinition;
use crate::constants::DEFAULT_TILE_COLOR;

/// A named bundle of templates and encoder settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    /// Profile name
    pub name: String,
    /// Full-resolution render template name
    pub render_template: String,
    /// Full-resolution publish template name
    pub publish_template: String,
    /// Proxy render template name; empty when not configured
    pub proxy_render_template: String,
    /// Proxy publish template name; empty when not configured
    pub proxy_publish_template: String,
    /// Encoder file type
    pub file_type: String,
    /// Encoder settings
    pub file_settings: BTreeMap<String, Value>,
    /// RGB colour as configured
    pub tile_color: Option<Vec<i64>>,
    /// Encoder knobs promoted onto the node
    pub promote_write_knobs: Vec<String>,
    /// Published file type
    pub published_file_type: Option<String>,
}

impl From<&ProfileDefinition> for Profile {
    fn from(def: &ProfileDefinition) -> Self {
        Self {
            name: def.name.clone(),
            render_template: def.render_template.clone(),
            publish_template: def.publish_template.clone(),
            proxy_render_template: def.proxy_render_template.clone(),
            proxy_publish_template: def.proxy_publish_template.clone(),
            file_type: def.file_type.clone(),
            file_settings: def.settings.clone(),
            tile_color: def.tile_color.clone(),
            promote_write_knobs: def.promote_write_knobs.clone(),
            published_file_type: def.published_file_type.clone(),
        }
    }
}

impl Profile {
    /// The node colour packed as `0xRRGGBB00`.
    ///
    /// Components are clamped to `0..=255`. Anything but exactly three
    /// components logs a warning (unless absent) and yields the default.
    #[must_use]
    pub fn packed_tile_color(&self) -> i64 {
        match self.tile_color.as_deref() {
            Some(rgb) if rgb.len() == 3 => rgb
                .iter()
                .fold(0_i64, |packed, component| (packed + (*component).clamp(0, 255)) << 8),
            Some(_) => {
                warn!(
                    "The tile_color setting for profile '{}' must contain 3 values (RGB) - this setting will be ignored!",
                    self.name
                );
                DEFAULT_TILE_COLOR
            }
            None => DEFAULT_TILE_COLOR,
        }
    }
}

/// Every configured profile, in configuration order.
///
/// Built once per configuration and never mutated; a configuration change
/// builds a new table.
#[derive(Debug, Clone, Default)]
pub struct ProfileTable {
    names: Vec<String>,
    profiles: HashMap<String, Arc<Profile>>,
}

impl ProfileTable {
    /// Builds the table. Later profiles reusing a name are dropped with a
    /// warning.
    #[must_use]
    pub fn new(definitions: &[ProfileDefinition]) -> Self {
        let mut table = Self::default();
        for def in definitions {
            if table.profiles.contains_key(&def.name) {
                warn!(
                    "Configuration contains multiple Write Node profiles called '{}'! Only the first will be available",
                    def.name
                );
                continue;
            }
            table.names.push(def.name.clone());
            table.profiles.insert(def.name.clone(), Arc::new(Profile::from(def)));
        }
        table
    }

    /// Profile names in configuration order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Looks up a profile.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<Profile>> {
        self.profiles.get(name).cloned()
    }

    /// True if a profile has this name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    /// The first profile, used for nodes that never had one.
    #[must_use]
    pub fn first(&self) -> Option<Arc<Profile>> {
        self.names.first().and_then(|n| self.get(n))
    }

    /// Number of profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True when no profiles are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
