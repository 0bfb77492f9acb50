//! Configuration file parsing.
//!
//! The format is chosen by file extension: `.yml` and `.yaml` are YAML,
//! anything else is TOML. Errors carry the file path as context.

use anyhow::{Context, Result};
use std::path::Path;

use crate::core::WriteNodeError;

/// Reads and deserializes a TOML or YAML configuration file.
///
/// # Errors
///
/// [`WriteNodeError::ConfigNotFound`] if the file does not exist, otherwise
/// the read or parse failure with the file path attached.
pub fn parse_config<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    if !path.exists() {
        return Err(WriteNodeError::ConfigNotFound {
            path: path.display().to_string(),
        }
        .into());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    deserialize(&content, ConfigFormat::from_path(path), &path.display().to_string())
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Serialization formats accepted for configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML
    Toml,
    /// YAML
    Yaml,
}

impl ConfigFormat {
    /// Picks the format from the file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml") => {
                Self::Yaml
            }
            _ => Self::Toml,
        }
    }
}

/// Deserializes configuration text in the given format.
///
/// # Errors
///
/// [`WriteNodeError::ConfigParse`] describing the syntax or shape problem.
pub fn parse_config_str<T>(content: &str, format: ConfigFormat) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let file = match format {
        ConfigFormat::Toml => "TOML configuration",
        ConfigFormat::Yaml => "YAML configuration",
    };
    deserialize(content, format, file)
}

fn deserialize<T>(content: &str, format: ConfigFormat, file: &str) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let parse_error = |reason: String| WriteNodeError::ConfigParse {
        file: file.to_string(),
        reason,
    };
    let parsed = match format {
        ConfigFormat::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string()))?,
        ConfigFormat::Yaml => {
            serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string()))?
        }
    };
    Ok(parsed)
}
