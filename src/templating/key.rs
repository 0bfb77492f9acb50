//! Typed template keys.
//!
//! A key gives a template field its rules: what a valid value looks like,
//! how it is written into a path, and how it is read back out of one. Three
//! kinds exist:
//!
//! - **str** - free text without path separators, optionally restricted by
//!   `filter_by` (`alphanumeric`, `alpha`, or a regular expression) or `choices`
//! - **int** - non-negative integers, zero padded by `format_spec` (`"03"` gives `007`)
//! - **sequence** - frame numbers or frame placeholders; `FORMAT: %d` expands to
//!   `%04d` for a `format_spec` of `"04"`
//!
//! ```yaml
//! keys:
//!   Shot: { type: str }
//!   version: { type: int, format_spec: "03" }
//!   SEQ: { type: sequence, format_spec: "04" }
//!   output: { type: str, filter_by: alphanumeric, default: main }
//! ```

use regex::Regex;
use serde::Deserialize;

use super::error::TemplateError;
use super::fields::FieldValue;

/// Kind of a template key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum KeyType {
    /// Free text.
    #[serde(rename = "str", alias = "string")]
    Str,
    /// Non-negative integer.
    #[serde(rename = "int", alias = "integer")]
    Int,
    /// Frame number or frame placeholder.
    #[serde(rename = "sequence")]
    Sequence,
}

/// Key declaration as it appears in configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyDefinition {
    /// Kind of the key
    #[serde(rename = "type")]
    pub key_type: KeyType,
    /// Value used when a required key is missing from the field set
    #[serde(default)]
    pub default: Option<FieldValue>,
    /// Exhaustive list of accepted values (empty means unrestricted)
    #[serde(default)]
    pub choices: Vec<FieldValue>,
    /// Character restriction for string keys
    #[serde(default)]
    pub filter_by: Option<String>,
    /// Padding for int and sequence keys, e.g. `"03"`
    #[serde(default)]
    pub format_spec: Option<String>,
}

/// Character restriction on string values.
#[derive(Debug, Clone)]
pub enum KeyFilter {
    /// ASCII letters and digits only.
    Alphanumeric,
    /// ASCII letters only.
    Alpha,
    /// The whole value must match this expression.
    Pattern(Regex),
}

impl KeyFilter {
    fn parse(key: &str, spec: &str) -> Result<Self, TemplateError> {
        match spec {
            "alphanumeric" => Ok(Self::Alphanumeric),
            "alpha" => Ok(Self::Alpha),
            pattern => Regex::new(&format!("^(?:{pattern})$")).map(Self::Pattern).map_err(|e| {
                TemplateError::InvalidKey {
                    key: key.to_string(),
                    reason: format!("invalid filter_by expression: {e}"),
                }
            }),
        }
    }

    fn accepts(&self, value: &str) -> bool {
        match self {
            Self::Alphanumeric => value.chars().all(|c| c.is_ascii_alphanumeric()),
            Self::Alpha => value.chars().all(|c| c.is_ascii_alphabetic()),
            Self::Pattern(re) => re.is_match(value),
        }
    }

    fn regex_fragment(&self) -> &'static str {
        match self {
            Self::Alphanumeric => "[A-Za-z0-9]+",
            Self::Alpha => "[A-Za-z]+",
            Self::Pattern(_) => r"[^/\\]+?",
        }
    }
}

/// A fully parsed template key.
#[derive(Debug, Clone)]
pub struct TemplateKey {
    name: String,
    key_type: KeyType,
    default: Option<FieldValue>,
    choices: Vec<FieldValue>,
    filter: Option<KeyFilter>,
    padding: Option<usize>,
}

const SEQUENCE_FORMAT_PREFIX: &str = "FORMAT:";

impl TemplateKey {
    /// Creates an unrestricted string key.
    #[must_use]
    pub fn string(name: impl Into<String>) -> Self {
        Self::bare(name, KeyType::Str)
    }

    /// Creates an integer key, zero padded to `padding` digits when given.
    #[must_use]
    pub fn integer(name: impl Into<String>, padding: Option<usize>) -> Self {
        Self {
            padding,
            ..Self::bare(name, KeyType::Int)
        }
    }

    /// Creates a frame sequence key, padded to `padding` digits when given.
    #[must_use]
    pub fn sequence(name: impl Into<String>, padding: Option<usize>) -> Self {
        Self {
            padding,
            ..Self::bare(name, KeyType::Sequence)
        }
    }

    fn bare(name: impl Into<String>, key_type: KeyType) -> Self {
        Self {
            name: name.into(),
            key_type,
            default: None,
            choices: Vec::new(),
            filter: None,
            padding: None,
        }
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<FieldValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Restricts the key to a fixed list of values.
    #[must_use]
    pub fn with_choices<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    /// Restricts string values to ASCII letters and digits.
    #[must_use]
    pub fn alphanumeric(mut self) -> Self {
        self.filter = Some(KeyFilter::Alphanumeric);
        self
    }

    /// Builds a key from its configuration entry.
    pub fn from_definition(name: &str, def: &KeyDefinition) -> Result<Self, TemplateError> {
        let filter = match (&def.filter_by, def.key_type) {
            (Some(spec), KeyType::Str) => Some(KeyFilter::parse(name, spec)?),
            (Some(_), _) => {
                return Err(TemplateError::InvalidKey {
                    key: name.to_string(),
                    reason: "filter_by is only supported on str keys".to_string(),
                });
            }
            (None, _) => None,
        };

        let padding = match &def.format_spec {
            Some(spec) => Some(spec.trim().parse::<usize>().map_err(|_| {
                TemplateError::InvalidKey {
                    key: name.to_string(),
                    reason: format!("format_spec '{spec}' is not a digit count"),
                }
            })?),
            None => None,
        };

        let key = Self {
            name: name.to_string(),
            key_type: def.key_type,
            default: None,
            choices: def.choices.clone(),
            filter,
            padding,
        };

        if let Some(default) = &def.default {
            key.validate(default)?;
        }

        Ok(Self {
            default: def.default.clone(),
            ..key
        })
    }

    /// Key name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key kind.
    #[must_use]
    pub const fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Default value, if declared.
    #[must_use]
    pub const fn default_value(&self) -> Option<&FieldValue> {
        self.default.as_ref()
    }

    fn invalid(&self, value: &FieldValue, reason: impl Into<String>) -> TemplateError {
        TemplateError::InvalidValue {
            key: self.name.clone(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Checks a value against the key's rules.
    pub fn validate(&self, value: &FieldValue) -> Result<(), TemplateError> {
        self.normalize(value).map(|_| ())
    }

    /// Validates a value and converts it to the key's canonical type.
    fn normalize(&self, value: &FieldValue) -> Result<FieldValue, TemplateError> {
        let canonical = match self.key_type {
            KeyType::Str => {
                let text = value.to_string();
                if text.is_empty() {
                    return Err(self.invalid(value, "value is empty"));
                }
                if text.contains(&['/', '\\'][..]) {
                    return Err(self.invalid(value, "value contains a path separator"));
                }
                if let Some(filter) = &self.filter {
                    if !filter.accepts(&text) {
                        return Err(self.invalid(value, "value contains illegal characters"));
                    }
                }
                FieldValue::Str(text)
            }
            KeyType::Int => match value {
                FieldValue::Int(v) if *v >= 0 => FieldValue::Int(*v),
                FieldValue::Int(_) => return Err(self.invalid(value, "value is negative")),
                FieldValue::Str(s) => match s.parse::<i64>() {
                    Ok(v) if v >= 0 && s.chars().all(|c| c.is_ascii_digit()) => FieldValue::Int(v),
                    _ => return Err(self.invalid(value, "value is not an integer")),
                },
            },
            KeyType::Sequence => match value {
                FieldValue::Int(v) if *v >= 0 => FieldValue::Int(*v),
                FieldValue::Int(_) => return Err(self.invalid(value, "frame is negative")),
                FieldValue::Str(s) if s.chars().all(|c| c.is_ascii_digit()) && !s.is_empty() => {
                    s.parse::<i64>().map(FieldValue::Int).map_err(|_| {
                        self.invalid(value, "frame number is out of range")
                    })?
                }
                FieldValue::Str(s) if is_format_request(s) || is_frame_token(s) => value.clone(),
                FieldValue::Str(_) => {
                    return Err(self.invalid(value, "not a frame number or frame placeholder"));
                }
            },
        };

        if !self.choices.is_empty() {
            let rendered = canonical.to_string();
            if !self.choices.iter().any(|c| c.to_string() == rendered) {
                return Err(self.invalid(value, "value is not one of the allowed choices"));
            }
        }

        Ok(canonical)
    }

    /// Renders a value as it appears inside a path.
    pub fn format(&self, value: &FieldValue) -> Result<String, TemplateError> {
        let canonical = self.normalize(value)?;
        let padded = |v: i64| match self.padding {
            Some(width) => format!("{v:0width$}"),
            None => v.to_string(),
        };

        Ok(match (self.key_type, canonical) {
            (_, FieldValue::Int(v)) => padded(v),
            (KeyType::Sequence, FieldValue::Str(s)) => self.expand_frame_format(&s),
            (_, FieldValue::Str(s)) => s,
        })
    }

    /// Turns `FORMAT: <spec>` into a concrete frame placeholder.
    fn expand_frame_format(&self, value: &str) -> String {
        let Some(spec) = value.strip_prefix(SEQUENCE_FORMAT_PREFIX) else {
            return value.to_string();
        };
        let width = self.padding.unwrap_or(1).max(1);
        match spec.trim() {
            "%d" => match self.padding {
                Some(p) => format!("%0{p}d"),
                None => "%d".to_string(),
            },
            "#" => "#".repeat(width),
            "@" => "@".repeat(width),
            "$F" => match self.padding {
                Some(p) => format!("$F{p}"),
                None => "$F".to_string(),
            },
            other => other.to_string(),
        }
    }

    /// Parses a value captured from a path.
    pub fn parse(&self, text: &str) -> Result<FieldValue, TemplateError> {
        self.normalize(&FieldValue::Str(text.to_string()))
    }

    /// Regular expression matching this key's values inside a path.
    #[must_use]
    pub fn regex_fragment(&self) -> String {
        if !self.choices.is_empty() {
            let mut choices: Vec<String> = self
                .choices
                .iter()
                .map(|c| match (self.key_type, c) {
                    (KeyType::Int | KeyType::Sequence, FieldValue::Int(v)) => match self.padding {
                        Some(width) => format!("{v:0width$}"),
                        None => v.to_string(),
                    },
                    _ => c.to_string(),
                })
                .collect();
            // longest first so a choice never shadows a longer one sharing its prefix
            choices.sort_by_key(|c| std::cmp::Reverse(c.len()));
            let alternatives: Vec<String> = choices.iter().map(|c| regex::escape(c)).collect();
            return format!("(?:{})", alternatives.join("|"));
        }

        match self.key_type {
            KeyType::Str => self
                .filter
                .as_ref()
                .map_or(r"[^/\\]+?", KeyFilter::regex_fragment)
                .to_string(),
            KeyType::Int => r"\d+".to_string(),
            KeyType::Sequence => r"(?:\d+|%0\d+d|%d|#+|@+|\$F\d*)".to_string(),
        }
    }
}

fn is_format_request(value: &str) -> bool {
    value
        .strip_prefix(SEQUENCE_FORMAT_PREFIX)
        .is_some_and(|spec| matches!(spec.trim(), "%d" | "#" | "@" | "$F"))
}

fn is_frame_token(value: &str) -> bool {
    if value == "%d" {
        return true;
    }
    if let Some(digits) = value.strip_prefix("%0").and_then(|v| v.strip_suffix('d')) {
        return !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit());
    }
    if let Some(digits) = value.strip_prefix("$F") {
        return digits.chars().all(|c| c.is_ascii_digit());
    }
    !value.is_empty() && (value.chars().all(|c| c == '#') || value.chars().all(|c| c == '@'))
}
