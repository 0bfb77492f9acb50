//! Path templates: parsing, path generation and field extraction.
//!
//! A definition mixes literal text, `{key}` references and optional sections
//! in square brackets:
//!
//! ```text
//! /proj/{Shot}/renders/v{version}/{Shot}[_{output}].{SEQ}.exr
//! ```
//!
//! A key that appears only inside optional sections is optional. An optional
//! section is written only when every key in it has a value.
//!
//! Extraction first screens a path with an anchored regular expression
//! compiled from the definition. It then walks the definition, typing every
//! value through its key, until it finds a reading in which repeated keys
//! agree. `sh_010/.../sh_010.0001.dpx` against `{Shot}/.../{Shot}[_{output}]...`
//! reads as `Shot=sh_010` with no output, not as `Shot=sh`.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

use super::error::TemplateError;
use super::fields::{FieldValue, Fields};
use super::key::TemplateKey;
use super::Template;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Key(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Part(Part),
    Optional(Vec<Part>),
}

/// A parsed, compiled path template.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    name: String,
    definition: String,
    pieces: Vec<Piece>,
    keys: BTreeMap<String, TemplateKey>,
    ordered_keys: Vec<String>,
    optional_keys: BTreeSet<String>,
    matcher: Regex,
    group_keys: Vec<String>,
}

impl PathTemplate {
    /// Parses `definition` and binds its key references to `key_defs`.
    ///
    /// # Errors
    ///
    /// Fails on unbalanced braces or brackets, nested optional sections,
    /// empty key names, and keys missing from `key_defs`.
    pub fn new(
        name: impl Into<String>,
        definition: impl Into<String>,
        key_defs: &BTreeMap<String, TemplateKey>,
    ) -> Result<Self, TemplateError> {
        let name = name.into();
        let definition = definition.into().replace('\\', "/");
        let pieces = parse_definition(&definition)?;

        let mut keys = BTreeMap::new();
        let mut ordered_keys = Vec::new();
        let mut required = BTreeSet::new();
        let mut seen_in_optional = BTreeSet::new();

        let mut bind = |key_name: &str, optional: bool| -> Result<(), TemplateError> {
            let key = key_defs.get(key_name).ok_or_else(|| TemplateError::UnknownKey {
                template: name.clone(),
                key: key_name.to_string(),
            })?;
            if !keys.contains_key(key_name) {
                ordered_keys.push(key_name.to_string());
                keys.insert(key_name.to_string(), key.clone());
            }
            if optional {
                seen_in_optional.insert(key_name.to_string());
            } else {
                required.insert(key_name.to_string());
            }
            Ok(())
        };

        for piece in &pieces {
            match piece {
                Piece::Part(Part::Key(k)) => bind(k, false)?,
                Piece::Optional(parts) => {
                    for part in parts {
                        if let Part::Key(k) = part {
                            bind(k, true)?;
                        }
                    }
                }
                Piece::Part(Part::Literal(_)) => {}
            }
        }

        let optional_keys = seen_in_optional.difference(&required).cloned().collect();
        let (matcher, group_keys) = compile_matcher(&definition, &pieces, &keys)?;

        Ok(Self {
            name,
            definition,
            pieces,
            keys,
            ordered_keys,
            optional_keys,
            matcher,
            group_keys,
        })
    }

    /// The key definition bound to `name`, if the template uses it.
    #[must_use]
    pub fn key(&self, name: &str) -> Option<&TemplateKey> {
        self.keys.get(name)
    }

    /// Reads `text` against `pieces`, trying optional sections before
    /// skipping them and shorter key values before longer ones. Repeated keys
    /// must agree.
    fn match_pieces(&self, text: &str, pieces: &[Piece], fields: Fields) -> Option<Fields> {
        let Some((piece, rest)) = pieces.split_first() else {
            return text.is_empty().then_some(fields);
        };
        match piece {
            Piece::Part(part) => self.match_parts(text, std::slice::from_ref(part), rest, fields),
            Piece::Optional(parts) => self
                .match_parts(text, parts, rest, fields.clone())
                .or_else(|| self.match_pieces(text, rest, fields)),
        }
    }

    fn match_parts(
        &self,
        text: &str,
        parts: &[Part],
        rest: &[Piece],
        fields: Fields,
    ) -> Option<Fields> {
        let Some((part, remaining)) = parts.split_first() else {
            return self.match_pieces(text, rest, fields);
        };
        match part {
            Part::Literal(literal) => {
                let tail = text.strip_prefix(literal.as_str())?;
                self.match_parts(tail, remaining, rest, fields)
            }
            Part::Key(key_name) => {
                let key = self.keys.get(key_name)?;
                let limit = text.find('/').unwrap_or(text.len());
                let ends = text[..limit]
                    .char_indices()
                    .skip(1)
                    .map(|(i, _)| i)
                    .chain(std::iter::once(limit))
                    .filter(|end| *end > 0);

                for end in ends {
                    let Ok(value) = key.parse(&text[..end]) else {
                        continue;
                    };
                    let mut candidate = fields.clone();
                    match candidate.get(key_name) {
                        Some(previous) if previous != &value => continue,
                        Some(_) => {}
                        None => {
                            candidate.insert(key_name.clone(), value);
                        }
                    }
                    let found = self.match_parts(&text[end..], remaining, rest, candidate);
                    if found.is_some() {
                        return found;
                    }
                }
                None
            }
        }
    }

    fn format_part(&self, key_name: &str, value: &FieldValue) -> Result<String, TemplateError> {
        match self.keys.get(key_name) {
            Some(key) => key.format(value),
            None => Err(TemplateError::UnknownKey {
                template: self.name.clone(),
                key: key_name.to_string(),
            }),
        }
    }
}

impl Template for PathTemplate {
    fn name(&self) -> &str {
        &self.name
    }

    fn definition(&self) -> &str {
        &self.definition
    }

    fn keys(&self) -> Vec<String> {
        self.ordered_keys.clone()
    }

    fn has_key(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    fn key_is_optional(&self, key: &str) -> bool {
        self.optional_keys.contains(key)
    }

    fn key_default(&self, key: &str) -> Option<FieldValue> {
        self.keys.get(key).and_then(|k| k.default_value().cloned())
    }

    fn validate_value(&self, key: &str, value: &FieldValue) -> bool {
        self.keys.get(key).is_some_and(|k| k.validate(value).is_ok())
    }

    fn apply_fields(&self, fields: &Fields) -> Result<String, TemplateError> {
        let missing: Vec<String> = self
            .ordered_keys
            .iter()
            .filter(|k| !self.optional_keys.contains(*k))
            .filter(|k| !fields.contains_key(*k) && self.key_default(k).is_none())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(TemplateError::MissingFields {
                template: self.name.clone(),
                missing,
            });
        }

        let mut path = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Part(Part::Literal(text)) => path.push_str(text),
                Piece::Part(Part::Key(k)) => {
                    let value = match fields.get(k) {
                        Some(v) => v.clone(),
                        None => self.key_default(k).ok_or_else(|| TemplateError::MissingFields {
                            template: self.name.clone(),
                            missing: vec![k.clone()],
                        })?,
                    };
                    path.push_str(&self.format_part(k, &value)?);
                }
                Piece::Optional(parts) => {
                    let complete = parts.iter().all(|p| match p {
                        Part::Key(k) => fields.contains_key(k),
                        Part::Literal(_) => true,
                    });
                    if !complete {
                        continue;
                    }
                    for part in parts {
                        match part {
                            Part::Literal(text) => path.push_str(text),
                            Part::Key(k) => {
                                if let Some(value) = fields.get(k) {
                                    path.push_str(&self.format_part(k, value)?);
                                }
                            }
                        }
                    }
                }
            }
        }

        trace!("Applied fields to template '{}': {}", self.name, path);
        Ok(path)
    }

    fn extract_fields(&self, path: &str) -> Result<Fields, TemplateError> {
        let normalized = path.replace('\\', "/");
        let no_match = || TemplateError::NoMatch {
            template: self.name.clone(),
            path: path.to_string(),
        };

        let captures = self.matcher.captures(&normalized).ok_or_else(no_match)?;

        if let Some(fields) = self.match_pieces(&normalized, &self.pieces, Fields::new()) {
            return Ok(fields);
        }

        // No reading of the path agrees on every key; report the first
        // conflict of the leftmost match.
        let mut fields = Fields::new();
        for (index, key_name) in self.group_keys.iter().enumerate() {
            let Some(capture) = captures.get(index + 1) else {
                continue;
            };
            let key = self.keys.get(key_name).ok_or_else(no_match)?;
            let value = key.parse(capture.as_str()).map_err(|_| no_match())?;

            if let Some(previous) = fields.get(key_name) {
                if previous != &value {
                    return Err(TemplateError::InconsistentValue {
                        template: self.name.clone(),
                        path: path.to_string(),
                        key: key_name.clone(),
                        first: previous.to_string(),
                        second: value.to_string(),
                    });
                }
                continue;
            }
            fields.insert(key_name.clone(), value);
        }

        Err(no_match())
    }

    fn glob_pattern(&self, fields: &Fields, skip_keys: &[&str]) -> Result<String, TemplateError> {
        let render = |key_name: &str| -> Result<String, TemplateError> {
            if skip_keys.contains(&key_name) {
                return Ok("*".to_string());
            }
            match fields.get(key_name) {
                Some(value) => Ok(glob::Pattern::escape(&self.format_part(key_name, value)?)),
                None => Ok("*".to_string()),
            }
        };

        let mut pattern = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Part(Part::Literal(text)) => pattern.push_str(&glob::Pattern::escape(text)),
                Piece::Part(Part::Key(k)) => pattern.push_str(&render(k)?),
                Piece::Optional(parts) => {
                    let included = parts.iter().all(|p| match p {
                        Part::Key(k) => fields.contains_key(k) || skip_keys.contains(&k.as_str()),
                        Part::Literal(_) => true,
                    });
                    if !included {
                        continue;
                    }
                    for part in parts {
                        match part {
                            Part::Literal(text) => pattern.push_str(&glob::Pattern::escape(text)),
                            Part::Key(k) => pattern.push_str(&render(k)?),
                        }
                    }
                }
            }
        }
        Ok(pattern)
    }
}

fn invalid(definition: &str, reason: impl Into<String>) -> TemplateError {
    TemplateError::InvalidDefinition {
        definition: definition.to_string(),
        reason: reason.into(),
    }
}

fn parse_definition(definition: &str) -> Result<Vec<Piece>, TemplateError> {
    let mut pieces = Vec::new();
    let mut optional: Option<Vec<Part>> = None;
    let mut literal = String::new();
    let mut chars = definition.chars();

    fn flush(literal: &mut String, pieces: &mut Vec<Piece>, optional: &mut Option<Vec<Part>>) {
        if literal.is_empty() {
            return;
        }
        let part = Part::Literal(std::mem::take(literal));
        match optional {
            Some(parts) => parts.push(part),
            None => pieces.push(Piece::Part(part)),
        }
    }

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                flush(&mut literal, &mut pieces, &mut optional);
                let mut key = String::new();
                let mut closed = false;
                for k in chars.by_ref() {
                    match k {
                        '}' => {
                            closed = true;
                            break;
                        }
                        '{' | '[' | ']' => {
                            return Err(invalid(
                                definition,
                                "unexpected character inside key reference",
                            ));
                        }
                        other => key.push(other),
                    }
                }
                if !closed {
                    return Err(invalid(definition, "unterminated key reference"));
                }
                let key = key.trim().to_string();
                if key.is_empty() {
                    return Err(invalid(definition, "empty key reference"));
                }
                match &mut optional {
                    Some(parts) => parts.push(Part::Key(key)),
                    None => pieces.push(Piece::Part(Part::Key(key))),
                }
            }
            '}' => return Err(invalid(definition, "unmatched '}'")),
            '[' => {
                if optional.is_some() {
                    return Err(invalid(definition, "optional sections cannot be nested"));
                }
                flush(&mut literal, &mut pieces, &mut optional);
                optional = Some(Vec::new());
            }
            ']' => {
                flush(&mut literal, &mut pieces, &mut optional);
                match optional.take() {
                    Some(parts) => {
                        if !parts.iter().any(|p| matches!(p, Part::Key(_))) {
                            return Err(invalid(definition, "optional section without a key"));
                        }
                        pieces.push(Piece::Optional(parts));
                    }
                    None => return Err(invalid(definition, "unmatched ']'")),
                }
            }
            other => literal.push(other),
        }
    }

    if optional.is_some() {
        return Err(invalid(definition, "unterminated optional section"));
    }
    flush(&mut literal, &mut pieces, &mut optional);
    Ok(pieces)
}

fn compile_matcher(
    definition: &str,
    pieces: &[Piece],
    keys: &BTreeMap<String, TemplateKey>,
) -> Result<(Regex, Vec<String>), TemplateError> {
    let mut expr = String::from("^");
    let mut group_keys = Vec::new();

    let mut push_part = |expr: &mut String, part: &Part| match part {
        Part::Literal(text) => expr.push_str(&regex::escape(text)),
        Part::Key(k) => {
            let fragment =
                keys.get(k).map_or_else(|| r"[^/]+?".to_string(), TemplateKey::regex_fragment);
            expr.push('(');
            expr.push_str(&fragment);
            expr.push(')');
            group_keys.push(k.clone());
        }
    };

    for piece in pieces {
        match piece {
            Piece::Part(part) => push_part(&mut expr, part),
            Piece::Optional(parts) => {
                expr.push_str("(?:");
                for part in parts {
                    push_part(&mut expr, part);
                }
                expr.push_str(")?");
            }
        }
    }
    expr.push('$');

    let matcher = Regex::new(&expr).map_err(|e| invalid(definition, e.to_string()))?;
    Ok((matcher, group_keys))
}
