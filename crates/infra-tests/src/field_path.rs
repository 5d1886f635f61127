//! Field paths into records.
//!
//! A path addresses a value inside the record under test:
//!
//! - `State.Code` nested keys
//! - `DefaultActions[0].Type` an index into a nested sequence
//! - `containers[name=jarombek-com].lastStatus` the unique element whose
//!   fields match every `key=value` predicate
//! - `IpRanges[*].CidrIp` a projection over every element
//!
//! Predicate values match by rendered text, so `FromPort=80` matches both
//! `80` and `"80"`. The empty path addresses the subject itself.

use serde_json::Value;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
    Each,
    Match(Vec<(String, String)>),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldPathError {
    #[error("empty segment in field path '{0}'")]
    EmptySegment(String),

    #[error("unclosed '[' in field path '{0}'")]
    UnclosedBracket(String),

    #[error("invalid bracket expression '[{expr}]' in field path '{path}'")]
    InvalidBracket { path: String, expr: String },

    #[error("unexpected '{ch}' in field path '{path}'")]
    Unexpected { path: String, ch: char },
}

/// What a path resolved to inside a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Present(Value),
    /// The parent exists but has no such field.
    Missing,
    /// An intermediate segment found nothing, so there is no parent to inspect.
    NoSubject { segment: String },
    Ambiguous { segment: String, count: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    source: String,
    segments: Vec<Segment>,
}

impl FieldPath {
    pub fn parse(source: &str) -> Result<Self, FieldPathError> {
        let mut segments = Vec::new();
        let mut key = String::new();
        let mut after_bracket = false;
        let mut pending_dot = false;
        let mut chars = source.chars();

        while let Some(ch) = chars.next() {
            match ch {
                '.' => {
                    if !key.is_empty() {
                        segments.push(Segment::Key(std::mem::take(&mut key)));
                    } else if !after_bracket {
                        return Err(FieldPathError::EmptySegment(source.to_string()));
                    }
                    after_bracket = false;
                    pending_dot = true;
                }
                '[' => {
                    if !key.is_empty() {
                        segments.push(Segment::Key(std::mem::take(&mut key)));
                    } else if pending_dot {
                        return Err(FieldPathError::EmptySegment(source.to_string()));
                    }

                    let mut expr = String::new();
                    let mut closed = false;
                    for inner in chars.by_ref() {
                        if inner == ']' {
                            closed = true;
                            break;
                        }
                        expr.push(inner);
                    }
                    if !closed {
                        return Err(FieldPathError::UnclosedBracket(source.to_string()));
                    }

                    segments.push(parse_bracket(source, &expr)?);
                    after_bracket = true;
                    pending_dot = false;
                }
                ']' => {
                    return Err(FieldPathError::Unexpected {
                        path: source.to_string(),
                        ch,
                    })
                }
                other => {
                    if after_bracket {
                        return Err(FieldPathError::Unexpected {
                            path: source.to_string(),
                            ch: other,
                        });
                    }
                    key.push(other);
                    pending_dot = false;
                }
            }
        }

        if !key.is_empty() {
            segments.push(Segment::Key(key));
        } else if pending_dot {
            return Err(FieldPathError::EmptySegment(source.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Resolve the path inside `value`.
    #[must_use]
    pub fn resolve(&self, value: &Value) -> Resolved {
        resolve_segments(value, &self.segments)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.source.is_empty() {
            f.write_str("(record)")
        } else {
            f.write_str(&self.source)
        }
    }
}

fn parse_bracket(path: &str, expr: &str) -> Result<Segment, FieldPathError> {
    let expr = expr.trim();
    let invalid = || FieldPathError::InvalidBracket {
        path: path.to_string(),
        expr: expr.to_string(),
    };

    if expr == "*" {
        return Ok(Segment::Each);
    }

    if !expr.is_empty() && expr.chars().all(|c| c.is_ascii_digit()) {
        return expr.parse().map(Segment::Index).map_err(|_| invalid());
    }

    if expr.contains('=') {
        let mut predicates = Vec::new();
        for pair in expr.split(',') {
            let (field, value) = pair.split_once('=').ok_or_else(invalid)?;
            let field = field.trim();
            if field.is_empty() {
                return Err(invalid());
            }
            predicates.push((field.to_string(), value.trim().to_string()));
        }
        return Ok(Segment::Match(predicates));
    }

    Err(invalid())
}

fn resolve_segments(value: &Value, segments: &[Segment]) -> Resolved {
    let Some((segment, rest)) = segments.split_first() else {
        return Resolved::Present(value.clone());
    };
    let not_found = || {
        if rest.is_empty() {
            Resolved::Missing
        } else {
            Resolved::NoSubject {
                segment: describe_segment(segment),
            }
        }
    };

    match segment {
        Segment::Key(key) => match value.get(key.as_str()) {
            Some(inner) => resolve_segments(inner, rest),
            None => not_found(),
        },
        Segment::Index(index) => match value.as_array().and_then(|items| items.get(*index)) {
            Some(inner) => resolve_segments(inner, rest),
            None => not_found(),
        },
        Segment::Match(predicates) => {
            let Some(items) = value.as_array() else {
                return not_found();
            };
            let matches: Vec<&Value> = items
                .iter()
                .filter(|item| matches_all(item, predicates))
                .collect();
            match matches.as_slice() {
                [] => not_found(),
                [only] => resolve_segments(only, rest),
                many => Resolved::Ambiguous {
                    segment: describe_predicates(predicates),
                    count: many.len(),
                },
            }
        }
        Segment::Each => {
            let Some(items) = value.as_array() else {
                return not_found();
            };
            let mut projected = Vec::with_capacity(items.len());
            for item in items {
                match resolve_segments(item, rest) {
                    Resolved::Present(inner) => projected.push(inner),
                    Resolved::Missing | Resolved::NoSubject { .. } => {}
                    ambiguous @ Resolved::Ambiguous { .. } => return ambiguous,
                }
            }
            Resolved::Present(Value::Array(projected))
        }
    }
}

/// Whether a record has every `field=value` pair, comparing rendered text.
#[must_use]
pub fn matches_all(item: &Value, predicates: &[(String, String)]) -> bool {
    predicates.iter().all(|(field, expected)| {
        item.get(field.as_str())
            .is_some_and(|actual| value_text(actual) == *expected)
    })
}

/// Render a value the way predicates and reports show it: strings bare,
/// everything else as JSON.
#[must_use]
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn describe_segment(segment: &Segment) -> String {
    match segment {
        Segment::Key(key) => key.clone(),
        Segment::Index(index) => format!("[{}]", index),
        Segment::Each => "[*]".to_string(),
        Segment::Match(predicates) => describe_predicates(predicates),
    }
}

fn describe_predicates(predicates: &[(String, String)]) -> String {
    let pairs: Vec<String> = predicates
        .iter()
        .map(|(field, value)| format!("{}={}", field, value))
        .collect();
    format!("[{}]", pairs.join(","))
}
