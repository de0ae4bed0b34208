// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns config load failures into miette reports.
//!
//! Every key has a compiled default, so a PropCare config only fails to
//! parse on a misspelled key, an unsupported `email.transport`, or a value
//! of the wrong type. Each of those points back at the offending line when
//! the TOML text is available.

#![allow(unused_assignments)] // miette's Diagnostic derive trips this lint

use figment::error::{Error as FigmentError, Kind};
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

const SUGGESTION_THRESHOLD: f64 = 0.75;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(propcare::config::unknown_key),
        help("{}", did_you_mean(suggestion.as_deref(), "keys", known))
    )]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        /// Comma-separated keys valid in the same section.
        known: String,
        #[label("not a PropCare setting")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// An enum setting given a value it does not support.
    #[error("`{value}` is not a valid value for `{key}`")]
    #[diagnostic(
        code(propcare::config::unknown_value),
        help("{}", did_you_mean(suggestion.as_deref(), "values", allowed))
    )]
    UnknownValue {
        key: String,
        value: String,
        suggestion: Option<String>,
        allowed: String,
        #[label("unsupported value")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("invalid type for key `{key}`: found {found}")]
    #[diagnostic(code(propcare::config::invalid_type), help("`{key}` takes {expected}"))]
    InvalidType {
        key: String,
        found: String,
        expected: String,
        #[label("wrong type here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// Parsed, but breaks a rule checked by `validate_config`.
    #[error("validation error: {message}")]
    #[diagnostic(code(propcare::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(propcare::config::other))]
    Other(String),
}

impl ConfigError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        ConfigError::Validation {
            message: message.into(),
        }
    }
}

fn did_you_mean(suggestion: Option<&str>, noun: &str, choices: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid {noun}: {choices}"),
        None => format!("valid {noun}: {choices}"),
    }
}

/// Converts every error inside a `figment::Error` into a [`ConfigError`].
///
/// `toml_sources` holds `(path, content)` pairs used to attach source spans.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| convert(&error, toml_sources))
        .collect()
}

fn convert(error: &FigmentError, toml_sources: &[(String, String)]) -> ConfigError {
    match &error.kind {
        Kind::UnknownField(field, known) => {
            let (span, src) = locate(error, field, toml_sources);
            ConfigError::UnknownKey {
                key: field.clone(),
                suggestion: suggest_key(field, known),
                known: known.join(", "),
                span,
                src,
            }
        }
        Kind::UnknownVariant(value, allowed) => {
            let (span, src) = locate_last(error, toml_sources);
            ConfigError::UnknownValue {
                key: error.path.join("."),
                value: value.clone(),
                suggestion: suggest_key(value, allowed),
                allowed: allowed.join(", "),
                span,
                src,
            }
        }
        Kind::InvalidType(found, expected) => {
            let (span, src) = locate_last(error, toml_sources);
            ConfigError::InvalidType {
                key: error.path.join("."),
                found: found.to_string(),
                expected: expected.clone(),
                span,
                src,
            }
        }
        _ => ConfigError::Other(error.to_string()),
    }
}

type Located = (Option<SourceSpan>, Option<NamedSource<String>>);

/// Locates the key named by the last element of the error's path.
fn locate_last(error: &FigmentError, toml_sources: &[(String, String)]) -> Located {
    match error.path.last() {
        Some(field) => locate(error, field, toml_sources),
        None => (None, None),
    }
}

/// Resolves the span of `field` in whichever TOML file produced `error`.
fn locate(error: &FigmentError, field: &str, toml_sources: &[(String, String)]) -> Located {
    let origin = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    // Inline strings have no file source; fall back to the only candidate.
    let found = match origin {
        Some(path) => toml_sources.iter().find(|(p, _)| *p == path),
        None if toml_sources.len() == 1 => toml_sources.first(),
        None => None,
    };
    let Some((path, content)) = found else {
        return (None, None);
    };

    let section: Vec<String> = error
        .path
        .first()
        .filter(|s| s.as_str() != field)
        .into_iter()
        .cloned()
        .collect();
    match find_key_offset(content, &section, field) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(path, content.clone())),
        ),
        None => (None, None),
    }
}

/// Byte offset of `field` as a key, searching after the `[section]` header
/// named by `path[0]` (or from the top when `path` is empty).
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let start = match path.first() {
        Some(section) => {
            let header = format!("[{section}]");
            content.find(&header)? + header.len()
        }
        None => 0,
    };

    let mut offset = start;
    for line in content[start..].split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') && !path.is_empty() {
            return None;
        }
        if let Some(after) = trimmed.strip_prefix(field)
            && matches!(after.chars().next(), Some(' ' | '\t' | '='))
        {
            return Some(offset + (line.len() - trimmed.len()));
        }
        offset += line.len();
    }
    None
}

/// Closest Jaro-Winkler match for `unknown` among `candidates`, if close enough.
pub fn suggest_key(unknown: &str, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Prints each error to stderr as a graphical miette report.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        match handler.render_report(&mut buf, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{buf}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}
