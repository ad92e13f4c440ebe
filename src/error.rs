//! Error types for decoding settings and for profile store operations.

use std::fmt;
use std::path::PathBuf;

/// What is wrong with one value in otherwise well-formed JSON.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaProblem {
    #[error("unknown key")]
    UnknownKey,

    #[error("required key is missing")]
    MissingKey,

    #[error("expected {expected}")]
    TypeMismatch { expected: &'static str },

    #[error("value out of range: {detail}")]
    OutOfDomain { detail: String },

    #[error("expected {expected} entries, found {found}")]
    WrongLength { expected: usize, found: usize },
}

/// A schema problem located by its dotted path, e.g. `fields[2].goo_interval_seconds`.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaIssue {
    pub path: String,
    pub problem: SchemaProblem,
}

impl SchemaIssue {
    pub fn new(path: impl Into<String>, problem: SchemaProblem) -> Self {
        Self { path: path.into(), problem }
    }

    /// Prefix the path with the enclosing container
    pub(crate) fn nested(self, parent: &str) -> Self {
        let path = if self.path.starts_with('[') {
            format!("{parent}{}", self.path)
        } else {
            format!("{parent}.{}", self.path)
        };
        Self { path, problem: self.problem }
    }
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.problem)
    }
}

/// Errors produced when decoding canonical text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    /// Text is not structurally valid JSON
    #[error("Parse error at line {line}, column {column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    /// JSON is well-formed but does not describe valid settings
    #[error("Schema error: {}", format_issues(.0))]
    Schema(Vec<SchemaIssue>),
}

impl DecodeError {
    pub fn issues(&self) -> &[SchemaIssue] {
        match self {
            DecodeError::Schema(issues) => issues,
            DecodeError::Parse { .. } => &[],
        }
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::Parse {
            line: err.line(),
            column: err.column(),
            message: err.to_string(),
        }
    }
}

fn format_issues(issues: &[SchemaIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that can occur during profile store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Profile '{0}' not found")]
    NotFound(String),

    /// Name is empty or already used by another profile
    #[error("Profile name '{0}' is empty or already in use")]
    DuplicateName(String),

    /// Name is over the character limit or would not fit in a file name
    #[error("Profile name '{0}' is too long (at most {max} characters, fewer for non-ASCII)", max = crate::constants::profile::MAX_NAME_CHARS)]
    NameTooLong(String),

    #[error("Cannot delete '{0}': it is the last remaining profile")]
    LastProfile(String),

    #[error("Field slot {0} does not exist (slots are 1-{max})", max = crate::constants::profile::FIELD_SLOTS)]
    InvalidSlot(usize),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Storage read/write failed; the in-memory store is still authoritative
    #[error("Failed to persist '{path}': {source}")]
    Persistence {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A persisted profile could not be decoded
    #[error("Corrupt settings file '{path}': {source}")]
    Corrupt { path: PathBuf, source: DecodeError },
}

impl StoreError {
    pub(crate) fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Persistence { path: path.into(), source }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_carries_location() {
        let err: DecodeError = serde_json::from_str::<serde_json::Value>("{\n  \"a\": ")
            .unwrap_err()
            .into();
        match err {
            DecodeError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_nested_issue_paths() {
        let issue = SchemaIssue::new("goo_interval_seconds", SchemaProblem::MissingKey).nested("[2]");
        assert_eq!(issue.path, "[2].goo_interval_seconds");
        let issue = issue.nested("fields");
        assert_eq!(issue.path, "fields[2].goo_interval_seconds");
        assert_eq!(
            issue.to_string(),
            "fields[2].goo_interval_seconds: required key is missing"
        );
    }
}
