//! Validation error kind produced by every schema.
//!
//! A [`ValidationError`] is an ordered list of [`Issue`]s, each pointing at the
//! part of the input it concerns. [`ValidationError::flatten`] groups the
//! messages by top-level field for HTTP responses.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

/// Issue code used when a schema does not supply a more specific one
pub const CUSTOM_CODE: &str = "custom";

/// One step in the path from the input root to an offending value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(index) => write!(f, "{}", index),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// A single validation problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// Path from the root of the validated value; empty for root-level issues
    pub path: Vec<PathSegment>,
    /// Human-readable description
    pub message: String,
    /// Machine-readable code, e.g. `invalid_type` or `length`
    pub code: String,
}

impl Issue {
    /// Create a root-level issue
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            path: Vec::new(),
            message: message.into(),
            code: CUSTOM_CODE.to_string(),
        }
    }

    /// Create an issue attached to `path`
    pub fn at<I, P>(path: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathSegment>,
    {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            message: message.into(),
            code: CUSTOM_CODE.to_string(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    /// Whether the issue concerns the value as a whole rather than a field
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Dotted rendering of the path (`address.lines.0`)
    pub fn path_string(&self) -> String {
        self.path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Error returned when a value does not satisfy a schema
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("validation failed: {}", describe_issues(.issues))]
pub struct ValidationError {
    issues: Vec<Issue>,
}

impl ValidationError {
    pub fn new(issues: Vec<Issue>) -> Self {
        Self { issues }
    }

    pub fn single(issue: Issue) -> Self {
        Self {
            issues: vec![issue],
        }
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<Issue> {
        self.issues
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Group issue messages by their top-level field.
    ///
    /// Issues with an empty path land in `form_errors`; all others are keyed by
    /// the first path segment, so `address.city` is reported under `address`.
    pub fn flatten(&self) -> FlattenedErrors {
        let mut flattened = FlattenedErrors::default();

        for issue in &self.issues {
            match issue.path.first() {
                Some(field) => flattened
                    .field_errors
                    .entry(field.to_string())
                    .or_default()
                    .push(issue.message.clone()),
                None => flattened.form_errors.push(issue.message.clone()),
            }
        }

        flattened
    }
}

impl FromIterator<Issue> for ValidationError {
    fn from_iter<T: IntoIterator<Item = Issue>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Issue messages grouped by field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlattenedErrors {
    /// Messages of root-level issues
    pub form_errors: Vec<String>,
    /// Messages per top-level field, in first-seen order
    pub field_errors: IndexMap<String, Vec<String>>,
}

fn describe_issues(issues: &[Issue]) -> String {
    issues
        .iter()
        .map(|issue| {
            if issue.is_root() {
                issue.message.clone()
            } else {
                format!("{}: {}", issue.path_string(), issue.message)
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}
