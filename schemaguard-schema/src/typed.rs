//! Schema for Rust types that derive `Deserialize` and `validator::Validate`
//!
//! Parsing deserializes the input into `T`, which is where coercion happens
//! (serde defaults, renames, custom deserializers), then runs the type's
//! validation rules and serializes the value back out.

use std::fmt;
use std::marker::PhantomData;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use serde_path_to_error::Segment;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::error::{Issue, PathSegment, ValidationError};
use crate::schema::Schema;

/// Key `validator` uses for struct-level (`#[validate(schema(...))]`) errors
const STRUCT_LEVEL_KEY: &str = "__all__";

/// Schema that parses into `T`
pub struct TypedSchema<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedSchema<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for TypedSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for TypedSchema<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for TypedSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedSchema")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> TypedSchema<T>
where
    T: DeserializeOwned + Validate,
{
    /// Deserialize and validate without re-serializing
    pub fn parse_typed(&self, input: &Value) -> Result<T, ValidationError> {
        let parsed = serde_path_to_error::deserialize::<_, T>(input).map_err(|err| deserialize_issue(&err))?;
        parsed.validate().map_err(|errors| from_validation_errors(&errors))?;
        Ok(parsed)
    }
}

#[async_trait]
impl<T> Schema for TypedSchema<T>
where
    T: DeserializeOwned + Serialize + Validate + Send + Sync,
{
    async fn parse(&self, input: &Value) -> Result<Value, ValidationError> {
        let parsed = self.parse_typed(input)?;
        serde_json::to_value(&parsed).map_err(|err| {
            ValidationError::single(Issue::new(err.to_string()).with_code("invalid_output"))
        })
    }
}

/// Shorthand for `TypedSchema::<T>::new()`
pub fn typed<T>() -> TypedSchema<T> {
    TypedSchema::new()
}

/// Convert a serde failure into an issue at the path where it happened.
///
/// Missing fields are reported by the enclosing struct, so the field name is
/// appended to its path.
fn deserialize_issue(err: &serde_path_to_error::Error<serde_json::Error>) -> ValidationError {
    let mut path: Vec<PathSegment> = err
        .path()
        .iter()
        .filter_map(|segment| match segment {
            Segment::Seq { index } => Some(PathSegment::Index(*index)),
            Segment::Map { key } => Some(PathSegment::Key(key.clone())),
            Segment::Enum { variant } => Some(PathSegment::Key(variant.clone())),
            Segment::Unknown => None,
        })
        .collect();
    let message = err.inner().to_string();

    let issue = if let Some(field) = backticked_after(&message, "missing field `") {
        path.push(PathSegment::from(field));
        Issue {
            path,
            message: "Required".to_string(),
            code: "missing_field".to_string(),
        }
    } else if let Some(field) = backticked_after(&message, "unknown field `") {
        let key = PathSegment::from(field);
        if path.last() != Some(&key) {
            path.push(key);
        }
        Issue {
            path,
            message: "Unrecognized key".to_string(),
            code: "unrecognized_keys".to_string(),
        }
    } else {
        // "invalid type: string \"old\", expected u32" reads as "Expected u32"
        let message = match message.split_once(", expected ") {
            Some((_, expected)) => format!("Expected {}", expected),
            None => message,
        };
        Issue {
            path,
            message,
            code: "invalid_type".to_string(),
        }
    };

    ValidationError::single(issue)
}

fn backticked_after<'a>(message: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = message.strip_prefix(prefix)?;
    rest.find('`').map(|end| &rest[..end])
}

/// Walk `validator` errors into issues with full paths.
pub fn from_validation_errors(errors: &ValidationErrors) -> ValidationError {
    let mut issues = Vec::new();
    collect_issues(errors, &mut Vec::new(), &mut issues);
    ValidationError::new(issues)
}

fn collect_issues(errors: &ValidationErrors, path: &mut Vec<PathSegment>, issues: &mut Vec<Issue>) {
    // HashMap order is arbitrary; sort so responses are stable
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|(a, _), (b, _)| a.cmp(b));

    for (field, kind) in fields {
        let is_struct_level = field.as_ref() == STRUCT_LEVEL_KEY;
        if !is_struct_level {
            path.push(PathSegment::Key(field.to_string()));
        }

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let message = match &error.message {
                        Some(message) => message.to_string(),
                        None => format!("Invalid value ({})", error.code),
                    };
                    issues.push(Issue {
                        path: path.clone(),
                        message,
                        code: error.code.to_string(),
                    });
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_issues(nested, path, issues),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    path.push(PathSegment::Index(*index));
                    collect_issues(nested, path, issues);
                    path.pop();
                }
            }
        }

        if !is_struct_level {
            path.pop();
        }
    }
}

/// Helper for `#[serde(deserialize_with = ...)]` on params and query fields.
///
/// Strings are parsed with `FromStr`; anything else deserializes as `T`, so a
/// value that was already parsed goes through unchanged.
pub fn from_str<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: std::str::FromStr + DeserializeOwned,
    T::Err: fmt::Display,
{
    match Value::deserialize(deserializer)? {
        Value::String(raw) => raw.parse().map_err(serde::de::Error::custom),
        other => T::deserialize(other).map_err(serde::de::Error::custom),
    }
}
