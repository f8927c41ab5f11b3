//! Schema backed by a JSON Schema document

use std::fmt;

use async_trait::async_trait;
use jsonschema::error::ValidationErrorKind;
use jsonschema::Validator;
use serde_json::Value;
use thiserror::Error;

use crate::error::{Issue, PathSegment, ValidationError};
use crate::schema::Schema;

/// The schema document itself is invalid
#[derive(Debug, Error)]
#[error("invalid JSON schema: {message}")]
pub struct SchemaCompileError {
    pub message: String,
}

/// Compiled JSON Schema.
///
/// Validation never transforms the input: a successful parse returns a copy of
/// the value it was given.
pub struct JsonSchema {
    validator: Validator,
}

impl JsonSchema {
    pub fn compile(schema: &Value) -> Result<Self, SchemaCompileError> {
        let validator = jsonschema::validator_for(schema).map_err(|err| SchemaCompileError {
            message: err.to_string(),
        })?;
        Ok(Self { validator })
    }
}

impl fmt::Debug for JsonSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchema").finish_non_exhaustive()
    }
}

#[async_trait]
impl Schema for JsonSchema {
    async fn parse(&self, input: &Value) -> Result<Value, ValidationError> {
        let issues: Vec<Issue> = self
            .validator
            .iter_errors(input)
            .map(|error| {
                let mut path = decode_pointer(&error.instance_path.to_string(), input);
                match &error.kind {
                    ValidationErrorKind::Required { property } => {
                        let property = property
                            .as_str()
                            .map(str::to_string)
                            .unwrap_or_else(|| property.to_string());
                        path.push(PathSegment::Key(property));
                        Issue {
                            path,
                            message: "Required".to_string(),
                            code: "missing_field".to_string(),
                        }
                    }
                    kind => Issue {
                        path,
                        message: error.to_string(),
                        code: kind_code(kind).to_string(),
                    },
                }
            })
            .collect();

        if issues.is_empty() {
            Ok(input.clone())
        } else {
            Err(ValidationError::new(issues))
        }
    }
}

fn kind_code(kind: &ValidationErrorKind) -> &'static str {
    match kind {
        ValidationErrorKind::Type { .. } => "invalid_type",
        ValidationErrorKind::Enum { .. } | ValidationErrorKind::Constant { .. } => "invalid_enum_value",
        ValidationErrorKind::MinLength { .. }
        | ValidationErrorKind::MinItems { .. }
        | ValidationErrorKind::Minimum { .. }
        | ValidationErrorKind::ExclusiveMinimum { .. } => "too_small",
        ValidationErrorKind::MaxLength { .. }
        | ValidationErrorKind::MaxItems { .. }
        | ValidationErrorKind::Maximum { .. }
        | ValidationErrorKind::ExclusiveMaximum { .. } => "too_big",
        ValidationErrorKind::Pattern { .. } | ValidationErrorKind::Format { .. } => "invalid_string",
        ValidationErrorKind::AdditionalProperties { .. } => "unrecognized_keys",
        _ => "custom",
    }
}

/// Decode a JSON pointer into path segments, using the instance to tell array
/// indexes from numeric object keys.
fn decode_pointer(pointer: &str, instance: &Value) -> Vec<PathSegment> {
    let mut current = Some(instance);
    let mut path = Vec::new();

    for raw in pointer.split('/').skip(1) {
        let token = raw.replace("~1", "/").replace("~0", "~");
        let segment = match (current, token.parse::<usize>()) {
            (Some(Value::Array(items)), Ok(index)) => {
                current = items.get(index);
                PathSegment::Index(index)
            }
            (Some(Value::Object(map)), _) => {
                current = map.get(&token);
                PathSegment::Key(token)
            }
            _ => {
                current = None;
                PathSegment::Key(token)
            }
        };
        path.push(segment);
    }

    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_schema() -> JsonSchema {
        JsonSchema::compile(&json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "minLength": 2},
                "tags": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["name"]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_valid_input_is_returned_unchanged() {
        let input = json!({"name": "Ada", "tags": ["x"]});
        assert_eq!(user_schema().parse(&input).await.unwrap(), input);
    }

    #[tokio::test]
    async fn test_required_is_attributed_to_property() {
        let error = user_schema().parse(&json!({})).await.unwrap_err();

        assert_eq!(error.issues().len(), 1);
        assert_eq!(error.issues()[0].path, vec![PathSegment::from("name")]);
        assert_eq!(error.issues()[0].message, "Required");
    }

    #[tokio::test]
    async fn test_nested_array_paths() {
        let error = user_schema()
            .parse(&json!({"name": "Ada", "tags": ["ok", 7]}))
            .await
            .unwrap_err();

        let issue = &error.issues()[0];
        assert_eq!(issue.path, vec![PathSegment::from("tags"), PathSegment::from(1usize)]);
        assert_eq!(issue.code, "invalid_type");
    }

    #[test]
    fn test_invalid_schema_fails_to_compile() {
        assert!(JsonSchema::compile(&json!({"type": "nonsense"})).is_err());
    }

    #[test]
    fn test_decode_pointer_escapes_and_numeric_keys() {
        let instance = json!({"a/b": {"0": true}});
        assert_eq!(
            decode_pointer("/a~1b/0", &instance),
            vec![PathSegment::from("a/b"), PathSegment::from("0")]
        );
        assert!(decode_pointer("", &instance).is_empty());
    }
}
