//! The parse-and-coerce capability shared by all schema backends

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ValidationError;

/// Something that can validate a value and produce its parsed form.
///
/// `parse` returns the validated value, which may differ from the input when
/// the schema fills defaults or coerces types. Implementations must not keep
/// per-call state: one schema instance serves every request of a route.
#[async_trait]
pub trait Schema: Send + Sync {
    async fn parse(&self, input: &Value) -> Result<Value, ValidationError>;
}

#[async_trait]
impl<S> Schema for Arc<S>
where
    S: Schema + ?Sized,
{
    async fn parse(&self, input: &Value) -> Result<Value, ValidationError> {
        self.as_ref().parse(input).await
    }
}

#[async_trait]
impl<S> Schema for Box<S>
where
    S: Schema + ?Sized,
{
    async fn parse(&self, input: &Value) -> Result<Value, ValidationError> {
        self.as_ref().parse(input).await
    }
}

/// Schema backed by an async closure
pub struct FnSchema<F> {
    parse: F,
}

impl<F> FnSchema<F> {
    pub fn new(parse: F) -> Self {
        Self { parse }
    }
}

impl<F> fmt::Debug for FnSchema<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSchema").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> Schema for FnSchema<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ValidationError>> + Send,
{
    async fn parse(&self, input: &Value) -> Result<Value, ValidationError> {
        (self.parse)(input.clone()).await
    }
}

/// Build a schema from an async closure.
///
/// ```rust
/// use schemaguard_schema::{schema_fn, Issue, ValidationError};
/// use serde_json::Value;
///
/// let not_null = schema_fn(|value: Value| async move {
///     if value.is_null() {
///         Err(ValidationError::single(Issue::new("Expected a value")))
///     } else {
///         Ok(value)
///     }
/// });
/// # let _ = not_null;
/// ```
pub fn schema_fn<F, Fut>(parse: F) -> FnSchema<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ValidationError>> + Send,
{
    FnSchema::new(parse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Issue;
    use serde_json::json;

    #[tokio::test]
    async fn test_fn_schema_transforms_value() {
        let upper = schema_fn(|value: Value| async move {
            match value.as_str() {
                Some(text) => Ok(Value::String(text.to_uppercase())),
                None => Err(ValidationError::single(
                    Issue::new("Expected string").with_code("invalid_type"),
                )),
            }
        });

        assert_eq!(upper.parse(&json!("abc")).await.unwrap(), json!("ABC"));

        let error = upper.parse(&json!(1)).await.unwrap_err();
        assert_eq!(error.issues()[0].code, "invalid_type");
    }

    #[tokio::test]
    async fn test_shared_schema_through_trait_object() {
        let schema: Arc<dyn Schema> = Arc::new(schema_fn(|value: Value| async move {
            Ok::<_, ValidationError>(value)
        }));
        let shared = Arc::clone(&schema);

        assert_eq!(shared.parse(&json!({"a": 1})).await.unwrap(), json!({"a": 1}));
    }
}
