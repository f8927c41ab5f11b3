//! Schemas for a route and the request values they validate

use std::fmt;
use std::sync::Arc;

use schemaguard_schema::{Schema, ValidationError};
use serde_json::Value;

/// Part of a request that can carry a schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Body,
    Params,
    Query,
}

impl Slot {
    /// Validation order; the first failing slot stops the rest
    pub const ORDER: [Slot; 3] = [Slot::Body, Slot::Params, Slot::Query];

    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Body => "body",
            Slot::Params => "params",
            Slot::Query => "query",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Schemas for the body, path params, and query of a route.
///
/// Built once when the route is registered and shared by every request.
///
/// ```rust
/// use schemaguard_schema::{schema_fn, JsonSchema, ValidationError};
/// use schemaguard_web::SchemaSet;
/// use serde_json::json;
///
/// let schemas = SchemaSet::new()
///     .body(JsonSchema::compile(&json!({"type": "object", "required": ["name"]})).unwrap())
///     .query(schema_fn(|value| async move { Ok::<_, ValidationError>(value) }));
/// assert!(schemas.has(schemaguard_web::Slot::Body));
/// ```
#[derive(Clone, Default)]
pub struct SchemaSet {
    body: Option<Arc<dyn Schema>>,
    params: Option<Arc<dyn Schema>>,
    query: Option<Arc<dyn Schema>>,
}

impl SchemaSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(mut self, schema: impl Schema + 'static) -> Self {
        self.body = Some(Arc::new(schema));
        self
    }

    pub fn params(mut self, schema: impl Schema + 'static) -> Self {
        self.params = Some(Arc::new(schema));
        self
    }

    pub fn query(mut self, schema: impl Schema + 'static) -> Self {
        self.query = Some(Arc::new(schema));
        self
    }

    pub fn schema(&self, slot: Slot) -> Option<&Arc<dyn Schema>> {
        match slot {
            Slot::Body => self.body.as_ref(),
            Slot::Params => self.params.as_ref(),
            Slot::Query => self.query.as_ref(),
        }
    }

    pub fn has(&self, slot: Slot) -> bool {
        self.schema(slot).is_some()
    }

    pub fn is_empty(&self) -> bool {
        Slot::ORDER.iter().all(|slot| !self.has(*slot))
    }
}

impl fmt::Debug for SchemaSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaSet")
            .field("body", &self.body.is_some())
            .field("params", &self.params.is_some())
            .field("query", &self.query.is_some())
            .finish()
    }
}

/// Request values subject to validation.
///
/// After the validate layer runs, the context is stored in the request
/// extensions with each validated slot holding the schema's parsed output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    pub body: Option<Value>,
    pub params: Option<Value>,
    pub query: Option<Value>,
}

impl RequestContext {
    pub fn get(&self, slot: Slot) -> Option<&Value> {
        match slot {
            Slot::Body => self.body.as_ref(),
            Slot::Params => self.params.as_ref(),
            Slot::Query => self.query.as_ref(),
        }
    }

    fn get_mut(&mut self, slot: Slot) -> &mut Option<Value> {
        match slot {
            Slot::Body => &mut self.body,
            Slot::Params => &mut self.params,
            Slot::Query => &mut self.query,
        }
    }

    /// Validate body, params, then query against `schemas`.
    ///
    /// A slot is parsed only when the request has a value for it and a schema
    /// is configured; its value is then replaced by the parsed output. The
    /// first failure is returned and later slots are left alone.
    pub async fn validate(&mut self, schemas: &SchemaSet) -> Result<(), ValidationError> {
        for slot in Slot::ORDER {
            let Some(schema) = schemas.schema(slot) else {
                continue;
            };

            let target = self.get_mut(slot);
            if let Some(value) = target.as_ref().filter(|value| !value.is_null()) {
                let parsed = schema.parse(value).await?;
                *target = Some(parsed);
            }
        }

        Ok(())
    }

    /// Take over every slot `other` has a value for
    pub fn merge(&mut self, other: RequestContext) {
        for slot in Slot::ORDER {
            let mut incoming = other.get(slot).cloned();
            if incoming.is_some() {
                std::mem::swap(self.get_mut(slot), &mut incoming);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemaguard_schema::{schema_fn, Issue};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Schema that counts calls and tags objects with `"checked": true`
    fn tagging(calls: Arc<AtomicUsize>) -> impl Schema {
        schema_fn(move |mut value: Value| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if let Some(object) = value.as_object_mut() {
                    object.insert("checked".to_string(), json!(true));
                }
                Ok::<_, ValidationError>(value)
            }
        })
    }

    fn failing(calls: Arc<AtomicUsize>, field: &'static str) -> impl Schema {
        schema_fn(move |_value: Value| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<Value, _>(ValidationError::single(Issue::at([field], "Required")))
            }
        })
    }

    #[tokio::test]
    async fn test_replaces_present_and_configured_slots_only() {
        let calls = Arc::new(AtomicUsize::new(0));
        let schemas = SchemaSet::new()
            .body(tagging(calls.clone()))
            .query(tagging(calls.clone()));

        let mut context = RequestContext {
            body: Some(json!({"name": "Ada"})),
            params: Some(json!({"id": "7"})),
            query: None,
        };
        context.validate(&schemas).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(context.body, Some(json!({"name": "Ada", "checked": true})));
        // no params schema, no query value
        assert_eq!(context.params, Some(json!({"id": "7"})));
        assert_eq!(context.query, None);
    }

    #[tokio::test]
    async fn test_first_failure_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let later = Arc::new(AtomicUsize::new(0));
        let schemas = SchemaSet::new()
            .body(tagging(calls.clone()))
            .params(failing(calls.clone(), "id"))
            .query(tagging(later.clone()));

        let mut context = RequestContext {
            body: Some(json!({})),
            params: Some(json!({"id": "x"})),
            query: Some(json!({"page": "1"})),
        };
        let error = context.validate(&schemas).await.unwrap_err();

        assert_eq!(error.flatten().field_errors["id"], vec!["Required"]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(later.load(Ordering::SeqCst), 0);
        assert_eq!(context.params, Some(json!({"id": "x"})));
        assert_eq!(context.query, Some(json!({"page": "1"})));
    }

    #[tokio::test]
    async fn test_null_counts_as_absent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let schemas = SchemaSet::new().body(failing(calls.clone(), "name"));

        let mut context = RequestContext {
            body: Some(Value::Null),
            ..Default::default()
        };

        assert!(context.validate(&schemas).await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_validating_parsed_values_again_is_stable() {
        let schemas = SchemaSet::new().body(tagging(Arc::new(AtomicUsize::new(0))));
        let mut context = RequestContext {
            body: Some(json!({"name": "Ada"})),
            ..Default::default()
        };

        context.validate(&schemas).await.unwrap();
        let first = context.clone();
        context.validate(&schemas).await.unwrap();

        assert_eq!(context, first);
    }

    #[test]
    fn test_merge_overrides_present_slots() {
        let mut outer = RequestContext {
            body: Some(json!(1)),
            params: Some(json!(2)),
            query: None,
        };
        outer.merge(RequestContext {
            body: None,
            params: Some(json!(20)),
            query: Some(json!(30)),
        });

        assert_eq!(outer.body, Some(json!(1)));
        assert_eq!(outer.params, Some(json!(20)));
        assert_eq!(outer.query, Some(json!(30)));
    }

    #[test]
    fn test_schema_set_reports_configured_slots() {
        let schemas = SchemaSet::new().params(tagging(Arc::new(AtomicUsize::new(0))));

        assert!(schemas.has(Slot::Params));
        assert!(!schemas.has(Slot::Body));
        assert!(!schemas.is_empty());
        assert!(SchemaSet::new().is_empty());
        assert_eq!(format!("{:?}", schemas), "SchemaSet { body: false, params: true, query: false }");
    }
}
