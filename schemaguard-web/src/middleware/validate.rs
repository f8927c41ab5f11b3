//! Request validation layer
//!
//! Validates the JSON body, path params, and query string of each request
//! against a [`SchemaSet`] before the inner service runs. Parsed values replace
//! the originals; a failure is forwarded to the error layers as a
//! [`RouteError`] and the inner service is never called.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    extract::{rejection::RawPathParamsRejection, FromRequestParts, RawPathParams},
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        request::Parts,
        uri::PathAndQuery,
        HeaderValue, Request, Uri,
    },
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use http_body_util::LengthLimitError;
use schemaguard_config::ValidationConfig;
use serde_json::{Map, Value};
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::context::{RequestContext, SchemaSet, Slot};
use crate::errors::{RouteError, WebError, WebResult};

/// Create a layer validating requests against `schemas`.
///
/// Path params are only known once a route has matched, so apply the layer
/// with `Router::route_layer` (or on the method router) when a params schema
/// is set.
///
/// ```rust,no_run
/// use axum::{routing::post, Router};
/// use schemaguard_schema::typed;
/// use schemaguard_web::{validate, validation_errors, SchemaSet};
/// # #[derive(serde::Deserialize, serde::Serialize, validator::Validate)]
/// # struct CreateUser { name: String }
///
/// let app: Router = Router::new()
///     .route("/users", post(|| async { "created" }))
///     .route_layer(validate(SchemaSet::new().body(typed::<CreateUser>())))
///     .layer(validation_errors());
/// ```
pub fn validate(schemas: SchemaSet) -> ValidateLayer {
    ValidateLayer::new(schemas)
}

/// Layer produced by [`validate`]
#[derive(Debug, Clone)]
pub struct ValidateLayer {
    schemas: Arc<SchemaSet>,
    body_limit: usize,
}

impl ValidateLayer {
    pub fn new(schemas: SchemaSet) -> Self {
        Self {
            schemas: Arc::new(schemas),
            body_limit: ValidationConfig::default().body_limit,
        }
    }

    pub fn with_config(mut self, config: &ValidationConfig) -> Self {
        self.body_limit = config.body_limit;
        self
    }

    /// Largest body, in bytes, buffered for validation
    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }
}

impl<S> Layer<S> for ValidateLayer {
    type Service = ValidateService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ValidateService {
            inner,
            schemas: Arc::clone(&self.schemas),
            body_limit: self.body_limit,
        }
    }
}

/// Service that validates requests before handing them to `S`
#[derive(Debug, Clone)]
pub struct ValidateService<S> {
    inner: S,
    schemas: Arc<SchemaSet>,
    body_limit: usize,
}

impl<S> Service<Request<Body>> for ValidateService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        // Keep the service that was polled ready for this call
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let schemas = Arc::clone(&self.schemas);
        let body_limit = self.body_limit;

        Box::pin(async move {
            match prepare_request(request, &schemas, body_limit).await {
                Ok(request) => inner.call(request).await,
                Err(error) => Ok(error.into_response()),
            }
        })
    }
}

/// Validate a request and rewrite it with the parsed values
async fn prepare_request(
    request: Request<Body>,
    schemas: &SchemaSet,
    body_limit: usize,
) -> Result<Request<Body>, RouteError> {
    let (mut parts, body) = request.into_parts();
    let mut context = RequestContext::default();

    // Only a body schema makes the layer buffer the body
    let (raw_body, mut body) = if schemas.has(Slot::Body) {
        let bytes = read_body(body, body_limit).await?;
        if !bytes.is_empty() {
            if !is_json(&parts) {
                warn!("Rejecting non-JSON body on a route with a body schema");
                return Err(WebError::UnsupportedMediaType.into());
            }
            context.body = Some(serde_json::from_slice(&bytes).map_err(|err| {
                warn!("Rejecting malformed JSON body: {}", err);
                WebError::bad_request(format!("Malformed JSON body: {}", err))
            })?);
        }
        (Some(bytes), None)
    } else {
        (None, Some(body))
    };

    // Params and query are always objects, empty when the request has none
    if schemas.has(Slot::Params) {
        context.params = Some(path_params(&mut parts).await?);
    }

    if schemas.has(Slot::Query) {
        context.query = Some(decode_query(parts.uri.query().unwrap_or_default())?);
    }

    if let Err(error) = context.validate(schemas).await {
        debug!(
            method = %parts.method,
            uri = %parts.uri,
            issues = error.issues().len(),
            "Request failed validation"
        );
        return Err(error.into());
    }

    let body = match (&context.body, raw_body) {
        (Some(parsed), Some(_)) => {
            let bytes = serde_json::to_vec(parsed)
                .map_err(|err| WebError::internal(format!("Failed to encode parsed body: {}", err)))?;
            parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(bytes.len()));
            Body::from(bytes)
        }
        (None, Some(bytes)) => Body::from(bytes),
        (_, None) => body.take().unwrap_or_default(),
    };

    if let Some(query) = &context.query {
        parts.uri = replace_query(&parts.uri, &encode_query(query)?)?;
    }

    match parts.extensions.get_mut::<RequestContext>() {
        Some(existing) => existing.merge(context),
        None => {
            parts.extensions.insert(context);
        }
    }

    Ok(Request::from_parts(parts, body))
}

async fn read_body(body: Body, limit: usize) -> WebResult<axum::body::Bytes> {
    axum::body::to_bytes(body, limit).await.map_err(|err| {
        if err.into_inner().is::<LengthLimitError>() {
            WebError::PayloadTooLarge { limit }
        } else {
            WebError::bad_request("Failed to read request body")
        }
    })
}

fn is_json(parts: &Parts) -> bool {
    let Some(content_type) = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
    else {
        return false;
    };

    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

async fn path_params(parts: &mut Parts) -> WebResult<Value> {
    match RawPathParams::from_request_parts(parts, &()).await {
        Ok(params) => Ok(Value::Object(
            params
                .iter()
                .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
                .collect(),
        )),
        Err(RawPathParamsRejection::MissingPathParams(_)) => Ok(Value::Object(Map::new())),
        Err(rejection) => Err(WebError::bad_request(rejection.body_text())),
    }
}

/// Decode a query string into an object of strings; repeated keys collect
/// into arrays.
pub(crate) fn decode_query(raw: &str) -> WebResult<Value> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(raw)
        .map_err(|err| WebError::bad_request(format!("Malformed query string: {}", err)))?;

    let mut map = Map::new();
    for (key, value) in pairs {
        match map.get_mut(&key) {
            Some(Value::Array(values)) => values.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
            None => {
                map.insert(key, Value::String(value));
            }
        }
    }

    Ok(Value::Object(map))
}

/// Encode a parsed query back into a query string
pub(crate) fn encode_query(query: &Value) -> WebResult<String> {
    let Value::Object(map) = query else {
        return Err(WebError::internal("Parsed query is not an object"));
    };

    let mut pairs: Vec<(&str, String)> = Vec::new();
    for (key, value) in map {
        match value {
            Value::Array(items) => {
                pairs.extend(items.iter().filter_map(scalar_to_string).map(|item| (key.as_str(), item)))
            }
            other => {
                if let Some(item) = scalar_to_string(other) {
                    pairs.push((key.as_str(), item));
                }
            }
        }
    }

    serde_urlencoded::to_string(pairs)
        .map_err(|err| WebError::internal(format!("Failed to encode parsed query: {}", err)))
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
        // Nested values keep their JSON text
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

fn replace_query(uri: &Uri, query: &str) -> WebResult<Uri> {
    let path_and_query = if query.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), query)
    };

    let mut uri_parts = uri.clone().into_parts();
    uri_parts.path_and_query = Some(
        PathAndQuery::try_from(path_and_query)
            .map_err(|err| WebError::internal(format!("Invalid rewritten URI: {}", err)))?,
    );
    Uri::from_parts(uri_parts).map_err(|err| WebError::internal(format!("Invalid rewritten URI: {}", err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_query_collects_repeated_keys() {
        let query = decode_query("tag=a&page=2&tag=b&tag=c&q=hello%20world").unwrap();

        assert_eq!(
            query,
            json!({"tag": ["a", "b", "c"], "page": "2", "q": "hello world"})
        );
    }

    #[test]
    fn test_decode_empty_query_is_empty_object() {
        assert_eq!(decode_query("").unwrap(), json!({}));
    }

    #[test]
    fn test_encode_query_flattens_arrays_and_scalars() {
        let encoded = encode_query(&json!({"limit": 10, "tag": ["a", "b"], "skip": null})).unwrap();
        let decoded = decode_query(&encoded).unwrap();

        assert_eq!(decoded, json!({"limit": "10", "tag": ["a", "b"]}));
    }

    #[test]
    fn test_encode_query_rejects_non_objects() {
        assert!(encode_query(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_replace_query_keeps_path() {
        let uri: Uri = "http://example.com/users/7?limit=x".parse().unwrap();

        assert_eq!(replace_query(&uri, "limit=10").unwrap(), "http://example.com/users/7?limit=10");
        assert_eq!(replace_query(&uri, "").unwrap().to_string(), "http://example.com/users/7");
    }

    #[test]
    fn test_json_content_types() {
        let json_request = |content_type: &str| {
            let (parts, _) = Request::builder()
                .header(CONTENT_TYPE, content_type)
                .body(())
                .unwrap()
                .into_parts();
            is_json(&parts)
        };

        assert!(json_request("application/json"));
        assert!(json_request("application/json; charset=utf-8"));
        assert!(json_request("application/merge-patch+json"));
        assert!(!json_request("text/plain"));
    }
}
