//! Extractors for values parsed by the validate layer

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::context::{RequestContext, Slot};
use crate::errors::WebError;

/// Parsed JSON body of a validated request
#[derive(Debug, Clone)]
pub struct ValidBody<T>(pub T);

/// Parsed path params of a validated request
#[derive(Debug, Clone)]
pub struct ValidParams<T>(pub T);

/// Parsed query of a validated request
#[derive(Debug, Clone)]
pub struct ValidQuery<T>(pub T);

/// Deserialize a slot of the stored request context.
///
/// A slot the request did not carry deserializes from `null`, so `Option<T>`
/// accepts it. Missing values are a server error: the route is not covered by
/// a validate layer for that slot.
fn from_context<T>(parts: &Parts, slot: Slot) -> Result<T, WebError>
where
    T: DeserializeOwned,
{
    let context = parts.extensions.get::<RequestContext>().ok_or_else(|| {
        WebError::internal(format!(
            "No validated request context; is the {} schema applied to this route?",
            slot
        ))
    })?;

    let value = context.get(slot).cloned().unwrap_or(Value::Null);
    serde_json::from_value(value)
        .map_err(|err| WebError::internal(format!("Validated {} does not match handler type: {}", slot, err)))
}

impl<T, S> FromRequestParts<S> for ValidBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        from_context(parts, Slot::Body).map(ValidBody)
    }
}

impl<T, S> FromRequestParts<S> for ValidParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        from_context(parts, Slot::Params).map(ValidParams)
    }
}

impl<T, S> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        from_context(parts, Slot::Query).map(ValidQuery)
    }
}
