//! Web-specific error types and the error chain
//!
//! Middleware that fails does not build its own error page. It returns a
//! [`RouteError`] response, which carries the error in the response
//! extensions so that error layers further out can recognise it, handle it,
//! or let it pass.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Web-specific error type for request preparation failures
#[derive(Debug, Error)]
pub enum WebError {
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Payload too large: body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("Unsupported media type: expected a JSON body")]
    UnsupportedMediaType,

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

/// Result type for web operations
pub type WebResult<T> = Result<T, WebError>;

impl WebError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            WebError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            WebError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            WebError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            WebError::BadRequest { .. } => "BAD_REQUEST",
            WebError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            WebError::UnsupportedMediaType => "UNSUPPORTED_MEDIA_TYPE",
            WebError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        WebError::BadRequest {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        WebError::Internal {
            message: message.into(),
        }
    }

    fn to_response(&self) -> Response {
        let message = match self {
            // Internal details stay in the logs
            WebError::Internal { message } => {
                error!("Internal error: {}", message);
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        let body = json!({
            "error": {
                "code": self.error_code(),
                "message": message
            }
        });

        (self.status_code(), Json(body)).into_response()
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        self.to_response()
    }
}

/// An error forwarded to the error-handling layers.
///
/// Returning a `RouteError` (from middleware or a handler) is how a request
/// jumps to the error chain. Any `std::error::Error` converts into one, and
/// error layers get the original error back with [`RouteError::downcast_ref`].
#[derive(Clone)]
pub struct RouteError {
    inner: Arc<dyn StdError + Send + Sync>,
}

impl RouteError {
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(error),
        }
    }

    /// Whether the forwarded error is of type `E`
    pub fn is<E>(&self) -> bool
    where
        E: StdError + 'static,
    {
        self.inner.is::<E>()
    }

    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        self.inner.downcast_ref::<E>()
    }

    pub fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.inner.as_ref()
    }

    /// The error a response is carrying, if any
    pub fn from_response(response: &Response) -> Option<&RouteError> {
        response.extensions().get::<RouteError>()
    }

    /// What the client sees when no error layer handles the error
    fn fallback_response(&self) -> Response {
        if let Some(web_error) = self.downcast_ref::<WebError>() {
            return web_error.to_response();
        }

        error!("Unhandled error reached the client: {}", self.inner);
        let body = json!({
            "error": {
                "code": "INTERNAL_ERROR",
                "message": "Internal server error"
            }
        });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

impl<E> From<E> for RouteError
where
    E: StdError + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Self::new(error)
    }
}

impl fmt::Debug for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RouteError").field(&self.inner).finish()
    }
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        let mut response = self.fallback_response();
        response.extensions_mut().insert(self);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemaguard_schema::{Issue, ValidationError};

    #[test]
    fn test_web_error_status_codes() {
        assert_eq!(WebError::bad_request("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            WebError::PayloadTooLarge { limit: 1 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(WebError::internal("x").error_code(), "INTERNAL_ERROR");
        assert_eq!(
            WebError::UnsupportedMediaType.status_code(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
    }

    #[test]
    fn test_route_error_keeps_type_identity() {
        let error = RouteError::from(ValidationError::single(Issue::new("nope")));

        assert!(error.is::<ValidationError>());
        assert!(!error.is::<WebError>());
        assert_eq!(error.downcast_ref::<ValidationError>().unwrap().issues().len(), 1);
    }

    #[test]
    fn test_response_carries_forwarded_error() {
        let response = RouteError::from(WebError::bad_request("broken")).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let carried = RouteError::from_response(&response).unwrap();
        assert!(carried.is::<WebError>());
    }

    #[test]
    fn test_unknown_errors_fall_back_to_500() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let response = RouteError::from(io).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(RouteError::from_response(&response).is_some());
    }
}
