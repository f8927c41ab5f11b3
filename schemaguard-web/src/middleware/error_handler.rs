//! Validation error formatting layer
//!
//! Sits outside the routes it covers and looks at the error each response
//! carries. Validation errors are turned into a response, either the default
//! field-error body or whatever a custom handler returns. Every other response
//! passes through untouched, forwarded error included.

use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, Uri, Version},
    response::{IntoResponse, Response},
    Json,
};
use futures::future::BoxFuture;
use indexmap::IndexMap;
use schemaguard_config::ValidationConfig;
use schemaguard_schema::ValidationError;
use serde::Serialize;
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::errors::RouteError;

/// Format validation errors with the default JSON body
pub fn validation_errors() -> ValidationErrorLayer {
    ValidationErrorLayer::new(None)
}

/// Hand validation errors to `handler`; its response is sent as is.
///
/// ```rust,no_run
/// use axum::{http::StatusCode, response::IntoResponse};
/// use schemaguard_web::{validation_errors_with, ErrorNext, RequestHead, ValidationError};
///
/// let layer = validation_errors_with(|error: ValidationError, _request: RequestHead, _next: ErrorNext| async move {
///     (StatusCode::UNPROCESSABLE_ENTITY, error.to_string()).into_response()
/// });
/// # let _ = layer;
/// ```
pub fn validation_errors_with<H>(handler: H) -> ValidationErrorLayer
where
    H: ValidationErrorHandler,
{
    let handler: Arc<dyn ValidationErrorHandler> = Arc::new(handler);
    ValidationErrorLayer::new(Some(handler))
}

/// Custom formatter for validation errors
pub trait ValidationErrorHandler: Send + Sync + 'static {
    fn handle(&self, error: ValidationError, request: RequestHead, next: ErrorNext) -> BoxFuture<'static, Response>;
}

impl<F, Fut> ValidationErrorHandler for F
where
    F: Fn(ValidationError, RequestHead, ErrorNext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn handle(&self, error: ValidationError, request: RequestHead, next: ErrorNext) -> BoxFuture<'static, Response> {
        Box::pin(self(error, request, next))
    }
}

/// The parts of the request a handler may look at
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
}

impl RequestHead {
    fn capture<B>(request: &Request<B>) -> Self {
        Self {
            method: request.method().clone(),
            uri: request.uri().clone(),
            version: request.version(),
            headers: request.headers().clone(),
        }
    }
}

/// Continuation of the error chain, given to custom handlers
#[derive(Debug)]
pub struct ErrorNext {
    response: Response,
}

impl ErrorNext {
    /// Forward the original error to the next error layer
    pub fn pass(self) -> Response {
        self.response
    }

    /// Forward a different error to the next error layer
    pub fn forward(self, error: impl Into<RouteError>) -> Response {
        let error: RouteError = error.into();
        error.into_response()
    }
}

/// Default error body: `{"error":{"message":{"<field>":["<issue>", ...]}}}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationErrorBody {
    pub error: ValidationErrorDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationErrorDetails {
    pub message: IndexMap<String, Vec<String>>,
}

impl From<&ValidationError> for ValidationErrorBody {
    fn from(error: &ValidationError) -> Self {
        // Issues without a field path are not part of the body
        Self {
            error: ValidationErrorDetails {
                message: error.flatten().field_errors,
            },
        }
    }
}

/// Build the default response for a validation error
pub fn default_response(error: &ValidationError, status: StatusCode) -> Response {
    (status, Json(ValidationErrorBody::from(error))).into_response()
}

/// Layer produced by [`validation_errors`] and [`validation_errors_with`]
#[derive(Clone)]
pub struct ValidationErrorLayer {
    handler: Option<Arc<dyn ValidationErrorHandler>>,
    status: StatusCode,
}

impl ValidationErrorLayer {
    fn new(handler: Option<Arc<dyn ValidationErrorHandler>>) -> Self {
        Self {
            handler,
            status: StatusCode::BAD_REQUEST,
        }
    }

    pub fn with_config(self, config: &ValidationConfig) -> Self {
        match StatusCode::from_u16(config.error_status) {
            Ok(status) => self.status(status),
            Err(_) => {
                warn!(
                    "Ignoring invalid validation error status {}, using {}",
                    config.error_status, self.status
                );
                self
            }
        }
    }

    /// Status of the default response
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl std::fmt::Debug for ValidationErrorLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationErrorLayer")
            .field("custom_handler", &self.handler.is_some())
            .field("status", &self.status)
            .finish()
    }
}

impl<S> Layer<S> for ValidationErrorLayer {
    type Service = ValidationErrorService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ValidationErrorService {
            inner,
            handler: self.handler.clone(),
            status: self.status,
        }
    }
}

/// Service that formats validation errors forwarded by `S`
#[derive(Clone)]
pub struct ValidationErrorService<S> {
    inner: S,
    handler: Option<Arc<dyn ValidationErrorHandler>>,
    status: StatusCode,
}

impl<S> Service<Request<Body>> for ValidationErrorService<S>
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
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let handler = self.handler.clone();
        let status = self.status;
        let head = handler.as_ref().map(|_| RequestHead::capture(&request));

        Box::pin(async move {
            let response = inner.call(request).await?;

            let Some(error) = RouteError::from_response(&response)
                .and_then(|forwarded| forwarded.downcast_ref::<ValidationError>())
                .cloned()
            else {
                return Ok(response);
            };

            match (handler, head) {
                (Some(handler), Some(head)) => {
                    debug!(uri = %head.uri, "Passing validation error to custom handler");
                    Ok(handler.handle(error, head, ErrorNext { response }).await)
                }
                _ => {
                    debug!(issues = error.issues().len(), "Formatting validation error");
                    Ok(default_response(&error, status))
                }
            }
        })
    }
}
