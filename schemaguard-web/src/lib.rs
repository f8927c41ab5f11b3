//! # Schemaguard Web
//!
//! Request validation middleware for Axum. A route declares schemas for its
//! JSON body, path params, and query string; the [`validate`] layer checks
//! each request against them and hands the handler the parsed values. Failed
//! validation travels outward as an error, and the [`validation_errors`]
//! layer turns it into a `400` with the messages grouped by field.
//!
//! ## Features
//!
//! - **Middleware**: request validation and validation error formatting
//! - **Extractors**: typed access to the parsed body, params, and query
//! - **Errors**: an error chain that lets outer layers handle forwarded errors
//!
//! ## Example
//!
//! ```rust,no_run
//! use axum::{routing::post, Router};
//! use schemaguard_web::{typed, validate, validation_errors, SchemaSet, ValidBody};
//! use serde::{Deserialize, Serialize};
//! use validator::Validate;
//!
//! #[derive(Deserialize, Serialize, Validate)]
//! struct CreateUser {
//!     #[validate(length(min = 1))]
//!     name: String,
//!     age: u32,
//! }
//!
//! async fn create_user(ValidBody(user): ValidBody<CreateUser>) -> String {
//!     format!("created {}", user.name)
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let app: Router = Router::new()
//!     .route("/users", post(create_user))
//!     .route_layer(validate(SchemaSet::new().body(typed::<CreateUser>())))
//!     .layer(validation_errors());
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//! axum::serve(listener, app).await.unwrap();
//! # }
//! ```

pub mod context;
pub mod errors;
pub mod extractors;
pub mod middleware;

// Re-export commonly used types and functions
pub use context::{RequestContext, SchemaSet, Slot};
pub use errors::{RouteError, WebError, WebResult};
pub use extractors::{ValidBody, ValidParams, ValidQuery};
pub use middleware::{
    validate, validation_errors, validation_errors_with, ErrorNext, RequestHead, ValidateLayer,
    ValidationErrorHandler, ValidationErrorLayer,
};
pub use schemaguard_schema::{schema_fn, typed, Issue, JsonSchema, Schema, ValidationError};
