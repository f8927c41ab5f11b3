//! Schema capability used by the schemaguard middleware
//!
//! A [`Schema`] validates a JSON value and returns its parsed (possibly
//! coerced) form, or a [`ValidationError`] listing what is wrong and where.
//! Three backends are provided:
//!
//! - [`TypedSchema`]: Rust types deriving `Deserialize` and `validator::Validate`
//! - [`JsonSchema`]: JSON Schema documents via the `jsonschema` crate
//! - [`FnSchema`]: async closures, for custom refinements

pub mod error;
pub mod json_schema;
pub mod schema;
pub mod typed;

pub use error::{FlattenedErrors, Issue, PathSegment, ValidationError};
pub use json_schema::{JsonSchema, SchemaCompileError};
pub use schema::{schema_fn, FnSchema, Schema};
pub use typed::{from_validation_errors, typed, TypedSchema};

// Schema types must implement this crate's version of `Validate`
pub use validator;
