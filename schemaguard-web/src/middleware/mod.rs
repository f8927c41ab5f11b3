pub mod error_handler;
pub mod validate;

// Re-export layer creation functions
pub use error_handler::{
    default_response, validation_errors, validation_errors_with, ErrorNext, RequestHead, ValidationErrorBody,
    ValidationErrorDetails, ValidationErrorHandler, ValidationErrorLayer, ValidationErrorService,
};
pub use validate::{validate, ValidateLayer, ValidateService};
