//! Configuration for the schemaguard middleware
//!
//! Settings are split by domain (validation, logging), each with serde
//! defaults and its own validation rules. [`ConfigLoader`] reads an optional
//! YAML file and applies environment variable overrides on top.

pub mod domains;
pub mod error;
pub mod loader;
pub mod validation;

pub use domains::{
    logging::{LogFormat, LogLevel, LoggingConfig},
    validation::ValidationConfig,
    GuardConfig,
};
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use validation::Validatable;
