//! Tracing subscriber setup driven by [`schemaguard_config::LoggingConfig`]

pub mod init;

pub use init::{build_env_filter, init_logging_from_config, init_simple_tracing};
