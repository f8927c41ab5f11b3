//! Configuration loading and environment variable handling

use crate::domains::GuardConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use std::str::FromStr;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "SCHEMAGUARD".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<GuardConfig> {
        let content = std::fs::read_to_string(path)?;
        let mut config: GuardConfig = serde_yaml::from_str(&content)?;

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<GuardConfig> {
        let mut config = GuardConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<GuardConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut GuardConfig) -> ConfigResult<()> {
        self.apply_validation_overrides(&mut config.validation)?;
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    /// Apply validation config overrides
    fn apply_validation_overrides(
        &self,
        config: &mut crate::domains::validation::ValidationConfig,
    ) -> ConfigResult<()> {
        if let Ok(limit) = self.get_env_var("BODY_LIMIT") {
            config.body_limit = limit
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid BODY_LIMIT: {}", e)))?;
        }

        if let Ok(status) = self.get_env_var("ERROR_STATUS") {
            config.error_status = status
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid ERROR_STATUS: {}", e)))?;
        }

        Ok(())
    }

    /// Apply logging config overrides
    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = crate::domains::logging::LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = crate::domains::logging::LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        if let Ok(filter) = self.get_env_var("LOG_FILTER") {
            config.filter = Some(filter);
        }

        Ok(())
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::logging::{LogFormat, LogLevel};
    use std::io::Write;

    #[test]
    fn test_from_env_overrides_defaults() {
        temp_env::with_vars(
            [
                ("SGTEST_BODY_LIMIT", Some("1024")),
                ("SGTEST_ERROR_STATUS", Some("422")),
                ("SGTEST_LOG_LEVEL", Some("debug")),
                ("SGTEST_LOG_FORMAT", Some("json")),
            ],
            || {
                let config = ConfigLoader::with_prefix("SGTEST").from_env().unwrap();
                assert_eq!(config.validation.body_limit, 1024);
                assert_eq!(config.validation.error_status, 422);
                assert_eq!(config.logging.level, LogLevel::Debug);
                assert_eq!(config.logging.format, LogFormat::Json);
            },
        );
    }

    #[test]
    fn test_invalid_env_value_is_reported() {
        temp_env::with_var("SGBAD_ERROR_STATUS", Some("teapot"), || {
            let err = ConfigLoader::with_prefix("SGBAD").from_env().unwrap_err();
            assert!(matches!(err, ConfigError::EnvError(_)));
        });
    }

    #[test]
    fn test_env_overrides_are_validated() {
        temp_env::with_var("SGRANGE_ERROR_STATUS", Some("204"), || {
            let err = ConfigLoader::with_prefix("SGRANGE").from_env().unwrap_err();
            assert!(matches!(err, ConfigError::DomainError { .. }));
        });
    }

    #[test]
    fn test_from_file_then_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "validation:\n  body_limit: 4096\nlogging:\n  level: warn\n  filter: tower=error"
        )
        .unwrap();

        temp_env::with_var("SGFILE_BODY_LIMIT", Some("8192"), || {
            let config = ConfigLoader::with_prefix("SGFILE")
                .load(Some(file.path()))
                .unwrap();
            assert_eq!(config.validation.body_limit, 8192);
            assert_eq!(config.validation.error_status, 400);
            assert_eq!(config.logging.level, LogLevel::Warn);
            assert_eq!(config.logging.filter.as_deref(), Some("tower=error"));
        });
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = ConfigLoader::new()
            .from_file("/definitely/not/here.yaml")
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileReadError(_)));
    }
}
