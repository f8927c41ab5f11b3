//! Domain-specific configuration modules

pub mod logging;
pub mod validation;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Top-level configuration combining all domains
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GuardConfig {
    /// Validation middleware configuration
    #[serde(default)]
    pub validation: validation::ValidationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,
}

impl GuardConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.validation.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let sample = GuardConfig::default();
        serde_yaml::to_string(&sample).unwrap_or_else(|_| "# Failed to generate sample".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: GuardConfig = serde_yaml::from_str("validation:\n  error_status: 422\n").unwrap();

        assert_eq!(config.validation.error_status, 422);
        assert_eq!(config.validation.body_limit, 2 * 1024 * 1024);
        assert_eq!(config.logging, logging::LoggingConfig::default());
        assert!(config.validate_all().is_ok());
    }

    #[test]
    fn test_sample_parses_back() {
        let sample = GuardConfig::generate_sample();
        let parsed: GuardConfig = serde_yaml::from_str(&sample).unwrap();
        assert_eq!(parsed, GuardConfig::default());
    }
}
