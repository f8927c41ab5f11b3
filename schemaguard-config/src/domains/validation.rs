//! Request validation configuration

use serde::{Deserialize, Serialize};

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_range, Validatable};

/// Settings for the validation and validation-error middleware
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Largest request body buffered for validation, in bytes
    pub body_limit: usize,

    /// Status code of the default validation error response
    pub error_status: u16,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            body_limit: default_body_limit(),
            error_status: 400,
        }
    }
}

fn default_body_limit() -> usize {
    2 * 1024 * 1024 // 2MB, same as axum's default body limit
}

impl Validatable for ValidationConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.body_limit, "body_limit", self.domain_name())?;
        validate_range(self.error_status, 400, 599, "error_status", self.domain_name())?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "validation"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ValidationConfig::default();
        assert_eq!(config.error_status, 400);
        assert_eq!(config.body_limit, 2 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_success_status() {
        let config = ValidationConfig {
            error_status: 200,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_body_limit() {
        let config = ValidationConfig {
            body_limit: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
