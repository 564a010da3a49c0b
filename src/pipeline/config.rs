//! Configuration for the pipeline sequencer.
//!
//! The configuration is read once at process start and is read-only
//! afterwards; concurrent pipeline runs share it without locking.

use std::env;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration for one orchestrator process.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Bounded wait for a single task execution.
    pub step_timeout: Duration,
    /// Credential injected into tasks that declare `needs_secret`.
    /// Read once at startup; never logged.
    pub worker_secret: Option<String>,
    /// Maximum size of captured diagnostic text in failure messages.
    pub diagnostic_limit: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            step_timeout: Duration::from_secs(300),
            worker_secret: None,
            diagnostic_limit: 500,
        }
    }
}

impl PipelineConfig {
    /// Loads configuration from environment variables, falling back to
    /// defaults.
    ///
    /// Reads:
    /// - `LLM_API_KEY`: worker credential (optional)
    /// - `PIPEFORGE_STEP_TIMEOUT_SECS`: per-step timeout in seconds (optional)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        config.worker_secret = env::var("LLM_API_KEY").ok().filter(|v| !v.is_empty());

        if let Ok(value) = env::var("PIPEFORGE_STEP_TIMEOUT_SECS") {
            let seconds: u64 = value.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PIPEFORGE_STEP_TIMEOUT_SECS".to_string(),
                message: format!("'{value}' is not a valid number of seconds"),
            })?;
            config.step_timeout = Duration::from_secs(seconds);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.step_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "step_timeout must be greater than zero".to_string(),
            ));
        }

        if self.diagnostic_limit == 0 {
            return Err(ConfigError::ValidationFailed(
                "diagnostic_limit must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Sets the per-step timeout.
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// Sets the worker credential.
    pub fn with_worker_secret(mut self, secret: impl Into<String>) -> Self {
        self.worker_secret = Some(secret.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.step_timeout, Duration::from_secs(300));
        assert_eq!(config.diagnostic_limit, 500);
        assert!(config.worker_secret.is_none());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = PipelineConfig::default().with_step_timeout(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_builder_methods() {
        let config = PipelineConfig::default()
            .with_step_timeout(Duration::from_secs(60))
            .with_worker_secret("sk-test");

        assert_eq!(config.step_timeout, Duration::from_secs(60));
        assert_eq!(config.worker_secret.as_deref(), Some("sk-test"));
    }
}
