//! Configuration module
//!
//! - `environment` - Deployment environment detection
//! - `gateway` - External OTP gateway endpoints, timeout and SMS template
//! - `logging` - Log level and output format
//! - `otp` - Session lifetime and background cleanup

pub mod environment;
pub mod gateway;
pub mod logging;
pub mod otp;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export commonly used types
pub use environment::Environment;
pub use gateway::GatewayConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use otp::OtpConfig;

/// Configuration validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    fn invalid(field: &str, reason: &str) -> Self {
        ConfigError::InvalidValue {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    #[serde(default)]
    pub environment: Environment,

    /// OTP session configuration
    #[serde(default)]
    pub otp: OtpConfig,

    /// OTP gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment
    ///
    /// A `.env` file is read first when present; real environment variables
    /// take precedence over it.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let environment = Environment::from_env();
        Self {
            environment,
            otp: OtpConfig::from_env(),
            gateway: GatewayConfig::from_env(),
            logging: LoggingConfig::for_environment(environment).with_env_overrides(),
        }
    }

    /// Reject values the services cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if otp::expiry_millis(self.otp.expiry_minutes).is_none() {
            return Err(ConfigError::invalid(
                "otp.expiry_minutes",
                "must be at least one millisecond and at most one day",
            ));
        }
        if self.otp.cleanup_interval_secs == 0 {
            return Err(ConfigError::invalid(
                "otp.cleanup_interval_secs",
                "must be at least one second",
            ));
        }
        if self.gateway.base_url.trim().is_empty() {
            return Err(ConfigError::invalid("gateway.base_url", "must not be empty"));
        }
        if self.environment.is_production() && !self.gateway.base_url.starts_with("https://") {
            return Err(ConfigError::invalid(
                "gateway.base_url",
                "must use https in production",
            ));
        }
        if self.gateway.request_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "gateway.request_timeout_secs",
                "must be at least one second",
            ));
        }
        Ok(())
    }
}
