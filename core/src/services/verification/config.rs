//! Configuration for the verification services

use std::time::Duration;

use sv_shared::config::OtpConfig;

use crate::domain::entities::verification_session::DEFAULT_EXPIRY_MINUTES;

/// Configuration shared by the verification flow and the cleanup scheduler
#[derive(Debug, Clone)]
pub struct VerificationConfig {
    /// Minutes an issued OTP stays valid
    pub expiry_minutes: f64,
    /// How often the background sweep runs
    pub cleanup_interval: Duration,
    /// Whether the background sweep runs at all
    pub cleanup_enabled: bool,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            expiry_minutes: DEFAULT_EXPIRY_MINUTES,
            cleanup_interval: Duration::from_secs(120),
            cleanup_enabled: true,
        }
    }
}

impl From<&OtpConfig> for VerificationConfig {
    fn from(config: &OtpConfig) -> Self {
        Self {
            expiry_minutes: config.expiry_minutes,
            cleanup_interval: config.cleanup_interval(),
            cleanup_enabled: config.cleanup_enabled,
        }
    }
}
