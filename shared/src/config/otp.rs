//! OTP session configuration module

use serde::{Deserialize, Serialize};

/// Default lifetime of an issued OTP in minutes
pub const DEFAULT_EXPIRY_MINUTES: f64 = 5.0;

/// Default interval between background sweeps of expired sessions
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 120;

/// Longest lifetime accepted for an OTP (one day)
pub const MAX_EXPIRY_MINUTES: f64 = 24.0 * 60.0;

/// OTP lifetime in whole milliseconds, if `minutes` is usable
///
/// The value must be finite, at most [`MAX_EXPIRY_MINUTES`] and round to at
/// least one millisecond.
pub fn expiry_millis(minutes: f64) -> Option<i64> {
    if !minutes.is_finite() || minutes <= 0.0 || minutes > MAX_EXPIRY_MINUTES {
        return None;
    }
    let millis = (minutes * 60_000.0).round();
    if millis < 1.0 {
        return None;
    }
    Some(millis as i64)
}

/// OTP verification session configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OtpConfig {
    /// Minutes an issued OTP stays valid
    #[serde(default = "default_expiry_minutes")]
    pub expiry_minutes: f64,

    /// Seconds between background sweeps of expired sessions
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,

    /// Whether the background sweep runs at all
    #[serde(default = "default_cleanup_enabled")]
    pub cleanup_enabled: bool,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            expiry_minutes: default_expiry_minutes(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            cleanup_enabled: default_cleanup_enabled(),
        }
    }
}

impl OtpConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        Self {
            expiry_minutes: std::env::var("OTP_EXPIRY_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_expiry_minutes),
            cleanup_interval_secs: std::env::var("OTP_CLEANUP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_cleanup_interval_secs),
            cleanup_enabled: std::env::var("OTP_CLEANUP_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_cleanup_enabled),
        }
    }

    /// Set the OTP lifetime in minutes
    pub fn with_expiry_minutes(mut self, minutes: f64) -> Self {
        self.expiry_minutes = minutes;
        self
    }

    /// Set the background sweep interval in seconds
    pub fn with_cleanup_interval_secs(mut self, secs: u64) -> Self {
        self.cleanup_interval_secs = secs;
        self
    }

    /// Sweep interval as a `Duration`
    pub fn cleanup_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cleanup_interval_secs)
    }
}

fn default_expiry_minutes() -> f64 {
    DEFAULT_EXPIRY_MINUTES
}

fn default_cleanup_interval_secs() -> u64 {
    DEFAULT_CLEANUP_INTERVAL_SECS
}

fn default_cleanup_enabled() -> bool {
    true
}
