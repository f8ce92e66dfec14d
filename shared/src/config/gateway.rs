//! OTP gateway configuration module

use serde::{Deserialize, Serialize};

/// Message sent to the patient; `{otp}` is filled in by the gateway itself
pub const DEFAULT_MESSAGE_TEMPLATE: &str = "Dear {patient_name}, {otp} is the OTP to share your health record for check-in. It is valid for {expiry_minutes} minutes. Do not share it with anyone else.";

/// External OTP gateway configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
    /// Base URL of the OTP gateway (scheme, host and optional prefix)
    pub base_url: String,

    /// Path of the "issue OTP" endpoint
    #[serde(default = "default_send_otp_path")]
    pub send_otp_path: String,

    /// Path of the "validate OTP" endpoint
    #[serde(default = "default_validate_otp_path")]
    pub validate_otp_path: String,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// SMS template with `{patient_name}`, `{expiry_minutes}` and `{otp}` placeholders
    #[serde(default = "default_message_template")]
    pub message_template: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("http://localhost:8080/openmrs/ws/rest/v1"),
            send_otp_path: default_send_otp_path(),
            validate_otp_path: default_validate_otp_path(),
            request_timeout_secs: default_request_timeout_secs(),
            message_template: default_message_template(),
        }
    }
}

impl GatewayConfig {
    /// Create a new gateway configuration with base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("OTP_GATEWAY_BASE_URL").unwrap_or(defaults.base_url),
            send_otp_path: std::env::var("OTP_GATEWAY_SEND_PATH").unwrap_or(defaults.send_otp_path),
            validate_otp_path: std::env::var("OTP_GATEWAY_VALIDATE_PATH")
                .unwrap_or(defaults.validate_otp_path),
            request_timeout_secs: std::env::var("OTP_GATEWAY_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.request_timeout_secs),
            message_template: std::env::var("OTP_MESSAGE_TEMPLATE")
                .unwrap_or(defaults.message_template),
        }
    }

    /// Set the request timeout in seconds
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Set the SMS template
    pub fn with_message_template(mut self, template: impl Into<String>) -> Self {
        self.message_template = template.into();
        self
    }

    /// Request timeout as a `Duration`
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    /// Full URL of the "issue OTP" endpoint
    pub fn send_otp_url(&self) -> String {
        join_url(&self.base_url, &self.send_otp_path)
    }

    /// Full URL of the "validate OTP" endpoint
    pub fn validate_otp_url(&self) -> String {
        join_url(&self.base_url, &self.validate_otp_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn default_send_otp_path() -> String {
    String::from("/send-otp")
}

fn default_validate_otp_path() -> String {
    String::from("/validate-otp")
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_message_template() -> String {
    DEFAULT_MESSAGE_TEMPLATE.to_string()
}
