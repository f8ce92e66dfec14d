//! Shared utilities and common types for the OTP verification services
//!
//! This crate provides functionality used by both the core and infra layers:
//! - Configuration types loaded from the environment
//! - Phone number canonicalisation and log masking

pub mod config;
pub mod utils;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, ConfigError, Environment, GatewayConfig, LogFormat, LoggingConfig, OtpConfig,
};
pub use utils::phone;
