//! Verification session module for OTP-gated record access
//!
//! This module provides the OTP verification workflow:
//! - Issuing an OTP through the external gateway and opening a session
//! - Verifying a submitted code with pessimistic attempt charging
//! - Expiry and attempt-limit enforcement
//! - Read-only session queries for countdowns and attempt counters

mod config;
mod store;
mod traits;
mod types;

#[cfg(test)]
pub(crate) mod tests;

pub use config::VerificationConfig;
pub use store::VerificationSessionStore;
pub use traits::OtpGateway;
pub use types::{IssueOtpRequest, IssuedOtp, OtpRequested};
