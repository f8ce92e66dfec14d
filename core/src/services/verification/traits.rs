//! Port for the external OTP gateway

use async_trait::async_trait;

use crate::errors::VerificationResult;

use super::types::{IssueOtpRequest, IssuedOtp};

/// External service that issues and validates OTPs
///
/// The OTP code is generated, delivered and checked entirely on the gateway
/// side; callers only ever see the opaque reference in [`IssuedOtp`].
#[async_trait]
pub trait OtpGateway: Send + Sync {
    /// Send a fresh OTP to the patient's phone
    async fn issue_otp(&self, request: &IssueOtpRequest) -> VerificationResult<IssuedOtp>;

    /// Check a submitted code against a previously issued OTP
    ///
    /// Returns `Ok(true)` only when the gateway confirms the code.
    async fn validate_otp(&self, external_otp_id: &str, code: &str) -> VerificationResult<bool>;
}
