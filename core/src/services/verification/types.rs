//! Types for verification requests and results

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Parameters passed to the gateway when issuing an OTP
#[derive(Debug, Clone, PartialEq)]
pub struct IssueOtpRequest {
    /// Canonical phone number to send the OTP to
    pub phone_number: String,
    /// Patient name used in the SMS template
    pub patient_name: String,
    /// Minutes the OTP stays valid, shown in the SMS
    pub expiry_minutes: f64,
    /// National health identifier, forwarded when present
    pub national_id: Option<String>,
}

/// Successful gateway response to an issue request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedOtp {
    /// Opaque reference used later for validation
    pub external_otp_id: String,
    /// Human-readable message from the gateway
    pub message: String,
}

/// Result of opening a verification session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpRequested {
    /// Canonical phone number the session is keyed by
    pub phone_number: String,
    /// Identifier of the new session
    pub session_id: Uuid,
    /// When the OTP stops being accepted
    pub expires_at: DateTime<Utc>,
    /// Message returned by the gateway
    pub message: String,
    /// Whether an older session for the same number was replaced
    pub replaced_existing: bool,
}
