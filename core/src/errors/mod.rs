//! Verification error types and error handling.
//!
//! Every variant is recoverable by the user: the UI re-prompts or asks for a
//! fresh OTP. None of them should take the process down.

use thiserror::Error;

/// Errors surfaced by the verification session store, gateway and flow
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("No OTP session found for {phone}. Please request a new OTP")]
    NoSession { phone: String },

    #[error("OTP has expired. Please request a new OTP")]
    Expired,

    #[error("Maximum verification attempts exceeded. Please request a new OTP")]
    MaxAttemptsExceeded,

    #[error("Invalid OTP. {remaining_attempts} attempt(s) remaining")]
    InvalidOtp { remaining_attempts: u32 },

    #[error("OTP gateway error: {message}")]
    Gateway {
        status: Option<u16>,
        message: String,
    },

    #[error("Malformed OTP gateway response: {reason}")]
    MalformedResponse { reason: String },

    #[error("Invalid phone number: {phone}")]
    InvalidPhone { phone: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("OTP request superseded by a newer request for the same number")]
    Superseded,
}

impl VerificationError {
    /// Gateway failure without an HTTP status (transport, timeout, rejection)
    pub fn gateway(message: impl Into<String>) -> Self {
        VerificationError::Gateway {
            status: None,
            message: message.into(),
        }
    }

    /// Gateway failure carrying the upstream HTTP status
    pub fn gateway_status(status: u16, message: impl Into<String>) -> Self {
        VerificationError::Gateway {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        VerificationError::MalformedResponse {
            reason: reason.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        VerificationError::InvalidRequest {
            message: message.into(),
        }
    }

    /// Stable code for programmatic handling by the UI
    pub fn error_code(&self) -> &'static str {
        match self {
            VerificationError::NoSession { .. } => "NO_SESSION",
            VerificationError::Expired => "OTP_EXPIRED",
            VerificationError::MaxAttemptsExceeded => "MAX_ATTEMPTS_EXCEEDED",
            VerificationError::InvalidOtp { .. } => "INVALID_OTP",
            VerificationError::Gateway { .. } => "GATEWAY_ERROR",
            VerificationError::MalformedResponse { .. } => "MALFORMED_RESPONSE",
            VerificationError::InvalidPhone { .. } => "INVALID_PHONE",
            VerificationError::InvalidRequest { .. } => "INVALID_REQUEST",
            VerificationError::Superseded => "REQUEST_SUPERSEDED",
        }
    }

    /// Whether the session is gone and a new OTP must be requested
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            VerificationError::NoSession { .. }
                | VerificationError::Expired
                | VerificationError::MaxAttemptsExceeded
        )
    }
}

pub type VerificationResult<T> = Result<T, VerificationError>;

#[cfg(test)]
mod tests;
