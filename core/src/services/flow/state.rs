//! States and outcomes of a verification flow

use serde::{Deserialize, Serialize};

/// Where a verification flow currently is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlowState {
    /// Waiting for the user to request an OTP
    #[default]
    Landing,
    /// OTP sent, waiting for the user to enter it
    OtpRequested,
    /// Phone number verified; the caller tears the flow down
    Verified,
}

impl FlowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::Verified)
    }
}

impl std::fmt::Display for FlowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowState::Landing => write!(f, "landing"),
            FlowState::OtpRequested => write!(f, "otp-requested"),
            FlowState::Verified => write!(f, "verified"),
        }
    }
}

/// Result of an async flow operation
///
/// The flow may move on (number changed, cancelled, another call finished
/// first) while a gateway call is in flight. Such late results are reported
/// as `Superseded` and leave the flow state untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome<T> {
    /// The result was applied to the flow
    Applied(T),
    /// The flow changed while the call was in flight; the result was dropped
    Superseded,
}

impl<T> FlowOutcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, FlowOutcome::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            FlowOutcome::Applied(value) => Some(value),
            FlowOutcome::Superseded => None,
        }
    }
}
