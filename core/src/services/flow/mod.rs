//! Per-phone verification flow driven by the UI
//!
//! ```text
//! Landing --request_otp--> OtpRequested --verify ok--> Verified
//!    ^                          |
//!    +--- countdown expiry / exhaustion / change_number / cancel
//! ```

mod machine;
mod state;

#[cfg(test)]
mod tests;

pub use machine::VerificationFlow;
pub use state::{FlowOutcome, FlowState};
