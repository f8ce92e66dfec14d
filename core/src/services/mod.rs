//! Business services containing the verification logic.

pub mod cleanup;
pub mod clock;
pub mod flow;
pub mod verification;

// Re-export commonly used types
pub use cleanup::{CleanupReport, CleanupScheduler};
pub use clock::{Clock, ManualClock, SystemClock};
pub use flow::{FlowOutcome, FlowState, VerificationFlow};
pub use verification::{
    IssueOtpRequest, IssuedOtp, OtpGateway, OtpRequested, VerificationConfig,
    VerificationSessionStore,
};
