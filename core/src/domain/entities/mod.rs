//! Domain entities representing core business objects.

pub mod verification_session;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use verification_session::{
    expiry_duration_from_minutes, PatientContext, VerificationSession, DEFAULT_EXPIRY_MINUTES,
    MAX_ATTEMPTS, MAX_EXPIRY_MINUTES,
};
