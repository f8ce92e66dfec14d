//! # Verification Core
//!
//! Domain layer of the OTP phone-verification subsystem that gates access to a
//! patient's shared health record before check-in. This crate contains the
//! verification session entity, the error taxonomy, the session store with its
//! background cleanup scheduler, and the per-phone verification flow.
//!
//! The external OTP gateway is reached only through the [`OtpGateway`] trait;
//! the HTTP implementation lives in the infra crate.

pub mod domain;
pub mod errors;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::*;
pub use errors::*;
pub use services::*;
