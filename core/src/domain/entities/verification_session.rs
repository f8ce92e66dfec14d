//! Verification session entity for OTP-gated record access.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of verification attempts allowed per issued OTP
pub const MAX_ATTEMPTS: u32 = 3;

/// Default lifetime of an issued OTP (5 minutes)
pub use sv_shared::config::otp::DEFAULT_EXPIRY_MINUTES;

/// Longest lifetime accepted for an OTP (one day)
pub use sv_shared::config::otp::MAX_EXPIRY_MINUTES;

/// Patient details carried to the gateway for auditing and message templating
///
/// Not part of session identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientContext {
    /// Display name used in the SMS template
    pub patient_name: String,

    /// National health identifier, when the patient has one
    pub national_id: Option<String>,
}

impl PatientContext {
    pub fn new(patient_name: impl Into<String>, national_id: Option<String>) -> Self {
        Self {
            patient_name: patient_name.into(),
            national_id,
        }
    }
}

/// One in-flight OTP verification for a phone number
///
/// The OTP code itself is never held here; the gateway keeps it and hands
/// back an opaque reference that is used for validation later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSession {
    /// Unique identifier, changes every time the session is replaced
    pub session_id: Uuid,

    /// Canonical phone number (session key)
    pub phone_number: String,

    /// Opaque reference returned by the OTP gateway
    pub external_otp_id: String,

    /// Timestamp when the OTP was issued
    pub created_at: DateTime<Utc>,

    /// Lifetime of the OTP in milliseconds
    pub expiry_duration_ms: i64,

    /// Number of verification attempts made
    pub attempts: u32,

    /// Patient details passed to the gateway
    pub context: PatientContext,
}

impl VerificationSession {
    /// Creates a fresh session with no attempts recorded
    pub fn new(
        phone_number: String,
        external_otp_id: String,
        created_at: DateTime<Utc>,
        expiry: Duration,
        context: PatientContext,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            phone_number,
            external_otp_id,
            created_at,
            expiry_duration_ms: expiry.num_milliseconds(),
            attempts: 0,
            context,
        }
    }

    /// Timestamp after which the session is expired
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::milliseconds(self.expiry_duration_ms)
    }

    /// A session is expired once strictly more than its lifetime has elapsed
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        (now - self.created_at).num_milliseconds() > self.expiry_duration_ms
    }

    /// Time left before expiry, never negative
    pub fn remaining_time(&self, now: DateTime<Utc>) -> Duration {
        let remaining = self.expires_at() - now;
        if remaining < Duration::zero() {
            Duration::zero()
        } else {
            remaining
        }
    }

    /// Whole minutes left before expiry, rounded up
    pub fn remaining_time_minutes(&self, now: DateTime<Utc>) -> u64 {
        let remaining_ms = self.remaining_time(now).num_milliseconds() as u64;
        remaining_ms.div_ceil(60_000)
    }

    /// Attempts left before the session is exhausted
    pub fn remaining_attempts(&self) -> u32 {
        MAX_ATTEMPTS.saturating_sub(self.attempts)
    }

    /// Charge one attempt and return the new attempt count
    pub fn record_attempt(&mut self) -> u32 {
        self.attempts = self.attempts.saturating_add(1);
        self.attempts
    }

    /// Whether the attempt budget has been overrun
    pub fn attempts_exceeded(&self) -> bool {
        self.attempts > MAX_ATTEMPTS
    }
}

/// Convert a (possibly fractional) minute count into a session lifetime
///
/// Returns `None` for non-finite, non-positive or over-long values.
pub fn expiry_duration_from_minutes(minutes: f64) -> Option<Duration> {
    sv_shared::config::otp::expiry_millis(minutes).map(Duration::milliseconds)
}
