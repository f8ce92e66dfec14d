//! In-memory verification session store

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use sv_shared::phone::{canonical_phone_number, mask_phone_number};

use crate::domain::entities::verification_session::{
    expiry_duration_from_minutes, PatientContext, VerificationSession, MAX_ATTEMPTS,
};
use crate::errors::{VerificationError, VerificationResult};
use crate::services::clock::Clock;

use super::traits::OtpGateway;
use super::types::{IssueOtpRequest, OtpRequested};

/// Store of in-flight OTP sessions, one per canonical phone number
///
/// The map lock is only held for in-memory reads and mutations, never across
/// a gateway call, so operations on different phone numbers do not wait on
/// each other's network round trips.
///
/// # Attempt charging
///
/// `verify_otp` charges the attempt *before* calling the gateway. A remote
/// call that hangs or fails still consumes an attempt, which keeps the
/// number of codes that can be tried against one OTP bounded by
/// [`MAX_ATTEMPTS`] even under partial failure.
///
/// # Overlapping requests
///
/// Each `request_otp` takes a ticket for its phone number before calling the
/// gateway. Only the holder of the latest ticket may write its session, so an
/// older request that completes last never overwrites a newer one.
pub struct VerificationSessionStore<G: OtpGateway> {
    /// Gateway that issues and validates OTPs
    gateway: Arc<G>,
    /// Time source for expiry decisions
    clock: Arc<dyn Clock>,
    /// Sessions keyed by canonical phone number
    sessions: RwLock<HashMap<String, VerificationSession>>,
    /// Latest in-flight request ticket per canonical phone number
    issue_tickets: Mutex<HashMap<String, u64>>,
    next_ticket: AtomicU64,
}

impl<G: OtpGateway> VerificationSessionStore<G> {
    /// Create a new session store
    ///
    /// # Arguments
    ///
    /// * `gateway` - OTP gateway implementation
    /// * `clock` - Time source used for expiry
    pub fn new(gateway: Arc<G>, clock: Arc<dyn Clock>) -> Self {
        Self {
            gateway,
            clock,
            sessions: RwLock::new(HashMap::new()),
            issue_tickets: Mutex::new(HashMap::new()),
            next_ticket: AtomicU64::new(1),
        }
    }

    /// Issue an OTP and open (or replace) the session for `phone`
    ///
    /// On gateway failure no session is created and the gateway error is
    /// returned unchanged. There is no retry here; resending is a caller
    /// decision and simply replaces the session.
    ///
    /// If a newer request for the same number started while this one was
    /// waiting on the gateway, the result is discarded and `Superseded` is
    /// returned.
    ///
    /// # Arguments
    ///
    /// * `phone` - Phone number in any common format
    /// * `patient_name` - Name used in the SMS template
    /// * `expiry_minutes` - OTP lifetime, fractional minutes allowed
    /// * `national_id` - Optional national health identifier
    pub async fn request_otp(
        &self,
        phone: &str,
        patient_name: &str,
        expiry_minutes: f64,
        national_id: Option<&str>,
    ) -> VerificationResult<OtpRequested> {
        let phone_number = Self::canonical(phone)?;
        let expiry = expiry_duration_from_minutes(expiry_minutes).ok_or_else(|| {
            VerificationError::invalid_request(format!(
                "OTP expiry must be between one millisecond and one day, got {} minutes",
                expiry_minutes
            ))
        })?;
        let national_id = national_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        let request = IssueOtpRequest {
            phone_number: phone_number.clone(),
            patient_name: patient_name.trim().to_string(),
            expiry_minutes,
            national_id: national_id.clone(),
        };

        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst);
        self.issue_tickets
            .lock()
            .await
            .insert(phone_number.clone(), ticket);

        let issued = match self.gateway.issue_otp(&request).await {
            Ok(issued) => issued,
            Err(e) => {
                self.release_ticket(&phone_number, ticket).await;
                tracing::error!(
                    phone = %mask_phone_number(&phone_number),
                    error = %e,
                    event = "otp_request_failed",
                    "OTP gateway failed to issue an OTP"
                );
                return Err(e);
            }
        };

        let session = VerificationSession::new(
            phone_number.clone(),
            issued.external_otp_id,
            self.clock.now(),
            expiry,
            PatientContext::new(request.patient_name, national_id),
        );
        let session_id = session.session_id;
        let expires_at = session.expires_at();

        let replaced_existing = {
            let mut sessions = self.sessions.write().await;
            if !self.release_ticket(&phone_number, ticket).await {
                tracing::warn!(
                    phone = %mask_phone_number(&phone_number),
                    external_otp_id = %session.external_otp_id,
                    event = "otp_request_superseded",
                    "OTP issued for a request overtaken by a newer one; result discarded"
                );
                return Err(VerificationError::Superseded);
            }
            sessions.insert(phone_number.clone(), session).is_some()
        };

        tracing::info!(
            phone = %mask_phone_number(&phone_number),
            session_id = %session_id,
            replaced_existing = replaced_existing,
            expires_at = %expires_at,
            event = "otp_requested",
            "Opened OTP verification session"
        );

        Ok(OtpRequested {
            phone_number,
            session_id,
            expires_at,
            message: issued.message,
            replaced_existing,
        })
    }

    /// Verify a submitted code for `phone`
    ///
    /// Returns `Ok(true)` on success; every failure is an error, never a bare
    /// `false`.
    ///
    /// # Errors
    ///
    /// * `NoSession` - no session exists (or it was replaced mid-validation)
    /// * `Expired` - the session outlived its lifetime; it is deleted
    /// * `MaxAttemptsExceeded` - the attempt budget is spent; it is deleted
    /// * `InvalidOtp` - the gateway rejected the code or failed; the session
    ///   is kept with its charged attempt
    pub async fn verify_otp(&self, phone: &str, code: &str) -> VerificationResult<bool> {
        let phone_number = Self::canonical(phone)?;
        let masked = mask_phone_number(&phone_number);

        let (session_id, external_otp_id, attempts) = {
            let mut sessions = self.sessions.write().await;
            let now = self.clock.now();

            let Some(session) = sessions.get_mut(&phone_number) else {
                tracing::warn!(
                    phone = %masked,
                    event = "otp_session_missing",
                    "Verification attempted without an OTP session"
                );
                return Err(VerificationError::NoSession { phone: masked });
            };

            if session.is_expired(now) {
                sessions.remove(&phone_number);
                tracing::warn!(
                    phone = %masked,
                    event = "otp_expired",
                    "Verification attempted on an expired OTP; session removed"
                );
                return Err(VerificationError::Expired);
            }

            let attempts = session.record_attempt();
            if session.attempts_exceeded() {
                sessions.remove(&phone_number);
                tracing::error!(
                    phone = %masked,
                    attempts = attempts,
                    event = "max_attempts_exceeded",
                    "Maximum verification attempts exceeded; session removed"
                );
                return Err(VerificationError::MaxAttemptsExceeded);
            }

            (session.session_id, session.external_otp_id.clone(), attempts)
        };

        let outcome = self.gateway.validate_otp(&external_otp_id, code).await;

        match outcome {
            Ok(true) => {
                if self.remove_if_current(&phone_number, session_id).await {
                    tracing::info!(
                        phone = %masked,
                        session_id = %session_id,
                        event = "otp_verified_success",
                        "OTP successfully verified"
                    );
                    Ok(true)
                } else {
                    tracing::warn!(
                        phone = %masked,
                        session_id = %session_id,
                        event = "otp_verification_stale",
                        "OTP validated for a session that was replaced or removed; result discarded"
                    );
                    Err(VerificationError::NoSession { phone: masked })
                }
            }
            rejected => {
                match &rejected {
                    Err(e) => tracing::warn!(
                        phone = %masked,
                        error = %e,
                        attempts = attempts,
                        event = "otp_validation_error",
                        "OTP gateway failed during validation; attempt still charged"
                    ),
                    Ok(_) => tracing::warn!(
                        phone = %masked,
                        attempts = attempts,
                        event = "otp_verification_failed",
                        "OTP rejected by gateway"
                    ),
                }

                let remaining_attempts = MAX_ATTEMPTS.saturating_sub(attempts);
                let still_current = if remaining_attempts == 0 {
                    self.remove_if_current(&phone_number, session_id).await
                } else {
                    self.is_current(&phone_number, session_id).await
                };

                if !still_current {
                    tracing::warn!(
                        phone = %masked,
                        session_id = %session_id,
                        event = "otp_verification_stale",
                        "OTP rejected for a session that was replaced or removed; result discarded"
                    );
                    Err(VerificationError::NoSession { phone: masked })
                } else if remaining_attempts == 0 {
                    tracing::error!(
                        phone = %masked,
                        event = "max_attempts_exceeded",
                        "Last verification attempt failed; session removed"
                    );
                    Err(VerificationError::MaxAttemptsExceeded)
                } else {
                    Err(VerificationError::InvalidOtp { remaining_attempts })
                }
            }
        }
    }

    /// Remove every session past its expiry
    ///
    /// Pure housekeeping: never fails. Returns the number of removed sessions.
    pub async fn cleanup_expired_otps(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let now = self.clock.now();
        let before = sessions.len();

        sessions.retain(|phone, session| {
            if session.created_at > now {
                tracing::warn!(
                    phone = %mask_phone_number(phone),
                    session_id = %session.session_id,
                    event = "otp_session_clock_skew",
                    "Session created in the future; skipped by sweep"
                );
                return true;
            }
            if session.is_expired(now) {
                tracing::debug!(
                    phone = %mask_phone_number(phone),
                    session_id = %session.session_id,
                    event = "otp_session_swept",
                    "Removed expired OTP session"
                );
                return false;
            }
            true
        });

        before - sessions.len()
    }

    /// Whether `phone` has a live session that can still be verified
    pub async fn has_valid_otp(&self, phone: &str) -> bool {
        let now = self.clock.now();
        self.with_session(phone, |session| {
            !session.is_expired(now) && session.remaining_attempts() > 0
        })
        .await
        .unwrap_or(false)
    }

    /// Whole minutes left on the session for `phone`, rounded up; 0 if none
    pub async fn get_remaining_time_minutes(&self, phone: &str) -> u64 {
        let now = self.clock.now();
        self.with_session(phone, |session| session.remaining_time_minutes(now))
            .await
            .unwrap_or(0)
    }

    /// Time left on the session for `phone`; zero if none
    pub async fn remaining_time(&self, phone: &str) -> std::time::Duration {
        let now = self.clock.now();
        self.with_session(phone, |session| {
            session
                .remaining_time(now)
                .to_std()
                .unwrap_or(std::time::Duration::ZERO)
        })
        .await
        .unwrap_or(std::time::Duration::ZERO)
    }

    /// Verification attempts left for `phone`; 0 if no live session
    pub async fn get_remaining_attempts(&self, phone: &str) -> u32 {
        let now = self.clock.now();
        self.with_session(phone, |session| {
            if session.is_expired(now) {
                0
            } else {
                session.remaining_attempts()
            }
        })
        .await
        .unwrap_or(0)
    }

    /// Snapshot of the session for `phone`, if any
    pub async fn session(&self, phone: &str) -> Option<VerificationSession> {
        self.with_session(phone, |session| session.clone()).await
    }

    /// Delete the session for `phone`; returns whether one existed
    pub async fn clear_session(&self, phone: &str) -> bool {
        let Some(phone_number) = canonical_phone_number(phone) else {
            return false;
        };
        let removed = self.sessions.write().await.remove(&phone_number).is_some();
        if removed {
            tracing::info!(
                phone = %mask_phone_number(&phone_number),
                event = "otp_session_cleared",
                "Cleared OTP verification session"
            );
        }
        removed
    }

    /// Number of sessions currently held, expired ones included
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn with_session<T>(
        &self,
        phone: &str,
        f: impl FnOnce(&VerificationSession) -> T,
    ) -> Option<T> {
        let phone_number = canonical_phone_number(phone)?;
        self.sessions.read().await.get(&phone_number).map(f)
    }

    async fn is_current(&self, phone_number: &str, session_id: Uuid) -> bool {
        self.sessions
            .read()
            .await
            .get(phone_number)
            .is_some_and(|current| current.session_id == session_id)
    }

    /// Drop `ticket` for `phone_number`; returns whether it was still the latest
    async fn release_ticket(&self, phone_number: &str, ticket: u64) -> bool {
        let mut tickets = self.issue_tickets.lock().await;
        if tickets.get(phone_number) == Some(&ticket) {
            tickets.remove(phone_number);
            true
        } else {
            false
        }
    }

    /// Delete the session only if it is still the one identified by `session_id`
    async fn remove_if_current(&self, phone_number: &str, session_id: Uuid) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get(phone_number) {
            Some(current) if current.session_id == session_id => {
                sessions.remove(phone_number);
                true
            }
            _ => false,
        }
    }

    fn canonical(phone: &str) -> VerificationResult<String> {
        canonical_phone_number(phone).ok_or_else(|| VerificationError::InvalidPhone {
            phone: mask_phone_number(phone),
        })
    }
}
