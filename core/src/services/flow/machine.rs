//! Verification flow for a single phone number

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};

use sv_shared::phone::{canonical_phone_number, mask_phone_number};

use crate::domain::entities::verification_session::PatientContext;
use crate::errors::{VerificationError, VerificationResult};
use crate::services::verification::{
    OtpGateway, OtpRequested, VerificationConfig, VerificationSessionStore,
};

use super::state::{FlowOutcome, FlowState};

struct FlowInner {
    phone_number: String,
    state: FlowState,
    /// Bumped on every transition and on every new OTP request
    generation: u64,
}

/// Drives one phone number from landing through OTP entry to verified
///
/// The flow lock is never held across a gateway call. Each async operation
/// captures the generation it started under and only applies its result if
/// nothing moved the flow in the meantime; otherwise it reports
/// [`FlowOutcome::Superseded`].
pub struct VerificationFlow<G: OtpGateway> {
    store: Arc<VerificationSessionStore<G>>,
    patient: PatientContext,
    expiry_minutes: f64,
    inner: Mutex<FlowInner>,
    state_tx: watch::Sender<FlowState>,
}

impl<G: OtpGateway> VerificationFlow<G> {
    /// Create a flow in the `Landing` state
    ///
    /// # Errors
    ///
    /// `InvalidPhone` when `phone` cannot be canonicalised.
    pub fn new(
        store: Arc<VerificationSessionStore<G>>,
        patient: PatientContext,
        phone: &str,
        config: &VerificationConfig,
    ) -> VerificationResult<Self> {
        let phone_number = canonical(phone)?;
        let (state_tx, _) = watch::channel(FlowState::Landing);

        Ok(Self {
            store,
            patient,
            expiry_minutes: config.expiry_minutes,
            inner: Mutex::new(FlowInner {
                phone_number,
                state: FlowState::Landing,
                generation: 0,
            }),
            state_tx,
        })
    }

    /// Current state
    pub fn state(&self) -> FlowState {
        *self.state_tx.borrow()
    }

    /// Receiver that observes every state change
    pub fn subscribe(&self) -> watch::Receiver<FlowState> {
        self.state_tx.subscribe()
    }

    /// Canonical phone number the flow targets
    pub async fn phone_number(&self) -> String {
        self.inner.lock().await.phone_number.clone()
    }

    pub fn patient(&self) -> &PatientContext {
        &self.patient
    }

    /// Request an OTP for the current number
    ///
    /// Moves `Landing -> OtpRequested` on success. A gateway failure leaves
    /// the state unchanged and is returned as the error.
    pub async fn request_otp(&self) -> VerificationResult<FlowOutcome<OtpRequested>> {
        let (phone_number, generation) = {
            let mut inner = self.inner.lock().await;
            if inner.state == FlowState::Verified {
                return Err(VerificationError::invalid_request(
                    "phone number is already verified",
                ));
            }
            inner.generation += 1;
            (inner.phone_number.clone(), inner.generation)
        };

        let result = self
            .store
            .request_otp(
                &phone_number,
                &self.patient.patient_name,
                self.expiry_minutes,
                self.patient.national_id.as_deref(),
            )
            .await;

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            tracing::debug!(
                phone = %mask_phone_number(&phone_number),
                event = "flow_result_superseded",
                operation = "request_otp",
                "Discarded OTP request result for a flow that moved on"
            );
            return Ok(FlowOutcome::Superseded);
        }

        let requested = result?;
        self.transition(&mut inner, FlowState::OtpRequested);
        Ok(FlowOutcome::Applied(requested))
    }

    /// Send a fresh OTP while one is already pending, replacing the session
    pub async fn resend_otp(&self) -> VerificationResult<FlowOutcome<OtpRequested>> {
        if self.state() != FlowState::OtpRequested {
            return Err(VerificationError::invalid_request(
                "no OTP has been requested yet",
            ));
        }
        self.request_otp().await
    }

    /// Submit the code the user entered
    ///
    /// Success moves to `Verified`. A terminal failure (no session, expired,
    /// attempts exhausted) returns the flow to `Landing`; a rejected code
    /// keeps it in `OtpRequested`. The error is returned either way.
    pub async fn verify(&self, code: &str) -> VerificationResult<FlowOutcome<()>> {
        let (phone_number, generation) = {
            let inner = self.inner.lock().await;
            if inner.state != FlowState::OtpRequested {
                return Err(VerificationError::invalid_request(format!(
                    "cannot verify an OTP in the {} state",
                    inner.state
                )));
            }
            (inner.phone_number.clone(), inner.generation)
        };

        let result = self.store.verify_otp(&phone_number, code).await;

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            tracing::debug!(
                phone = %mask_phone_number(&phone_number),
                event = "flow_result_superseded",
                operation = "verify",
                "Discarded verification result for a flow that moved on"
            );
            return Ok(FlowOutcome::Superseded);
        }

        match result {
            Ok(_) => {
                self.transition(&mut inner, FlowState::Verified);
                Ok(FlowOutcome::Applied(()))
            }
            Err(e) => {
                if e.is_terminal() {
                    self.transition(&mut inner, FlowState::Landing);
                }
                Err(e)
            }
        }
    }

    /// Countdown tick from the UI
    ///
    /// When the pending OTP is no longer usable the session is deleted and
    /// the flow returns to `Landing`, requiring a fresh request.
    pub async fn check_countdown(&self) -> FlowState {
        let mut inner = self.inner.lock().await;
        if inner.state != FlowState::OtpRequested {
            return inner.state;
        }
        if self.store.has_valid_otp(&inner.phone_number).await {
            return inner.state;
        }

        self.store.clear_session(&inner.phone_number).await;
        tracing::info!(
            phone = %mask_phone_number(&inner.phone_number),
            event = "flow_countdown_expired",
            "OTP countdown ran out; flow returned to landing"
        );
        self.transition(&mut inner, FlowState::Landing);
        inner.state
    }

    /// Switch to another phone number
    ///
    /// The previous number's session is abandoned, not deleted; the sweep
    /// or a later request reclaims it.
    pub async fn change_number(&self, phone: &str) -> VerificationResult<()> {
        let phone_number = canonical(phone)?;
        let mut inner = self.inner.lock().await;
        tracing::info!(
            from = %mask_phone_number(&inner.phone_number),
            to = %mask_phone_number(&phone_number),
            event = "flow_number_changed",
            "Verification flow switched phone number"
        );
        inner.phone_number = phone_number;
        self.transition(&mut inner, FlowState::Landing);
        Ok(())
    }

    /// Close the flow
    ///
    /// Results of calls still in flight are discarded. Sessions are left to
    /// the sweep.
    pub async fn cancel(&self) {
        let mut inner = self.inner.lock().await;
        tracing::info!(
            phone = %mask_phone_number(&inner.phone_number),
            state = %inner.state,
            event = "flow_cancelled",
            "Verification flow cancelled"
        );
        self.transition(&mut inner, FlowState::Landing);
    }

    /// Time left on the pending OTP; zero outside `OtpRequested`
    pub async fn remaining_time(&self) -> Duration {
        let inner = self.inner.lock().await;
        if inner.state != FlowState::OtpRequested {
            return Duration::ZERO;
        }
        self.store.remaining_time(&inner.phone_number).await
    }

    /// Attempts left on the pending OTP; zero outside `OtpRequested`
    pub async fn remaining_attempts(&self) -> u32 {
        let inner = self.inner.lock().await;
        if inner.state != FlowState::OtpRequested {
            return 0;
        }
        self.store.get_remaining_attempts(&inner.phone_number).await
    }

    fn transition(&self, inner: &mut FlowInner, next: FlowState) {
        let previous = inner.state;
        inner.state = next;
        inner.generation += 1;
        self.state_tx.send_replace(next);

        if previous != next {
            tracing::debug!(
                phone = %mask_phone_number(&inner.phone_number),
                from = %previous,
                to = %next,
                event = "flow_state_changed",
                "Verification flow state changed"
            );
        }
    }
}

fn canonical(phone: &str) -> VerificationResult<String> {
    canonical_phone_number(phone).ok_or_else(|| VerificationError::InvalidPhone {
        phone: mask_phone_number(phone),
    })
}
