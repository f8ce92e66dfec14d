//! Unit tests for the verification flow

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, TimeZone, Utc};
use tokio::sync::Semaphore;

use crate::domain::entities::verification_session::PatientContext;
use crate::errors::VerificationError;
use crate::services::clock::ManualClock;
use crate::services::verification::tests::mocks::{MockOtpGateway, CORRECT_CODE};
use crate::services::verification::{VerificationConfig, VerificationSessionStore};

use super::{FlowOutcome, FlowState, VerificationFlow};

const PHONE: &str = "+919876543210";
const OTHER_PHONE: &str = "+14155552671";

struct Fixture {
    gateway: Arc<MockOtpGateway>,
    clock: Arc<ManualClock>,
    store: Arc<VerificationSessionStore<MockOtpGateway>>,
    flow: Arc<VerificationFlow<MockOtpGateway>>,
}

fn setup_with(gateway: MockOtpGateway, expiry_minutes: f64) -> Fixture {
    let gateway = Arc::new(gateway);
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
    ));
    let store = Arc::new(VerificationSessionStore::new(gateway.clone(), clock.clone()));
    let config = VerificationConfig {
        expiry_minutes,
        ..Default::default()
    };
    let flow = VerificationFlow::new(
        store.clone(),
        PatientContext::new("Asha Rao", Some("NID-42".to_string())),
        PHONE,
        &config,
    )
    .unwrap();

    Fixture {
        gateway,
        clock,
        store,
        flow: Arc::new(flow),
    }
}

fn setup() -> Fixture {
    setup_with(MockOtpGateway::new(), 5.0)
}

#[tokio::test]
async fn test_happy_path_reaches_verified() {
    let fx = setup();
    let mut rx = fx.flow.subscribe();
    assert_eq!(fx.flow.state(), FlowState::Landing);

    let requested = fx.flow.request_otp().await.unwrap();
    assert!(requested.is_applied());
    assert_eq!(fx.flow.state(), FlowState::OtpRequested);
    assert!(rx.has_changed().unwrap());
    assert_eq!(*rx.borrow_and_update(), FlowState::OtpRequested);

    let request = fx.gateway.last_request().unwrap();
    assert_eq!(request.patient_name, "Asha Rao");
    assert_eq!(request.national_id.as_deref(), Some("NID-42"));

    let outcome = fx.flow.verify(CORRECT_CODE).await.unwrap();
    assert_eq!(outcome, FlowOutcome::Applied(()));
    assert_eq!(fx.flow.state(), FlowState::Verified);
    assert_eq!(*rx.borrow_and_update(), FlowState::Verified);
    assert_eq!(fx.store.session_count().await, 0);
}

#[tokio::test]
async fn test_gateway_failure_keeps_landing() {
    let fx = setup_with(MockOtpGateway::failing_issue(), 5.0);

    let result = fx.flow.request_otp().await;

    assert!(matches!(
        result,
        Err(VerificationError::Gateway {
            status: Some(503),
            ..
        })
    ));
    assert_eq!(fx.flow.state(), FlowState::Landing);
    assert_eq!(fx.store.session_count().await, 0);
}

#[tokio::test]
async fn test_wrong_code_stays_in_otp_requested() {
    let fx = setup();
    fx.flow.request_otp().await.unwrap();

    let result = fx.flow.verify("000000").await;

    assert_eq!(
        result,
        Err(VerificationError::InvalidOtp {
            remaining_attempts: 2
        })
    );
    assert_eq!(fx.flow.state(), FlowState::OtpRequested);
    assert_eq!(fx.flow.remaining_attempts().await, 2);
}

#[tokio::test]
async fn test_exhaustion_returns_to_landing() {
    let fx = setup();
    fx.flow.request_otp().await.unwrap();

    fx.flow.verify("000000").await.unwrap_err();
    fx.flow.verify("000000").await.unwrap_err();
    let result = fx.flow.verify("000000").await;

    assert_eq!(result, Err(VerificationError::MaxAttemptsExceeded));
    assert_eq!(fx.flow.state(), FlowState::Landing);
    assert_eq!(fx.flow.remaining_attempts().await, 0);

    // A fresh request starts over
    fx.flow.request_otp().await.unwrap();
    assert_eq!(fx.flow.remaining_attempts().await, 3);
}

#[tokio::test]
async fn test_expired_session_on_verify_returns_to_landing() {
    let fx = setup_with(MockOtpGateway::new(), 0.01);
    fx.flow.request_otp().await.unwrap();
    fx.clock.advance(Duration::milliseconds(700));

    let result = fx.flow.verify(CORRECT_CODE).await;

    assert_eq!(result, Err(VerificationError::Expired));
    assert_eq!(fx.flow.state(), FlowState::Landing);
}

#[tokio::test]
async fn test_countdown_expiry_deletes_session() {
    let fx = setup_with(MockOtpGateway::new(), 0.01);
    fx.flow.request_otp().await.unwrap();

    assert_eq!(fx.flow.check_countdown().await, FlowState::OtpRequested);
    assert!(fx.flow.remaining_time().await > StdDuration::ZERO);

    fx.clock.advance(Duration::milliseconds(700));
    assert_eq!(fx.flow.check_countdown().await, FlowState::Landing);
    assert_eq!(fx.store.session_count().await, 0);
    assert_eq!(fx.flow.remaining_time().await, StdDuration::ZERO);
}

#[tokio::test]
async fn test_change_number_abandons_previous_session() {
    let fx = setup();
    fx.flow.request_otp().await.unwrap();

    fx.flow.change_number("+1 (415) 555-2671").await.unwrap();

    assert_eq!(fx.flow.state(), FlowState::Landing);
    assert_eq!(fx.flow.phone_number().await, OTHER_PHONE);
    // The old session stays until the sweep or a new request reclaims it
    assert!(fx.store.has_valid_otp(PHONE).await);

    fx.flow.request_otp().await.unwrap();
    assert_eq!(
        fx.gateway.last_request().unwrap().phone_number,
        OTHER_PHONE
    );
    assert_eq!(fx.store.session_count().await, 2);
}

#[tokio::test]
async fn test_change_number_rejects_invalid_phone() {
    let fx = setup();
    fx.flow.request_otp().await.unwrap();

    let result = fx.flow.change_number("12-34").await;

    assert!(matches!(result, Err(VerificationError::InvalidPhone { .. })));
    assert_eq!(fx.flow.state(), FlowState::OtpRequested);
    assert_eq!(fx.flow.phone_number().await, PHONE);
}

#[tokio::test]
async fn test_cancel_does_not_delete_session() {
    let fx = setup();
    fx.flow.request_otp().await.unwrap();

    fx.flow.cancel().await;

    assert_eq!(fx.flow.state(), FlowState::Landing);
    assert!(fx.store.has_valid_otp(PHONE).await);
}

#[tokio::test]
async fn test_verify_requires_pending_otp() {
    let fx = setup();

    let result = fx.flow.verify(CORRECT_CODE).await;

    assert!(matches!(result, Err(VerificationError::InvalidRequest { .. })));
    assert_eq!(fx.gateway.validation_count(), 0);
}

#[tokio::test]
async fn test_resend_replaces_session() {
    let fx = setup();
    assert!(matches!(
        fx.flow.resend_otp().await,
        Err(VerificationError::InvalidRequest { .. })
    ));

    let first = fx.flow.request_otp().await.unwrap().applied().unwrap();
    fx.flow.verify("000000").await.unwrap_err();

    let second = fx.flow.resend_otp().await.unwrap().applied().unwrap();

    assert!(second.replaced_existing);
    assert_ne!(first.session_id, second.session_id);
    assert_eq!(fx.gateway.issue_count(), 2);
    assert_eq!(fx.flow.remaining_attempts().await, 3);
    assert_eq!(fx.flow.state(), FlowState::OtpRequested);
}

#[tokio::test]
async fn test_no_requests_after_verified() {
    let fx = setup();
    fx.flow.request_otp().await.unwrap();
    fx.flow.verify(CORRECT_CODE).await.unwrap();

    let result = fx.flow.request_otp().await;

    assert!(matches!(result, Err(VerificationError::InvalidRequest { .. })));
    assert_eq!(fx.gateway.issue_count(), 1);
}

#[tokio::test]
async fn test_cancel_during_request_discards_result() {
    let gate = Arc::new(Semaphore::new(0));
    let fx = setup_with(MockOtpGateway::gated_issue(gate.clone()), 5.0);

    let flow = fx.flow.clone();
    let pending = tokio::spawn(async move { flow.request_otp().await });
    while fx.gateway.issue_call_count() == 0 {
        tokio::task::yield_now().await;
    }

    fx.flow.cancel().await;
    gate.add_permits(1);

    let outcome = pending.await.unwrap().unwrap();
    assert_eq!(outcome, FlowOutcome::Superseded);
    assert_eq!(fx.flow.state(), FlowState::Landing);
}

#[tokio::test]
async fn test_change_number_during_verify_discards_result() {
    let gate = Arc::new(Semaphore::new(0));
    let fx = setup_with(MockOtpGateway::gated(gate.clone()), 5.0);
    fx.flow.request_otp().await.unwrap();

    let flow = fx.flow.clone();
    let pending = tokio::spawn(async move { flow.verify(CORRECT_CODE).await });
    while fx.gateway.validation_count() == 0 {
        tokio::task::yield_now().await;
    }

    fx.flow.change_number(OTHER_PHONE).await.unwrap();
    gate.add_permits(1);

    let outcome = pending.await.unwrap().unwrap();
    assert_eq!(outcome, FlowOutcome::Superseded);
    assert_eq!(fx.flow.state(), FlowState::Landing);
    assert_eq!(fx.flow.phone_number().await, OTHER_PHONE);
}

#[tokio::test]
async fn test_new_rejects_invalid_phone() {
    let fx = setup();

    let result = VerificationFlow::new(
        fx.store.clone(),
        PatientContext::default(),
        "not a phone",
        &VerificationConfig::default(),
    );

    assert!(matches!(result, Err(VerificationError::InvalidPhone { .. })));
}

#[tokio::test]
async fn test_overlapping_resends_keep_latest_session() {
    let gate = Arc::new(Semaphore::new(0));
    let fx = setup_with(MockOtpGateway::gated_issue_call(1, gate.clone()), 5.0);
    fx.flow.request_otp().await.unwrap();

    let flow = fx.flow.clone();
    let slow = tokio::spawn(async move { flow.resend_otp().await });
    while fx.gateway.issue_call_count() < 2 {
        tokio::task::yield_now().await;
    }

    let latest = fx.flow.resend_otp().await.unwrap().applied().unwrap();

    gate.add_permits(1);
    let outcome = slow.await.unwrap().unwrap();
    assert_eq!(outcome, FlowOutcome::Superseded);

    let current = fx.store.session(PHONE).await.unwrap();
    assert_eq!(current.session_id, latest.session_id);
    assert_eq!(fx.flow.remaining_attempts().await, 3);

    let verified = fx.flow.verify(CORRECT_CODE).await.unwrap();
    assert_eq!(verified, FlowOutcome::Applied(()));
    assert_eq!(fx.flow.state(), FlowState::Verified);
}
