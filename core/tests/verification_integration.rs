//! Integration tests for the OTP verification services

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};
    use tokio::sync::RwLock;

    use sv_core::{
        CleanupScheduler, FlowState, IssueOtpRequest, IssuedOtp, ManualClock, OtpGateway,
        PatientContext, VerificationConfig, VerificationError, VerificationFlow,
        VerificationResult, VerificationSessionStore, MAX_ATTEMPTS,
    };

    // Mock SMS provider that remembers the code it "sent" for each reference
    struct MockSmsProvider {
        sent: RwLock<HashMap<String, (String, String)>>, // otp id -> (phone, code)
        next_id: AtomicU64,
    }

    impl MockSmsProvider {
        fn new() -> Self {
            Self {
                sent: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1000),
            }
        }

        /// The code most recently texted to `phone`, as the patient would read it
        async fn inbox(&self, phone: &str) -> Option<String> {
            let sent = self.sent.read().await;
            sent.iter()
                .filter(|(_, (to, _))| to == phone)
                .max_by_key(|(id, _)| id.trim_start_matches("ref-").parse::<u64>().unwrap_or(0))
                .map(|(_, (_, code))| code.clone())
        }
    }

    #[async_trait]
    impl OtpGateway for MockSmsProvider {
        async fn issue_otp(&self, request: &IssueOtpRequest) -> VerificationResult<IssuedOtp> {
            let n = self.next_id.fetch_add(1, Ordering::SeqCst);
            let id = format!("ref-{}", n);
            let code = format!("{:06}", (n * 7919) % 1_000_000);
            self.sent
                .write()
                .await
                .insert(id.clone(), (request.phone_number.clone(), code));
            Ok(IssuedOtp {
                external_otp_id: id,
                message: format!("OTP sent to {}", request.patient_name),
            })
        }

        async fn validate_otp(&self, external_otp_id: &str, code: &str) -> VerificationResult<bool> {
            match self.sent.read().await.get(external_otp_id) {
                Some((_, expected)) if expected == code => Ok(true),
                _ => Err(VerificationError::gateway("Invalid OTP")),
            }
        }
    }

    fn build() -> (
        Arc<MockSmsProvider>,
        Arc<ManualClock>,
        Arc<VerificationSessionStore<MockSmsProvider>>,
    ) {
        let provider = Arc::new(MockSmsProvider::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 5, 12, 14, 30, 0).unwrap(),
        ));
        let store = Arc::new(VerificationSessionStore::new(provider.clone(), clock.clone()));
        (provider, clock, store)
    }

    #[tokio::test]
    async fn test_patient_verifies_through_flow() {
        let (provider, _, store) = build();
        let flow = VerificationFlow::new(
            store.clone(),
            PatientContext::new("Meera Iyer", None),
            "+91 98450 12345",
            &VerificationConfig::default(),
        )
        .expect("Failed to create flow");

        flow.request_otp().await.expect("Failed to request OTP");
        let code = provider.inbox("+919845012345").await.expect("No OTP sent");

        // First attempt mistyped
        let result = flow.verify("999999").await;
        assert!(matches!(
            result,
            Err(VerificationError::InvalidOtp {
                remaining_attempts: 2
            })
        ));

        flow.verify(&code).await.expect("Failed to verify OTP");
        assert_eq!(flow.state(), FlowState::Verified);
        assert!(!store.has_valid_otp("+919845012345").await);
    }

    #[tokio::test]
    async fn test_formats_of_one_number_share_a_session() {
        let (provider, _, store) = build();

        store
            .request_otp("0091 98450-12345", "Meera Iyer", 5.0, None)
            .await
            .expect("Failed to request OTP");
        let code = provider.inbox("+919845012345").await.unwrap();

        assert_eq!(store.get_remaining_attempts("+91 98450 12345").await, MAX_ATTEMPTS);
        assert!(store.verify_otp("+919845012345", &code).await.unwrap());
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_phones_do_not_interfere() {
        let (provider, _, store) = build();
        let phones = ["+919845012345", "+14155552671", "+447700900123", "+61412345678"];

        let mut handles = Vec::new();
        for phone in phones {
            let store = store.clone();
            let provider = provider.clone();
            handles.push(tokio::spawn(async move {
                store.request_otp(phone, "Patient", 5.0, None).await.unwrap();
                let wrong = store.verify_otp(phone, "000000").await;
                assert!(matches!(wrong, Err(VerificationError::InvalidOtp { .. })));
                assert_eq!(store.get_remaining_attempts(phone).await, 2);

                let code = provider.inbox(phone).await.unwrap();
                store.verify_otp(phone, &code).await.unwrap()
            }));
        }

        for handle in handles {
            assert!(handle.await.expect("Task panicked"));
        }
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_abandoned_sessions_are_swept() {
        let (_, clock, store) = build();
        let config = VerificationConfig::default();
        let scheduler = CleanupScheduler::new(store.clone(), &config);

        let flow = VerificationFlow::new(
            store.clone(),
            PatientContext::new("Meera Iyer", Some("NHID-7781".to_string())),
            "+919845012345",
            &config,
        )
        .unwrap();
        flow.request_otp().await.unwrap();

        clock.advance(Duration::minutes(3));
        flow.change_number("+14155552671").await.unwrap();
        flow.request_otp().await.unwrap();
        assert_eq!(store.session_count().await, 2);
        assert_eq!(scheduler.run_once().await.sessions_removed, 0);

        // Only the abandoned first number has run out
        clock.advance(Duration::minutes(3));
        let report = scheduler.run_once().await;
        assert_eq!(report.sessions_removed, 1);
        assert_eq!(report.sessions_remaining, 1);
        assert_eq!(flow.check_countdown().await, FlowState::OtpRequested);

        clock.advance(Duration::minutes(3));
        assert_eq!(flow.check_countdown().await, FlowState::Landing);
        assert_eq!(store.session_count().await, 0);
    }
}
