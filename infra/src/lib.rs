//! # Infrastructure Layer
//!
//! Concrete implementations behind the verification core:
//!
//! - **Gateway**: `HttpOtpGateway`, the `reqwest` adapter for the external
//!   OTP-issuing service, with its response decoder and SMS templating
//! - **Telemetry**: tracing subscriber setup driven by `LoggingConfig`
//! - **Bootstrap**: [`initialize`] wires configuration, gateway, session store
//!   and cleanup scheduler into [`OtpServices`]

use std::sync::Arc;

use sv_core::domain::entities::PatientContext;
use sv_core::errors::VerificationResult;
use sv_core::services::{
    CleanupScheduler, SystemClock, VerificationConfig, VerificationFlow, VerificationSessionStore,
};
use sv_shared::config::{AppConfig, ConfigError};

// Re-export core types for convenience
pub use sv_core::errors::*;

/// OTP gateway module - HTTP adapter for the external OTP service
pub mod gateway;

/// Tracing subscriber setup
pub mod telemetry;

pub use gateway::HttpOtpGateway;

/// Session store backed by the HTTP gateway
pub type HttpSessionStore = VerificationSessionStore<HttpOtpGateway>;

/// Verification flow backed by the HTTP gateway
pub type HttpVerificationFlow = VerificationFlow<HttpOtpGateway>;

/// Running verification services
///
/// Holds the shared session store and its cleanup scheduler. Dropping the
/// container stops the scheduler.
pub struct OtpServices {
    store: Arc<HttpSessionStore>,
    scheduler: CleanupScheduler<HttpOtpGateway>,
    verification: VerificationConfig,
}

impl OtpServices {
    /// Shared session store
    pub fn store(&self) -> Arc<HttpSessionStore> {
        self.store.clone()
    }

    pub fn scheduler(&self) -> &CleanupScheduler<HttpOtpGateway> {
        &self.scheduler
    }

    /// Start a verification flow for one patient and phone number
    pub fn new_flow(
        &self,
        patient: PatientContext,
        phone: &str,
    ) -> VerificationResult<HttpVerificationFlow> {
        VerificationFlow::new(self.store.clone(), patient, phone, &self.verification)
    }

    /// Stop background work
    pub fn shutdown(&self) {
        self.scheduler.stop();
        tracing::info!("OTP verification services shut down");
    }
}

/// Initialize the verification services
///
/// This function:
/// - validates the configuration
/// - builds the HTTP gateway with its request timeout
/// - creates the session store on the system clock
/// - starts the cleanup scheduler when enabled
///
/// Must be called inside a tokio runtime for the scheduler to start.
pub fn initialize(config: AppConfig) -> Result<OtpServices, InfrastructureError> {
    tracing::info!(environment = %config.environment, "Initializing OTP verification services...");

    config.validate()?;

    let gateway = Arc::new(HttpOtpGateway::new(config.gateway.clone())?);
    let store = Arc::new(VerificationSessionStore::new(
        gateway,
        Arc::new(SystemClock),
    ));

    let verification = VerificationConfig::from(&config.otp);
    let scheduler = CleanupScheduler::new(store.clone(), &verification);
    if verification.cleanup_enabled && !scheduler.start() {
        tracing::warn!("OTP session cleanup could not be started");
    }

    tracing::info!(
        expiry_minutes = verification.expiry_minutes,
        cleanup_running = scheduler.is_running(),
        "OTP verification services initialized successfully"
    );

    Ok(OtpServices {
        store,
        scheduler,
        verification,
    })
}

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// HTTP client construction error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}
