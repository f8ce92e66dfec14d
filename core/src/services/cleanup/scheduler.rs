//! Cleanup scheduler for periodic maintenance of the verification session store
//!
//! Sessions abandoned by a closed or re-targeted flow are never verified, so
//! nothing else deletes them once they expire. The scheduler sweeps the store
//! on its own tokio task, independent of any verification flow.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::services::verification::{OtpGateway, VerificationConfig, VerificationSessionStore};

/// Result of a cleanup sweep
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    /// Number of expired sessions removed
    pub sessions_removed: usize,
    /// Number of sessions left after the sweep
    pub sessions_remaining: usize,
}

/// Recurring sweep of expired sessions
///
/// Owned by the process that owns the store: `start` once at initialization,
/// `stop` (or drop) on shutdown. The running task is aborted on drop, so no
/// timer outlives its scheduler.
pub struct CleanupScheduler<G: OtpGateway + 'static> {
    store: Arc<VerificationSessionStore<G>>,
    interval: Duration,
    enabled: bool,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl<G: OtpGateway + 'static> CleanupScheduler<G> {
    /// Create a new cleanup scheduler
    pub fn new(store: Arc<VerificationSessionStore<G>>, config: &VerificationConfig) -> Self {
        Self {
            store,
            interval: config.cleanup_interval,
            enabled: config.cleanup_enabled,
            handle: Mutex::new(None),
        }
    }

    /// Run a single sweep
    ///
    /// Never fails; anomalies on individual sessions are logged by the store
    /// and skipped.
    pub async fn run_once(&self) -> CleanupReport {
        sweep(&self.store).await
    }

    /// Start the sweep as a background task
    ///
    /// Returns `true` if a task was spawned. Calling it again while a task is
    /// running is a no-op, as is calling it with cleanup disabled or outside a
    /// tokio runtime.
    pub fn start(&self) -> bool {
        if !self.enabled {
            warn!("OTP session cleanup is disabled");
            return false;
        }
        if self.interval.is_zero() {
            error!("OTP session cleanup interval must be greater than zero");
            return false;
        }

        let mut handle = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        if handle.as_ref().is_some_and(|task| !task.is_finished()) {
            debug!("OTP session cleanup already running");
            return false;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                error!("Cannot start OTP session cleanup outside a tokio runtime: {}", e);
                return false;
            }
        };

        let store = self.store.clone();
        let interval = self.interval;

        *handle = Some(runtime.spawn(async move {
            info!(
                "OTP session cleanup started - will run every {} seconds",
                interval.as_secs()
            );

            let mut interval_timer = tokio::time::interval(interval);
            interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                interval_timer.tick().await;
                sweep(&store).await;
            }
        }));

        true
    }

    /// Stop the background task, if running
    pub fn stop(&self) {
        let task = self
            .handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(task) = task {
            task.abort();
            info!("OTP session cleanup stopped");
        }
    }

    /// Whether the background task is currently running
    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Interval between sweeps
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl<G: OtpGateway + 'static> Drop for CleanupScheduler<G> {
    fn drop(&mut self) {
        let task = self
            .handle
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(task) = task {
            task.abort();
        }
    }
}

async fn sweep<G: OtpGateway>(store: &VerificationSessionStore<G>) -> CleanupReport {
    let sessions_removed = store.cleanup_expired_otps().await;
    let sessions_remaining = store.session_count().await;

    if sessions_removed > 0 {
        info!(
            event = "otp_cleanup_completed",
            sessions_removed = sessions_removed,
            sessions_remaining = sessions_remaining,
            "Removed expired OTP sessions"
        );
    } else {
        debug!(
            sessions_remaining = sessions_remaining,
            "OTP cleanup found nothing to remove"
        );
    }

    CleanupReport {
        sessions_removed,
        sessions_remaining,
    }
}
