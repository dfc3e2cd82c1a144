//! CheckoutCoordinator - drives "initiate → hand off → poll → settle".
//!
//! The checkout itself happens in an external browser the client cannot
//! observe, so completion is detected by polling `verify_checkout`.
//!
//! ## Polling
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `poll_interval` | 3s | Wait before each verify call |
//! | `max_attempts` | 100 | Verify calls before giving up with `TimedOut` |
//!
//! Each run owns one `PollGeneration`. Starting a new checkout, cancelling,
//! shutting down, or a refresh that confirms the subscription retires the
//! generation, which wakes the loop immediately; anything it was still
//! waiting on is dropped unobserved.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::domain::entitlement::{
    CheckoutOutcome, CheckoutSession, EntitlementError, EntitlementSnapshot, ExternalUrl,
    PollAttempt, PollGeneration,
};
use crate::domain::foundation::CheckoutSessionId;
use crate::ports::Endpoint;

use super::deadline::with_deadline;
use super::EntitlementStateMachine;

/// Configuration for checkout polling.
#[derive(Debug, Clone)]
pub struct CheckoutCoordinatorConfig {
    /// Wait before each verify call.
    pub poll_interval: Duration,

    /// Maximum verify calls per polling run.
    pub max_attempts: u32,
}

impl Default for CheckoutCoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            max_attempts: 100,
        }
    }
}

impl CheckoutCoordinatorConfig {
    /// Create config with custom poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Create config with custom attempt cap.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }
}

/// Orchestrates checkout and cancellation against the state machine.
pub struct CheckoutCoordinator {
    machine: Arc<EntitlementStateMachine>,
    config: CheckoutCoordinatorConfig,
    /// Set while a `begin_checkout` is waiting on the backend.
    initiating: AtomicBool,
    #[cfg(feature = "dev-activate")]
    dev_activation: Option<Arc<dyn crate::ports::DevActivation>>,
}

/// Clears the initiation flag however `begin_checkout` exits.
struct InitiationGuard<'a>(&'a AtomicBool);

impl Drop for InitiationGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl CheckoutCoordinator {
    /// Create a coordinator with default polling configuration.
    pub fn new(machine: Arc<EntitlementStateMachine>) -> Self {
        Self::with_config(machine, CheckoutCoordinatorConfig::default())
    }

    /// Create a coordinator with custom polling configuration.
    pub fn with_config(
        machine: Arc<EntitlementStateMachine>,
        config: CheckoutCoordinatorConfig,
    ) -> Self {
        Self {
            machine,
            config,
            initiating: AtomicBool::new(false),
            #[cfg(feature = "dev-activate")]
            dev_activation: None,
        }
    }

    /// Enable the backend's test-only activation bypass.
    #[cfg(feature = "dev-activate")]
    pub fn with_dev_activation(mut self, dev: Arc<dyn crate::ports::DevActivation>) -> Self {
        self.dev_activation = Some(dev);
        self
    }

    pub fn machine(&self) -> &Arc<EntitlementStateMachine> {
        &self.machine
    }

    /// The checkout currently awaiting completion, if any.
    pub fn active_session(&self) -> Option<CheckoutSession> {
        self.machine.active_checkout()
    }

    /// Open a checkout session and return the URL to hand to a browser.
    ///
    /// Calls `create_checkout` exactly once. On success any outstanding
    /// session is superseded and its poll stops.
    ///
    /// # Errors
    ///
    /// - `CheckoutInitiationFailed` if another initiation is in flight, the
    ///   state does not allow checkout, or the backend call fails
    /// - `StorageUnavailable` if no identity can be resolved
    pub async fn begin_checkout(&self) -> Result<ExternalUrl, EntitlementError> {
        if self
            .initiating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("Checkout initiation already in progress");
            return Err(EntitlementError::checkout_initiation_failed(
                "checkout initiation already in progress",
            ));
        }
        let _guard = InitiationGuard(&self.initiating);

        self.machine.ensure_checkout_allowed()?;
        let identity = self.machine.identity().await?;

        let session = with_deadline(
            Endpoint::CreateCheckout,
            self.machine.request_timeout(),
            self.machine.client().create_checkout(&identity),
        )
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Checkout creation failed");
            EntitlementError::checkout_initiation_failed(e.to_string())
        })?;

        let url = session.external_url.clone();
        self.machine.install_checkout(session)?;
        Ok(url)
    }

    /// Poll until the checkout resolves, the attempt cap is hit, or the run
    /// is cancelled.
    ///
    /// Terminates after at most `max_attempts` verify calls, so with the
    /// defaults a run never outlives 300s plus request deadlines.
    pub async fn await_completion(&self, session_id: &CheckoutSessionId) -> CheckoutOutcome {
        let generation = match self.machine.start_verifying(session_id) {
            Ok(generation) => generation,
            Err(reason) => {
                tracing::warn!(session_id = %session_id, reason = %reason, "Cannot await checkout");
                return CheckoutOutcome::failed(reason);
            }
        };

        let identity = match self.machine.identity().await {
            Ok(identity) => identity,
            Err(e) => {
                self.machine.abandon_checkout();
                return CheckoutOutcome::failed(e.to_string());
            }
        };

        tracing::info!(
            session_id = %session_id,
            generation = %generation,
            max_attempts = self.config.max_attempts,
            "Awaiting checkout completion"
        );

        let mut retired = self.machine.watch_generation();
        let mut attempt = PollAttempt::start(generation);

        loop {
            // Always consult the live machine, never a captured state
            if let Some(outcome) = self.machine.poll_check(generation) {
                tracing::info!(generation = %generation, outcome = ?outcome, "Checkout poll stopped");
                return outcome;
            }
            if attempt.is_exhausted(self.config.max_attempts) {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                _ = wait_until_retired(&mut retired, generation) => continue,
            }

            let number = attempt.record_attempt();
            let verify = with_deadline(
                Endpoint::VerifySession,
                self.machine.request_timeout(),
                self.machine.client().verify_checkout(&identity, session_id),
            );
            let result = tokio::select! {
                result = verify => result,
                _ = wait_until_retired(&mut retired, generation) => continue,
            };

            match result {
                Ok(sample) if sample.is_subscribed() => {
                    if self.machine.complete_checkout(generation, sample) {
                        tracing::info!(
                            session_id = %session_id,
                            attempt = number,
                            "Checkout activated"
                        );
                        return CheckoutOutcome::Activated;
                    }
                }
                Ok(sample) => {
                    tracing::debug!(attempt = number, status = %sample.status(), "Checkout still pending");
                    attempt.record_sample(sample);
                }
                Err(e) => {
                    tracing::warn!(attempt = number, error = %e, "Verify failed, will retry");
                }
            }
        }

        self.finish_exhausted(generation, attempt)
    }

    fn finish_exhausted(&self, generation: PollGeneration, attempt: PollAttempt) -> CheckoutOutcome {
        let attempts = attempt.count();
        let last_sample: Option<EntitlementSnapshot> = attempt.into_last_sample();

        if self.machine.expire_checkout(generation, last_sample) {
            tracing::info!(generation = %generation, attempts, "Checkout verification timed out");
            CheckoutOutcome::TimedOut
        } else {
            self.machine
                .poll_check(generation)
                .unwrap_or(CheckoutOutcome::StillPending)
        }
    }

    /// Stop the in-flight poll and discard the outstanding session.
    ///
    /// Returns true if there was one.
    pub fn cancel_polling(&self) -> bool {
        match self.machine.abandon_checkout() {
            Some(generation) => {
                tracing::info!(generation = %generation, "Checkout polling cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancel the subscription.
    ///
    /// Moves `Subscribed → Cancelling` for the duration of the call, then
    /// settles per the returned snapshot.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if not currently `Subscribed`
    /// - `Network`/`MalformedResponse` if the call fails; state reverts to
    ///   `Subscribed`
    pub async fn cancel(&self) -> Result<EntitlementSnapshot, EntitlementError> {
        self.machine.begin_cancelling()?;

        let result = match self.machine.identity().await {
            Ok(identity) => with_deadline(
                Endpoint::Cancel,
                self.machine.request_timeout(),
                self.machine.client().cancel_subscription(&identity),
            )
            .await
            .map_err(EntitlementError::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(snapshot) => {
                self.machine.finish_cancelling(Some(snapshot.clone()));
                tracing::info!(status = %snapshot.status(), "Subscription cancelled");
                Ok(snapshot)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cancellation failed, keeping subscription");
                self.machine.finish_cancelling(None);
                Err(e)
            }
        }
    }

    /// Activate through the backend's test bypass, then refresh.
    #[cfg(feature = "dev-activate")]
    pub async fn dev_activate(&self) -> Result<EntitlementSnapshot, EntitlementError> {
        let Some(dev) = self.dev_activation.as_ref() else {
            return Err(EntitlementError::invalid_state(
                self.machine.current_state().state,
                "dev-activate (bypass disabled)",
            ));
        };

        let identity = self.machine.identity().await?;
        with_deadline(
            Endpoint::DevActivate,
            self.machine.request_timeout(),
            dev.dev_activate(&identity),
        )
        .await?;

        self.machine.refresh().await
    }

    /// Cancel any in-flight poll. Called once when the runtime stops.
    pub fn shutdown(&self) {
        if self.cancel_polling() {
            tracing::info!("Stopped checkout polling on shutdown");
        }
    }
}

/// Resolve once `generation` is no longer the active one.
async fn wait_until_retired(
    retired: &mut watch::Receiver<Option<PollGeneration>>,
    generation: PollGeneration,
) {
    loop {
        if *retired.borrow_and_update() != Some(generation) {
            return;
        }
        if retired.changed().await.is_err() {
            // Sender lives as long as the machine; nothing can retire us now
            std::future::pending::<()>().await;
        }
    }
}
