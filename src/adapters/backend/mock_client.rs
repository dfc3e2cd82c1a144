//! Mock entitlement backend for testing.
//!
//! Provides a configurable implementation of `EntitlementClient` for unit
//! and integration tests. Supports:
//! - A simulated backend subscription status
//! - Scripted per-call responses (statuses, explicit snapshots, errors)
//! - Error injection per method
//! - Artificial latency per method (pairs with `tokio::time::pause`)
//! - Call tracking

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::entitlement::{CheckoutSession, EntitlementSnapshot, SubscriptionStatus};
use crate::domain::foundation::{CheckoutSessionId, ClientIdentity, Timestamp};
use crate::ports::{ClientError, EntitlementClient, Endpoint};

pub const FETCH_STATUS: &str = "fetch_status";
pub const CREATE_CHECKOUT: &str = "create_checkout";
pub const VERIFY_CHECKOUT: &str = "verify_checkout";
pub const CANCEL_SUBSCRIPTION: &str = "cancel_subscription";
pub const DEV_ACTIVATE: &str = "dev_activate";

/// Mock backend for testing.
///
/// # Example
///
/// ```ignore
/// let mock = MockEntitlementClient::new();
///
/// // Script the next two verify answers, then resolve
/// mock.push_verify(SubscriptionStatus::Pending);
/// mock.push_verify(SubscriptionStatus::Active);
///
/// // Inject errors
/// mock.set_method_error(CANCEL_SUBSCRIPTION, ClientError::network(Endpoint::Cancel, "down"));
/// ```
#[derive(Default, Clone)]
pub struct MockEntitlementClient {
    /// Inner state (thread-safe for async tests).
    inner: Arc<Mutex<MockState>>,
}

/// Internal mutable state.
#[derive(Default)]
struct MockState {
    /// What the simulated backend answers when nothing is scripted.
    backend_status: SubscriptionStatus,

    /// Scripted `fetch_status` answers, consumed in order.
    status_script: VecDeque<Scripted>,

    /// Scripted `verify_checkout` answers, consumed in order.
    verify_script: VecDeque<Scripted>,

    /// Sessions that have resolved, and the answer they resolved to.
    resolved_sessions: HashMap<String, SubscriptionStatus>,

    /// Counter for generated session ids.
    sessions_created: u64,

    /// Error to return on next call to any method.
    next_error: Option<ClientError>,

    /// Specific errors by method name.
    method_errors: HashMap<&'static str, ClientError>,

    /// Latency injected before a method returns.
    delays: HashMap<&'static str, Duration>,

    /// Track method calls for assertions.
    call_log: Vec<MethodCall>,
}

/// One scripted answer.
#[derive(Debug, Clone)]
enum Scripted {
    /// Stamped with the time of the call.
    Status(SubscriptionStatus),
    /// Returned as-is, including its `fetched_at`.
    Snapshot(EntitlementSnapshot),
    Error(ClientError),
}

/// Recorded method call for assertions.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: &'static str,
    pub args: Vec<String>,
}

impl MockEntitlementClient {
    /// Create a mock whose backend reports no subscription.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock whose backend reports `status` until told otherwise.
    pub fn with_backend_status(status: SubscriptionStatus) -> Self {
        let mock = Self::new();
        mock.set_backend_status(status);
        mock
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Change the simulated backend's subscription status.
    pub fn set_backend_status(&self, status: SubscriptionStatus) {
        self.state().backend_status = status;
    }

    /// Simulate the user finishing checkout in the browser.
    ///
    /// Later verifies for `session_id` resolve to `Active`, and status
    /// fetches report `Active`.
    pub fn complete_checkout(&self, session_id: &CheckoutSessionId) {
        let mut state = self.state();
        state
            .resolved_sessions
            .insert(session_id.as_str().to_string(), SubscriptionStatus::Active);
        state.backend_status = SubscriptionStatus::Active;
    }

    /// Queue a `fetch_status` answer stamped at call time.
    pub fn push_status(&self, status: SubscriptionStatus) {
        self.state().status_script.push_back(Scripted::Status(status));
    }

    /// Queue a `fetch_status` answer with an explicit `fetched_at`.
    pub fn push_status_snapshot(&self, snapshot: EntitlementSnapshot) {
        self.state()
            .status_script
            .push_back(Scripted::Snapshot(snapshot));
    }

    /// Queue a `fetch_status` failure.
    pub fn push_status_error(&self, error: ClientError) {
        self.state().status_script.push_back(Scripted::Error(error));
    }

    /// Queue a `verify_checkout` answer stamped at call time.
    pub fn push_verify(&self, status: SubscriptionStatus) {
        self.state().verify_script.push_back(Scripted::Status(status));
    }

    /// Queue a `verify_checkout` failure.
    pub fn push_verify_error(&self, error: ClientError) {
        self.state().verify_script.push_back(Scripted::Error(error));
    }

    /// Set an error to return on the next call to any method.
    pub fn set_error(&self, error: ClientError) {
        self.state().next_error = Some(error);
    }

    /// Set an error for a specific method.
    pub fn set_method_error(&self, method: &'static str, error: ClientError) {
        self.state().method_errors.insert(method, error);
    }

    /// Clear all configured errors.
    pub fn clear_errors(&self) {
        let mut state = self.state();
        state.next_error = None;
        state.method_errors.clear();
    }

    /// Delay every call to `method` by `delay`.
    pub fn set_delay(&self, method: &'static str, delay: Duration) {
        self.state().delays.insert(method, delay);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    /// Get all recorded method calls.
    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    /// Check if a method was called.
    pub fn was_called(&self, method: &str) -> bool {
        self.state().call_log.iter().any(|c| c.method == method)
    }

    /// Get count of calls to a method.
    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    /// Clear the call log.
    pub fn clear_calls(&self) {
        self.state().call_log.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the call and return the configured latency for it.
    fn record_call(&self, method: &'static str, args: Vec<String>) -> Option<Duration> {
        let mut state = self.state();
        state.call_log.push(MethodCall { method, args });
        state.delays.get(method).copied()
    }

    fn check_error(&self, method: &'static str) -> Result<(), ClientError> {
        let mut state = self.state();

        // Method-specific errors persist until cleared
        if let Some(error) = state.method_errors.get(method) {
            return Err(error.clone());
        }

        // Global error is consumed
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }

        Ok(())
    }

    async fn respond<T>(delay: Option<Duration>, result: Result<T, ClientError>) -> Result<T, ClientError> {
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }
}

fn resolve(scripted: Scripted, issued_at: Timestamp) -> Result<EntitlementSnapshot, ClientError> {
    match scripted {
        Scripted::Status(status) => Ok(EntitlementSnapshot::new(status, issued_at)),
        Scripted::Snapshot(snapshot) => Ok(snapshot),
        Scripted::Error(error) => Err(error),
    }
}

#[async_trait]
impl EntitlementClient for MockEntitlementClient {
    async fn fetch_status(
        &self,
        identity: &ClientIdentity,
    ) -> Result<EntitlementSnapshot, ClientError> {
        let issued_at = Timestamp::now();
        let delay = self.record_call(FETCH_STATUS, vec![identity.to_string()]);

        let result = self.check_error(FETCH_STATUS).and_then(|()| {
            let mut state = self.state();
            match state.status_script.pop_front() {
                Some(scripted) => resolve(scripted, issued_at),
                None => Ok(EntitlementSnapshot::new(state.backend_status, issued_at)),
            }
        });

        Self::respond(delay, result).await
    }

    async fn create_checkout(
        &self,
        identity: &ClientIdentity,
    ) -> Result<CheckoutSession, ClientError> {
        let delay = self.record_call(CREATE_CHECKOUT, vec![identity.to_string()]);

        let result = self.check_error(CREATE_CHECKOUT).and_then(|()| {
            let mut state = self.state();
            state.sessions_created += 1;
            let raw_id = format!("cs_mock_{}", state.sessions_created);
            let url = format!("https://checkout.mock.test/c/pay/{}", raw_id);
            let session_id = CheckoutSessionId::new(raw_id)
                .map_err(|e| ClientError::malformed(Endpoint::CreateCheckout, e.to_string()))?;
            Ok(CheckoutSession::new(session_id, url))
        });

        Self::respond(delay, result).await
    }

    async fn verify_checkout(
        &self,
        identity: &ClientIdentity,
        session_id: &CheckoutSessionId,
    ) -> Result<EntitlementSnapshot, ClientError> {
        let issued_at = Timestamp::now();
        let delay = self.record_call(
            VERIFY_CHECKOUT,
            vec![identity.to_string(), session_id.to_string()],
        );

        let result = self.check_error(VERIFY_CHECKOUT).and_then(|()| {
            let mut state = self.state();

            // Resolved sessions keep answering the same way
            if let Some(status) = state.resolved_sessions.get(session_id.as_str()) {
                return Ok(EntitlementSnapshot::new(*status, issued_at));
            }

            let snapshot = match state.verify_script.pop_front() {
                Some(scripted) => resolve(scripted, issued_at)?,
                None => EntitlementSnapshot::new(SubscriptionStatus::Pending, issued_at),
            };

            if snapshot.is_subscribed() {
                state
                    .resolved_sessions
                    .insert(session_id.as_str().to_string(), snapshot.status());
                state.backend_status = SubscriptionStatus::Active;
            }

            Ok(snapshot)
        });

        Self::respond(delay, result).await
    }

    async fn cancel_subscription(
        &self,
        identity: &ClientIdentity,
    ) -> Result<EntitlementSnapshot, ClientError> {
        let issued_at = Timestamp::now();
        let delay = self.record_call(CANCEL_SUBSCRIPTION, vec![identity.to_string()]);

        let result = self.check_error(CANCEL_SUBSCRIPTION).map(|()| {
            self.state().backend_status = SubscriptionStatus::Cancelled;
            EntitlementSnapshot::new(SubscriptionStatus::Cancelled, issued_at)
        });

        Self::respond(delay, result).await
    }
}

#[cfg(feature = "dev-activate")]
#[async_trait]
impl crate::ports::DevActivation for MockEntitlementClient {
    async fn dev_activate(&self, identity: &ClientIdentity) -> Result<(), ClientError> {
        let delay = self.record_call(DEV_ACTIVATE, vec![identity.to_string()]);

        let result = self.check_error(DEV_ACTIVATE).map(|()| {
            self.state().backend_status = SubscriptionStatus::Active;
        });

        Self::respond(delay, result).await
    }
}
