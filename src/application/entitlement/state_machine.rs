//! EntitlementStateMachine - single owner of the cached entitlement truth.
//!
//! Every write to the state or the cached snapshot goes through one
//! mutex-guarded transition step, and each change is published on a
//! `watch` channel for reactive re-render.
//!
//! # Ordering Guarantees
//!
//! - A candidate snapshot replaces the cached one only if it was *issued* no
//!   earlier (`fetched_at`), so a slow response can never regress the cache.
//! - Checkout polls are tagged with a `PollGeneration`; a poll-originated
//!   result is applied only while its generation is the active one.
//!
//! # Failure Policy
//!
//! `refresh()` fails soft. On error it hands back the state that was current
//! before `Checking` and keeps the snapshot. The very first check fails
//! closed to `Unsubscribed`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;

use crate::domain::entitlement::{
    CheckoutOutcome, CheckoutSession, EntitlementError, EntitlementSnapshot, EntitlementState,
    EntitlementView, PollGeneration,
};
use crate::domain::foundation::{CheckoutSessionId, ClientIdentity, StateMachine};
use crate::ports::{EntitlementClient, Endpoint, IdentityStore};

use super::deadline::with_deadline;

/// Default deadline for a single backend call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Holds the entitlement state and cached snapshot for one client identity.
pub struct EntitlementStateMachine {
    client: Arc<dyn EntitlementClient>,
    identity_store: Arc<dyn IdentityStore>,
    request_timeout: Duration,
    inner: Mutex<Inner>,
    view_tx: watch::Sender<EntitlementView>,
    generation_tx: watch::Sender<Option<PollGeneration>>,
}

/// The outstanding checkout and the poll generation that owns it.
#[derive(Debug, Clone)]
struct ActiveCheckout {
    session: CheckoutSession,
    generation: PollGeneration,
}

#[derive(Debug)]
struct Inner {
    state: EntitlementState,
    snapshot: Option<EntitlementSnapshot>,
    /// State to hand back to when the in-flight refresh finishes.
    resume_state: Option<EntitlementState>,
    checkout: Option<ActiveCheckout>,
    next_generation: PollGeneration,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: EntitlementState::Uninitialized,
            snapshot: None,
            resume_state: None,
            checkout: None,
            next_generation: PollGeneration::first(),
        }
    }

    fn view(&self) -> EntitlementView {
        EntitlementView {
            state: self.state,
            snapshot: self.snapshot.clone(),
        }
    }

    fn active_generation(&self) -> Option<PollGeneration> {
        self.checkout.as_ref().map(|c| c.generation)
    }

    fn is_subscribed(&self) -> bool {
        self.snapshot
            .as_ref()
            .is_some_and(EntitlementSnapshot::is_subscribed)
    }

    fn transition(&mut self, target: EntitlementState) {
        if self.state == target {
            return;
        }
        match self.state.transition_to(target) {
            Ok(next) => {
                tracing::debug!(from = %self.state, to = %next, "Entitlement state transition");
                self.state = next;
            }
            Err(e) => {
                tracing::warn!(
                    from = %self.state,
                    to = %target,
                    error = %e,
                    "Rejected entitlement state transition"
                );
            }
        }
    }

    /// Replace the cached snapshot unless `candidate` is older.
    fn apply_snapshot(&mut self, candidate: EntitlementSnapshot) -> bool {
        match &self.snapshot {
            Some(current) if !candidate.supersedes(current) => {
                tracing::debug!(
                    candidate_fetched_at = %candidate.fetched_at(),
                    cached_fetched_at = %current.fetched_at(),
                    "Discarding stale entitlement snapshot"
                );
                false
            }
            _ => {
                self.snapshot = Some(candidate);
                true
            }
        }
    }

    fn retire_checkout(&mut self) -> Option<PollGeneration> {
        let retired = self.checkout.take().map(|c| c.generation);
        if let Some(generation) = retired {
            tracing::debug!(generation = %generation, "Retired checkout poll generation");
        }
        retired
    }

    /// Settle into `target`; while a refresh is in flight, defer it instead.
    fn settle(&mut self, target: EntitlementState) {
        if self.state == EntitlementState::Checking {
            self.resume_state = Some(target);
        } else {
            self.transition(target);
        }
    }

    fn enter_checking(&mut self) {
        if self.state != EntitlementState::Checking {
            self.resume_state = Some(self.state);
            self.transition(EntitlementState::Checking);
        }
    }

    /// Leave `Checking` after a refresh, successful or not.
    fn finish_checking(&mut self) {
        use EntitlementState::*;

        let subscribed = self.is_subscribed();
        let resume = self.resume_state.take().unwrap_or(Uninitialized);
        let target = match resume {
            // The cancel call still owns the outcome
            Cancelling => Cancelling,
            _ if subscribed => {
                self.retire_checkout();
                Subscribed
            }
            CheckoutPending | Verifying if self.checkout.is_some() => resume,
            // Includes the first-ever check failing: fail closed
            _ => Unsubscribed,
        };
        self.transition(target);
    }

    /// Re-derive a settled state after a late refresh result was applied.
    fn reconcile(&mut self) {
        use EntitlementState::*;

        let subscribed = self.is_subscribed();
        if self.state.is_settled() {
            self.transition(EntitlementState::settled_for(subscribed));
        } else if self.state.is_checkout_in_progress() && subscribed {
            self.retire_checkout();
            self.transition(Subscribed);
        }
    }
}

impl EntitlementStateMachine {
    /// Create a machine in `Uninitialized` with the default request deadline.
    pub fn new(
        client: Arc<dyn EntitlementClient>,
        identity_store: Arc<dyn IdentityStore>,
    ) -> Self {
        let (view_tx, _) = watch::channel(EntitlementView::initial());
        let (generation_tx, _) = watch::channel(None);
        Self {
            client,
            identity_store,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            inner: Mutex::new(Inner::new()),
            view_tx,
            generation_tx,
        }
    }

    /// Set the deadline applied to every backend call.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Current state and last trusted snapshot.
    pub fn current_state(&self) -> EntitlementView {
        self.lock().view()
    }

    /// Receive every published change to the view.
    pub fn subscribe(&self) -> watch::Receiver<EntitlementView> {
        self.view_tx.subscribe()
    }

    /// The checkout currently awaiting completion, if any.
    pub fn active_checkout(&self) -> Option<CheckoutSession> {
        self.lock().checkout.as_ref().map(|c| c.session.clone())
    }

    /// Resolve this installation's identity.
    pub async fn identity(&self) -> Result<ClientIdentity, EntitlementError> {
        Ok(self.identity_store.get_or_create_identity().await?)
    }

    /// Re-fetch the authoritative status.
    ///
    /// Returns the cached snapshot after the fetch was folded in, which is
    /// the fetched one unless a newer sample already arrived.
    ///
    /// # Errors
    ///
    /// - `StorageUnavailable` if no identity can be resolved
    /// - `Network` on transport failure, timeout, or backend refusal
    /// - `MalformedResponse` if the backend's body is not understood
    ///
    /// None of these touch the cached snapshot.
    pub async fn refresh(&self) -> Result<EntitlementSnapshot, EntitlementError> {
        self.mutate(Inner::enter_checking);

        match self.fetch_status().await {
            Ok(snapshot) => {
                let cached = self.mutate(|inner| {
                    inner.apply_snapshot(snapshot.clone());
                    if inner.state == EntitlementState::Checking {
                        inner.finish_checking();
                    } else {
                        inner.reconcile();
                    }
                    inner.snapshot.clone().unwrap_or(snapshot)
                });
                tracing::info!(
                    status = %cached.status(),
                    is_subscribed = cached.is_subscribed(),
                    "Entitlement refreshed"
                );
                Ok(cached)
            }
            Err(error) => {
                tracing::warn!(error = %error, "Entitlement refresh failed, keeping last known state");
                self.mutate(|inner| {
                    if inner.state == EntitlementState::Checking {
                        inner.finish_checking();
                    }
                });
                Err(error)
            }
        }
    }

    async fn fetch_status(&self) -> Result<EntitlementSnapshot, EntitlementError> {
        let identity = self.identity().await?;
        let snapshot = with_deadline(
            Endpoint::Status,
            self.request_timeout,
            self.client.fetch_status(&identity),
        )
        .await?;
        Ok(snapshot)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Checkout and cancellation transitions (driven by CheckoutCoordinator)
    // ════════════════════════════════════════════════════════════════════════════

    pub(crate) fn client(&self) -> &Arc<dyn EntitlementClient> {
        &self.client
    }

    pub(crate) fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Watch the active poll generation; any change retires older polls.
    pub(crate) fn watch_generation(&self) -> watch::Receiver<Option<PollGeneration>> {
        self.generation_tx.subscribe()
    }

    pub(crate) fn ensure_checkout_allowed(&self) -> Result<(), EntitlementError> {
        checkout_allowed(&self.lock())
    }

    /// Install a freshly created session, superseding any outstanding one.
    pub(crate) fn install_checkout(
        &self,
        session: CheckoutSession,
    ) -> Result<PollGeneration, EntitlementError> {
        self.mutate(|inner| {
            checkout_allowed(inner)?;

            let generation = inner.next_generation;
            inner.next_generation = generation.next();
            if let Some(previous) = inner.retire_checkout() {
                tracing::info!(
                    previous = %previous,
                    generation = %generation,
                    "Superseding outstanding checkout"
                );
            }

            tracing::info!(
                session_id = %session.session_id,
                generation = %generation,
                "Checkout pending"
            );
            inner.checkout = Some(ActiveCheckout {
                session,
                generation,
            });
            inner.settle(EntitlementState::CheckoutPending);
            Ok(generation)
        })
    }

    /// Claim the active checkout for a polling run.
    pub(crate) fn start_verifying(
        &self,
        session_id: &CheckoutSessionId,
    ) -> Result<PollGeneration, String> {
        use EntitlementState::*;

        self.mutate(|inner| {
            let generation = match &inner.checkout {
                Some(active) if active.session.session_id == *session_id => active.generation,
                Some(_) => return Err(format!("session {} is not the active checkout", session_id)),
                None => return Err(format!("no active checkout for session {}", session_id)),
            };

            match (inner.state, inner.resume_state) {
                (CheckoutPending, _) => inner.transition(Verifying),
                (Checking, Some(CheckoutPending)) => inner.resume_state = Some(Verifying),
                _ => {
                    return Err(format!(
                        "checkout {} is already awaiting completion",
                        session_id
                    ))
                }
            }
            Ok(generation)
        })
    }

    /// Check the live machine before a poll attempt.
    ///
    /// Returns the outcome the poll should end with, or `None` to continue.
    pub(crate) fn poll_check(&self, generation: PollGeneration) -> Option<CheckoutOutcome> {
        self.mutate(|inner| {
            if inner.state == EntitlementState::Subscribed {
                if inner.active_generation() == Some(generation) {
                    inner.retire_checkout();
                }
                return Some(CheckoutOutcome::Activated);
            }
            if inner.active_generation() != Some(generation) {
                return Some(if inner.is_subscribed() {
                    CheckoutOutcome::Activated
                } else {
                    CheckoutOutcome::StillPending
                });
            }
            None
        })
    }

    /// Fold in a verify response that confirmed the subscription.
    ///
    /// Returns true if the machine is now subscribed because of it.
    pub(crate) fn complete_checkout(
        &self,
        generation: PollGeneration,
        sample: EntitlementSnapshot,
    ) -> bool {
        self.mutate(|inner| {
            if inner.active_generation() != Some(generation) {
                tracing::debug!(generation = %generation, "Discarding verify result from retired poll");
                return false;
            }

            inner.retire_checkout();
            inner.apply_snapshot(sample);
            let subscribed = inner.is_subscribed();
            inner.settle(EntitlementState::settled_for(subscribed));
            tracing::info!(generation = %generation, subscribed, "Checkout verified");
            subscribed
        })
    }

    /// End a poll that ran out of attempts.
    ///
    /// Returns false if something newer already retired this generation.
    pub(crate) fn expire_checkout(
        &self,
        generation: PollGeneration,
        last_sample: Option<EntitlementSnapshot>,
    ) -> bool {
        self.mutate(|inner| {
            if inner.active_generation() != Some(generation) {
                return false;
            }

            inner.retire_checkout();
            if let Some(sample) = last_sample {
                inner.apply_snapshot(sample);
            }
            let target = EntitlementState::settled_for(inner.is_subscribed());
            inner.settle(target);
            true
        })
    }

    /// Drop the outstanding checkout and stop its poll.
    pub(crate) fn abandon_checkout(&self) -> Option<PollGeneration> {
        self.mutate(|inner| {
            let retired = inner.retire_checkout()?;
            let target = EntitlementState::settled_for(inner.is_subscribed());
            inner.settle(target);
            Some(retired)
        })
    }

    pub(crate) fn begin_cancelling(&self) -> Result<(), EntitlementError> {
        self.mutate(|inner| {
            if inner.state != EntitlementState::Subscribed {
                return Err(EntitlementError::invalid_state(
                    inner.state,
                    "cancel subscription",
                ));
            }
            inner.transition(EntitlementState::Cancelling);
            Ok(())
        })
    }

    /// Settle a cancellation: per the returned snapshot, or back to what the
    /// cache says (normally `Subscribed`) when the call failed.
    pub(crate) fn finish_cancelling(&self, returned: Option<EntitlementSnapshot>) {
        self.mutate(|inner| {
            if let Some(snapshot) = returned {
                inner.apply_snapshot(snapshot);
            }
            let target = EntitlementState::settled_for(inner.is_subscribed());

            match inner.state {
                EntitlementState::Cancelling => inner.transition(target),
                EntitlementState::Checking
                    if inner.resume_state == Some(EntitlementState::Cancelling) =>
                {
                    inner.resume_state = Some(target);
                }
                state => {
                    tracing::debug!(state = %state, "Cancellation finished after state moved on");
                }
            }
        })
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one transition step and publish what changed.
    fn mutate<R>(&self, step: impl FnOnce(&mut Inner) -> R) -> R {
        let mut inner = self.lock();
        let result = step(&mut inner);

        let view = inner.view();
        let generation = inner.active_generation();
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                return false;
            }
            *current = view;
            true
        });
        self.generation_tx.send_if_modified(|current| {
            if *current == generation {
                return false;
            }
            *current = generation;
            true
        });

        result
    }
}

/// A refresh in flight does not block checkout if the state it interrupted
/// would have allowed it.
fn checkout_allowed(inner: &Inner) -> Result<(), EntitlementError> {
    use EntitlementState::*;

    let effective = match (inner.state, inner.resume_state) {
        (Checking, Some(resume)) => resume,
        (state, _) => state,
    };
    if effective == Unsubscribed || effective.is_checkout_in_progress() {
        Ok(())
    } else {
        Err(EntitlementError::checkout_initiation_failed(format!(
            "cannot start checkout while {}",
            inner.state
        )))
    }
}
