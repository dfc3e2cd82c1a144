//! End-to-end entitlement flows over the real adapters.
//!
//! Wires the file identity store and the reqwest client against the fake
//! backend, then drives refresh, checkout, polling and cancellation the way
//! the UI layer would.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FakeBackend, StatusMode};
use entitlement_sync::adapters::storage::FileIdentityStore;
use entitlement_sync::application::{CheckoutCoordinatorConfig, EntitlementRuntime};
use entitlement_sync::config::AppConfig;
use entitlement_sync::domain::entitlement::{
    AccessDecision, AccessGate, CheckoutOutcome, EntitlementError, EntitlementState,
};
use entitlement_sync::ports::IdentityStore;

// =============================================================================
// Test Infrastructure
// =============================================================================

struct Harness {
    backend: FakeBackend,
    runtime: EntitlementRuntime,
    identity_path: std::path::PathBuf,
    _dir: tempfile::TempDir,
}

async fn harness(polling: CheckoutCoordinatorConfig) -> Harness {
    let backend = FakeBackend::start().await;
    let dir = tempfile::tempdir().unwrap();
    let identity_path = dir.path().join("identity.yaml");

    let runtime = EntitlementRuntime::new(
        Arc::new(backend.client(Duration::from_secs(2))),
        Arc::new(FileIdentityStore::new(&identity_path)),
        Duration::from_secs(2),
        polling,
    );

    Harness {
        backend,
        runtime,
        identity_path,
        _dir: dir,
    }
}

fn fast_polling() -> CheckoutCoordinatorConfig {
    CheckoutCoordinatorConfig::default()
        .with_poll_interval(Duration::from_millis(20))
        .with_max_attempts(50)
}

async fn user_id(h: &Harness) -> String {
    h.runtime.machine().identity().await.unwrap().to_string()
}

// =============================================================================
// Identity
// =============================================================================

#[tokio::test]
async fn identity_persists_across_store_instances() {
    let h = harness(fast_polling()).await;

    let first = user_id(&h).await;
    let reopened = FileIdentityStore::new(&h.identity_path)
        .get_or_create_identity()
        .await
        .unwrap();

    assert_eq!(first, reopened.to_string());
    assert!(h.identity_path.exists());
}

// =============================================================================
// Refresh
// =============================================================================

#[tokio::test]
async fn first_launch_lands_on_paywall() {
    let h = harness(fast_polling()).await;

    h.runtime.machine().refresh().await.unwrap();

    let view = h.runtime.machine().current_state();
    assert_eq!(view.state, EntitlementState::Unsubscribed);
    assert_eq!(AccessGate::for_view(&view), AccessDecision::ShowPaywall);
}

#[tokio::test]
async fn outage_keeps_confirmed_subscription() {
    let h = harness(fast_polling()).await;
    let id = user_id(&h).await;
    h.backend.set_status(&id, "active");
    h.runtime.machine().refresh().await.unwrap();

    h.backend.set_status_mode(StatusMode::ServerError);
    let err = h.runtime.machine().refresh().await.unwrap_err();

    assert!(matches!(err, EntitlementError::Network { .. }));
    let view = h.runtime.machine().current_state();
    assert_eq!(view.state, EntitlementState::Subscribed);
    assert_eq!(AccessGate::for_view(&view), AccessDecision::ShowTool);
}

#[tokio::test]
async fn malformed_status_fails_closed_on_first_launch() {
    let h = harness(fast_polling()).await;
    h.backend.set_status_mode(StatusMode::Malformed);

    let err = h.runtime.machine().refresh().await.unwrap_err();

    assert!(matches!(err, EntitlementError::MalformedResponse { .. }));
    let view = h.runtime.machine().current_state();
    assert_eq!(view.state, EntitlementState::Unsubscribed);
    assert!(view.snapshot.is_none());
}

// =============================================================================
// Checkout
// =============================================================================

#[tokio::test]
async fn checkout_completes_after_payment() {
    let h = harness(fast_polling()).await;
    let machine = h.runtime.machine();
    let coordinator = h.runtime.coordinator();
    machine.refresh().await.unwrap();

    let url = coordinator.begin_checkout().await.unwrap();
    assert!(url.contains("cs_test_0001"));
    let session = coordinator.active_session().unwrap();

    let poll = {
        let coordinator = Arc::clone(coordinator);
        let session_id = session.session_id.clone();
        tokio::spawn(async move { coordinator.await_completion(&session_id).await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    h.backend.pay(session.session_id.as_str());

    assert_eq!(poll.await.unwrap(), CheckoutOutcome::Activated);
    let view = machine.current_state();
    assert_eq!(view.state, EntitlementState::Subscribed);
    assert_eq!(AccessGate::for_view(&view), AccessDecision::ShowTool);
    assert!(h.backend.verify_calls() >= 1);
}

#[tokio::test]
async fn unpaid_checkout_times_out_and_stays_on_paywall() {
    let polling = CheckoutCoordinatorConfig::default()
        .with_poll_interval(Duration::from_millis(10))
        .with_max_attempts(3);
    let h = harness(polling).await;
    let coordinator = h.runtime.coordinator();
    h.runtime.machine().refresh().await.unwrap();

    coordinator.begin_checkout().await.unwrap();
    let session = coordinator.active_session().unwrap();
    let outcome = coordinator.await_completion(&session.session_id).await;

    assert_eq!(outcome, CheckoutOutcome::TimedOut);
    assert_eq!(h.backend.verify_calls(), 3);
    assert_eq!(
        h.runtime.machine().current_state().state,
        EntitlementState::Unsubscribed
    );
}

#[tokio::test]
async fn late_payment_is_picked_up_by_refresh() {
    let polling = CheckoutCoordinatorConfig::default()
        .with_poll_interval(Duration::from_millis(10))
        .with_max_attempts(2);
    let h = harness(polling).await;
    let coordinator = h.runtime.coordinator();
    h.runtime.machine().refresh().await.unwrap();

    coordinator.begin_checkout().await.unwrap();
    let session = coordinator.active_session().unwrap();
    assert_eq!(
        coordinator.await_completion(&session.session_id).await,
        CheckoutOutcome::TimedOut
    );

    // Webhook lands after we gave up
    let id = user_id(&h).await;
    h.backend.set_status(&id, "active");
    h.runtime.machine().refresh().await.unwrap();

    assert_eq!(
        h.runtime.machine().current_state().state,
        EntitlementState::Subscribed
    );
}

#[tokio::test]
async fn cancelled_poll_returns_promptly() {
    let polling = CheckoutCoordinatorConfig::default()
        .with_poll_interval(Duration::from_secs(30))
        .with_max_attempts(10);
    let h = harness(polling).await;
    let coordinator = h.runtime.coordinator();
    h.runtime.machine().refresh().await.unwrap();

    coordinator.begin_checkout().await.unwrap();
    let session = coordinator.active_session().unwrap();
    let poll = {
        let coordinator = Arc::clone(coordinator);
        tokio::spawn(async move { coordinator.await_completion(&session.session_id).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(coordinator.cancel_polling());
    let outcome = tokio::time::timeout(Duration::from_secs(1), poll)
        .await
        .expect("poll did not stop")
        .unwrap();

    assert_eq!(outcome, CheckoutOutcome::StillPending);
    assert_eq!(h.backend.verify_calls(), 0);
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test]
async fn cancel_moves_to_paywall() {
    let h = harness(fast_polling()).await;
    let id = user_id(&h).await;
    h.backend.set_status(&id, "active");
    h.runtime.machine().refresh().await.unwrap();

    h.runtime.coordinator().cancel().await.unwrap();

    assert_eq!(
        h.runtime.machine().current_state().state,
        EntitlementState::Unsubscribed
    );
    assert_eq!(h.backend.status_of(&id), "cancelled");

    // Backend agrees on the next refresh
    h.runtime.machine().refresh().await.unwrap();
    assert_eq!(
        h.runtime.machine().current_state().state,
        EntitlementState::Unsubscribed
    );
}

// =============================================================================
// Runtime from configuration
// =============================================================================

#[tokio::test]
async fn runtime_from_config_talks_to_backend() {
    let backend = FakeBackend::start().await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.backend.base_url = backend.base_url.clone();
    config.storage.identity_path = Some(dir.path().join("identity.yaml"));

    let runtime = EntitlementRuntime::from_config(&config).unwrap();
    let id = runtime.machine().identity().await.unwrap();
    backend.set_status(id.as_str(), "active");

    runtime.machine().refresh().await.unwrap();

    assert_eq!(
        runtime.machine().current_state().state,
        EntitlementState::Subscribed
    );
    runtime.shutdown();
}
