//! Integration tests for the HTTP backend adapter.
//!
//! These run the real reqwest client against an in-process fake backend:
//! 1. Status responses map to the right snapshots
//! 2. Transport, HTTP and decode failures map to the right error kinds
//! 3. Checkout, verify and cancel follow the backend's wire contract

mod common;

use std::time::Duration;

use common::{FakeBackend, StatusMode};
use entitlement_sync::domain::entitlement::SubscriptionStatus;
use entitlement_sync::domain::foundation::{CheckoutSessionId, ClientIdentity, Timestamp};
use entitlement_sync::ports::{ClientError, EntitlementClient, Endpoint};

fn user(id: &str) -> ClientIdentity {
    ClientIdentity::new(id).unwrap()
}

// =============================================================================
// fetch_status
// =============================================================================

#[tokio::test]
async fn status_maps_backend_states() {
    let backend = FakeBackend::start().await;
    let client = backend.client(Duration::from_secs(5));
    backend.set_status("active-user", "active");
    backend.set_status("lapsed-user", "cancelled");

    let none = client.fetch_status(&user("new-user")).await.unwrap();
    assert_eq!(none.status(), SubscriptionStatus::None);
    assert!(!none.is_subscribed());

    let active = client.fetch_status(&user("active-user")).await.unwrap();
    assert_eq!(active.status(), SubscriptionStatus::Active);
    assert!(active.is_subscribed());

    let lapsed = client.fetch_status(&user("lapsed-user")).await.unwrap();
    assert_eq!(lapsed.status(), SubscriptionStatus::Cancelled);
    assert!(!lapsed.is_subscribed());
}

#[tokio::test]
async fn status_is_stamped_when_issued() {
    let backend = FakeBackend::start().await;
    let client = backend.client(Duration::from_secs(5));

    let before = Timestamp::now();
    let snapshot = client.fetch_status(&user("U1")).await.unwrap();
    let after = Timestamp::now();

    assert!(snapshot.fetched_at() >= before);
    assert!(snapshot.fetched_at() <= after);
}

#[tokio::test]
async fn malformed_body_is_malformed_response() {
    let backend = FakeBackend::start().await;
    let client = backend.client(Duration::from_secs(5));
    backend.set_status_mode(StatusMode::Malformed);

    let err = client.fetch_status(&user("U1")).await.unwrap_err();

    assert!(matches!(err, ClientError::MalformedResponse { .. }));
    assert!(!err.is_network());
    assert_eq!(err.endpoint(), Endpoint::Status);
}

#[tokio::test]
async fn server_error_is_network_error() {
    let backend = FakeBackend::start().await;
    let client = backend.client(Duration::from_secs(5));
    backend.set_status_mode(StatusMode::ServerError);

    let err = client.fetch_status(&user("U1")).await.unwrap_err();

    assert!(err.is_network());
    assert!(err.to_string().contains("HTTP 500"), "got: {}", err);
}

#[tokio::test]
async fn hanging_backend_hits_client_timeout() {
    let backend = FakeBackend::start().await;
    let client = backend.client(Duration::from_millis(300));
    backend.set_status_mode(StatusMode::Hang);

    let started = std::time::Instant::now();
    let err = client.fetch_status(&user("U1")).await.unwrap_err();

    assert!(err.is_network());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn unreachable_backend_is_network_error() {
    // Grab a free port, then close it
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = entitlement_sync::adapters::backend::BackendClientConfig::new(&format!(
        "http://{}/api/subscription",
        addr
    ))
    .unwrap()
    .with_timeout(Duration::from_secs(2));
    let client = entitlement_sync::adapters::backend::HttpEntitlementClient::new(config).unwrap();

    let err = client.fetch_status(&user("U1")).await.unwrap_err();
    assert!(err.is_network());
}

// =============================================================================
// create_checkout / verify_checkout
// =============================================================================

#[tokio::test]
async fn create_checkout_returns_session_and_url() {
    let backend = FakeBackend::start().await;
    let client = backend.client(Duration::from_secs(5));

    let session = client.create_checkout(&user("U1")).await.unwrap();

    assert_eq!(session.session_id.as_str(), "cs_test_0001");
    assert!(session.external_url.starts_with("https://checkout.stripe.test/"));
}

#[tokio::test]
async fn session_id_recovered_from_checkout_url() {
    let backend = FakeBackend::start().await;
    let client = backend.client(Duration::from_secs(5));
    backend.omit_session_ids();

    let session = client.create_checkout(&user("U1")).await.unwrap();

    assert_eq!(session.session_id.as_str(), "cs_test_0001");
}

#[tokio::test]
async fn verify_is_pending_until_paid_then_idempotent() {
    let backend = FakeBackend::start().await;
    let client = backend.client(Duration::from_secs(5));
    let identity = user("U1");
    let session = client.create_checkout(&identity).await.unwrap();

    let pending = client
        .verify_checkout(&identity, &session.session_id)
        .await
        .unwrap();
    assert_eq!(pending.status(), SubscriptionStatus::Pending);
    assert!(!pending.is_subscribed());

    backend.pay(session.session_id.as_str());

    for _ in 0..2 {
        let active = client
            .verify_checkout(&identity, &session.session_id)
            .await
            .unwrap();
        assert!(active.is_subscribed());
    }
    assert_eq!(backend.verify_calls(), 3);
    assert_eq!(backend.status_of("U1"), "active");
}

#[tokio::test]
async fn verify_unknown_session_is_rejected() {
    let backend = FakeBackend::start().await;
    let client = backend.client(Duration::from_secs(5));

    let err = client
        .verify_checkout(&user("U1"), &CheckoutSessionId::new("cs_unknown").unwrap())
        .await
        .unwrap_err();

    assert!(err.is_network());
    assert_eq!(err.endpoint(), Endpoint::VerifySession);
}

// =============================================================================
// cancel_subscription
// =============================================================================

#[tokio::test]
async fn cancel_returns_cancelled_snapshot() {
    let backend = FakeBackend::start().await;
    let client = backend.client(Duration::from_secs(5));
    backend.set_status("U1", "active");

    let snapshot = client.cancel_subscription(&user("U1")).await.unwrap();

    assert_eq!(snapshot.status(), SubscriptionStatus::Cancelled);
    assert!(!snapshot.is_subscribed());
    assert_eq!(backend.status_of("U1"), "cancelled");
}
