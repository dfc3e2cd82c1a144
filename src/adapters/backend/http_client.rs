//! HTTP adapter for the subscription backend.
//!
//! Implements `EntitlementClient` over JSON/HTTP using `reqwest`.
//!
//! # Behavior
//!
//! - Every request carries the configured timeout; a timeout is a `Network` error
//! - Non-2xx statuses and `success: false` bodies are `Network` errors
//! - Bodies that fail to decode into the endpoint's DTO are `MalformedResponse`
//! - `fetched_at` is stamped when the request is issued, not when it returns
//!
//! # Configuration
//!
//! ```ignore
//! let config = BackendClientConfig::new("http://localhost:8001/api/subscription")?
//!     .with_timeout(Duration::from_secs(10));
//! let client = HttpEntitlementClient::new(config)?;
//! ```

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

use crate::domain::entitlement::{CheckoutSession, EntitlementSnapshot, SubscriptionStatus};
use crate::domain::foundation::{CheckoutSessionId, ClientIdentity, Timestamp};
use crate::ports::{ClientError, EntitlementClient, Endpoint};

use super::dto::{
    AckResponse, CreateCheckoutResponse, StatusResponse, UserRequest, VerifySessionResponse,
};

/// Default request timeout when none is configured.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest error body echoed into a `Network` cause.
const MAX_ERROR_BODY: usize = 200;

/// Errors constructing the HTTP adapter.
#[derive(Debug, Error)]
pub enum HttpClientBuildError {
    #[error("invalid backend base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Connection settings for the backend.
#[derive(Debug, Clone)]
pub struct BackendClientConfig {
    base_url: reqwest::Url,
    request_timeout: Duration,
}

impl BackendClientConfig {
    /// Parse the base URL. A trailing slash is added so endpoint paths join
    /// beneath it instead of replacing its last segment.
    pub fn new(base_url: &str) -> Result<Self, HttpClientBuildError> {
        let invalid = |reason: String| HttpClientBuildError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason,
        };

        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let url = reqwest::Url::parse(&normalized).map_err(|e| invalid(e.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
        }

        Ok(Self {
            base_url: url,
            request_timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &reqwest::Url {
        &self.base_url
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

/// Backend client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpEntitlementClient {
    config: BackendClientConfig,
    http_client: reqwest::Client,
}

impl HttpEntitlementClient {
    /// Create a new adapter with the given configuration.
    pub fn new(config: BackendClientConfig) -> Result<Self, HttpClientBuildError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn url(&self, endpoint: Endpoint) -> Result<reqwest::Url, ClientError> {
        self.config
            .base_url
            .join(endpoint.path())
            .map_err(|e| ClientError::network(endpoint, format!("bad URL: {}", e)))
    }

    /// Send a request and decode the typed response body.
    async fn send<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!(endpoint = %endpoint, error = %e, "Backend request failed");
            if e.is_timeout() {
                ClientError::timed_out(endpoint, self.config.request_timeout)
            } else {
                ClientError::network(endpoint, e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(endpoint = %endpoint, status = %status, "Backend returned error status");
            return Err(ClientError::network(
                endpoint,
                format!("HTTP {}: {}", status, truncate(&body, MAX_ERROR_BODY)),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::network(endpoint, e.to_string()))?;

        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::warn!(endpoint = %endpoint, error = %e, "Backend response did not decode");
            ClientError::malformed(endpoint, e.to_string())
        })
    }
}

#[async_trait]
impl EntitlementClient for HttpEntitlementClient {
    async fn fetch_status(
        &self,
        identity: &ClientIdentity,
    ) -> Result<EntitlementSnapshot, ClientError> {
        let endpoint = Endpoint::Status;
        let issued_at = Timestamp::now();
        let request = self
            .http_client
            .get(self.url(endpoint)?)
            .query(&[("user_id", identity.as_str())]);

        let response: StatusResponse = self.send(endpoint, request).await?;
        let status = response.into_status()?;

        tracing::debug!(user_id = %identity, status = %status, "Fetched subscription status");
        Ok(EntitlementSnapshot::new(status, issued_at))
    }

    async fn create_checkout(
        &self,
        identity: &ClientIdentity,
    ) -> Result<CheckoutSession, ClientError> {
        let endpoint = Endpoint::CreateCheckout;
        let request = self
            .http_client
            .post(self.url(endpoint)?)
            .json(&UserRequest {
                user_id: identity.as_str(),
            });

        let response: CreateCheckoutResponse = self.send(endpoint, request).await?;
        let (session_id, checkout_url) = response.into_parts()?;

        tracing::info!(user_id = %identity, session_id = %session_id, "Checkout session created");
        Ok(CheckoutSession::new(session_id, checkout_url))
    }

    async fn verify_checkout(
        &self,
        identity: &ClientIdentity,
        session_id: &CheckoutSessionId,
    ) -> Result<EntitlementSnapshot, ClientError> {
        let endpoint = Endpoint::VerifySession;
        let issued_at = Timestamp::now();
        let request = self.http_client.post(self.url(endpoint)?).query(&[
            ("session_id", session_id.as_str()),
            ("user_id", identity.as_str()),
        ]);

        let response: VerifySessionResponse = self.send(endpoint, request).await?;
        let status = response.into_status()?;

        Ok(EntitlementSnapshot::new(status, issued_at))
    }

    async fn cancel_subscription(
        &self,
        identity: &ClientIdentity,
    ) -> Result<EntitlementSnapshot, ClientError> {
        let endpoint = Endpoint::Cancel;
        let issued_at = Timestamp::now();
        let request = self
            .http_client
            .post(self.url(endpoint)?)
            .json(&UserRequest {
                user_id: identity.as_str(),
            });

        let response: AckResponse = self.send(endpoint, request).await?;
        response.into_result(endpoint)?;

        tracing::info!(user_id = %identity, "Subscription cancelled");
        Ok(EntitlementSnapshot::new(SubscriptionStatus::Cancelled, issued_at))
    }
}

#[cfg(feature = "dev-activate")]
#[async_trait]
impl crate::ports::DevActivation for HttpEntitlementClient {
    async fn dev_activate(&self, identity: &ClientIdentity) -> Result<(), ClientError> {
        let endpoint = Endpoint::DevActivate;
        let request = self
            .http_client
            .post(self.url(endpoint)?)
            .json(&UserRequest {
                user_id: identity.as_str(),
            });

        let response: AckResponse = self.send(endpoint, request).await?;
        response.into_result(endpoint)?;

        tracing::warn!(user_id = %identity, "Subscription activated through dev bypass");
        Ok(())
    }
}

fn truncate(body: &str, max: usize) -> &str {
    match body.char_indices().nth(max) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
