//! Wire types for the subscription backend.
//!
//! One strongly-typed response per endpoint. Each converts into domain types
//! or a `ClientError`, so duck-typed JSON never leaks past this module:
//! - `success: false` is a `Network` error (the backend refused the call)
//! - a body that parses but contradicts itself is `MalformedResponse`

use serde::{Deserialize, Serialize};

use crate::domain::entitlement::SubscriptionStatus;
use crate::domain::foundation::CheckoutSessionId;
use crate::ports::{ClientError, Endpoint};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// JSON body for endpoints keyed only by user (`/create-checkout`, `/cancel`, `/dev-activate`).
#[derive(Debug, Clone, Serialize)]
pub struct UserRequest<'a> {
    pub user_id: &'a str,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// `GET /status?user_id=ID`
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    #[serde(default)]
    pub is_subscribed: Option<bool>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl StatusResponse {
    /// Resolve the reported status.
    ///
    /// `is_subscribed: true` means `Active`. Otherwise the status string is
    /// used; a missing string means no subscription. Claiming `active` while
    /// reporting `is_subscribed: false` is contradictory and rejected.
    pub fn into_status(self) -> Result<SubscriptionStatus, ClientError> {
        const ENDPOINT: Endpoint = Endpoint::Status;
        ensure_success(ENDPOINT, self.success, self.message.as_deref())?;

        let is_subscribed = self
            .is_subscribed
            .ok_or_else(|| ClientError::malformed(ENDPOINT, "missing field `is_subscribed`"))?;

        if is_subscribed {
            return Ok(SubscriptionStatus::Active);
        }

        let status = match self.status.as_deref() {
            None => SubscriptionStatus::None,
            Some(raw) => raw
                .parse::<SubscriptionStatus>()
                .map_err(|e| ClientError::malformed(ENDPOINT, e.to_string()))?,
        };

        if status == SubscriptionStatus::Active {
            return Err(ClientError::malformed(
                ENDPOINT,
                "status is 'active' but is_subscribed is false",
            ));
        }

        Ok(status)
    }
}

/// `POST /create-checkout {user_id}`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCheckoutResponse {
    pub success: bool,
    #[serde(default)]
    pub checkout_url: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl CreateCheckoutResponse {
    /// Extract the checkout URL and its session id.
    ///
    /// The session id comes from `session_id` when the backend sends it,
    /// otherwise from the `cs_...` segment of the hosted checkout URL.
    pub fn into_parts(self) -> Result<(CheckoutSessionId, String), ClientError> {
        const ENDPOINT: Endpoint = Endpoint::CreateCheckout;
        ensure_success(ENDPOINT, self.success, self.message.as_deref())?;

        let url = self
            .checkout_url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ClientError::malformed(ENDPOINT, "missing field `checkout_url`"))?;

        let parsed = reqwest::Url::parse(&url)
            .map_err(|e| ClientError::malformed(ENDPOINT, format!("invalid checkout_url: {}", e)))?;

        let raw_id = match self.session_id.filter(|s| !s.is_empty()) {
            Some(id) => id,
            None => session_id_from_url(&parsed).ok_or_else(|| {
                ClientError::malformed(ENDPOINT, "no session id in response or checkout_url")
            })?,
        };

        let session_id = CheckoutSessionId::new(raw_id)
            .map_err(|e| ClientError::malformed(ENDPOINT, e.to_string()))?;

        Ok((session_id, url))
    }
}

/// `POST /verify-session?session_id=SID&user_id=ID`
#[derive(Debug, Clone, Deserialize)]
pub struct VerifySessionResponse {
    pub success: bool,
    #[serde(default)]
    pub is_subscribed: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

impl VerifySessionResponse {
    /// `Active` once the checkout resolved, `Pending` until then.
    pub fn into_status(self) -> Result<SubscriptionStatus, ClientError> {
        const ENDPOINT: Endpoint = Endpoint::VerifySession;
        ensure_success(ENDPOINT, self.success, self.message.as_deref())?;

        match self.is_subscribed {
            Some(true) => Ok(SubscriptionStatus::Active),
            Some(false) => Ok(SubscriptionStatus::Pending),
            None => Err(ClientError::malformed(ENDPOINT, "missing field `is_subscribed`")),
        }
    }
}

/// `POST /cancel` and `POST /dev-activate`
#[derive(Debug, Clone, Deserialize)]
pub struct AckResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

impl AckResponse {
    pub fn into_result(self, endpoint: Endpoint) -> Result<(), ClientError> {
        ensure_success(endpoint, self.success, self.message.as_deref())
    }
}

fn ensure_success(endpoint: Endpoint, success: bool, message: Option<&str>) -> Result<(), ClientError> {
    if success {
        Ok(())
    } else {
        Err(ClientError::network(
            endpoint,
            format!(
                "backend rejected request: {}",
                message.unwrap_or("no message")
            ),
        ))
    }
}

/// Stripe-style hosted checkout URLs carry the session id as a path segment
/// (`/c/pay/cs_test_...`) or as a `session_id` query parameter.
fn session_id_from_url(url: &reqwest::Url) -> Option<String> {
    let from_path = url
        .path_segments()
        .and_then(|mut segments| segments.find(|s| s.starts_with("cs_")))
        .map(str::to_string);

    from_path.or_else(|| {
        url.query_pairs()
            .find(|(key, _)| key == "session_id")
            .map(|(_, value)| value.into_owned())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(json: &str) -> Result<SubscriptionStatus, ClientError> {
        serde_json::from_str::<StatusResponse>(json).unwrap().into_status()
    }

    #[test]
    fn status_subscribed_is_active() {
        assert_eq!(
            status(r#"{"success": true, "is_subscribed": true, "status": "active"}"#),
            Ok(SubscriptionStatus::Active)
        );
    }

    #[test]
    fn status_not_subscribed_uses_status_string() {
        assert_eq!(
            status(r#"{"success": true, "is_subscribed": false, "status": "cancelled"}"#),
            Ok(SubscriptionStatus::Cancelled)
        );
        assert_eq!(
            status(r#"{"success": true, "is_subscribed": false}"#),
            Ok(SubscriptionStatus::None)
        );
    }

    #[test]
    fn status_contradiction_is_malformed() {
        let err = status(r#"{"success": true, "is_subscribed": false, "status": "active"}"#)
            .unwrap_err();
        assert!(!err.is_network());
    }

    #[test]
    fn status_unknown_string_is_malformed() {
        let err = status(r#"{"success": true, "is_subscribed": false, "status": "trialing"}"#)
            .unwrap_err();
        assert!(matches!(err, ClientError::MalformedResponse { .. }));
    }

    #[test]
    fn status_missing_flag_is_malformed() {
        let err = status(r#"{"success": true, "status": "none"}"#).unwrap_err();
        assert!(matches!(err, ClientError::MalformedResponse { .. }));
    }

    #[test]
    fn unsuccessful_response_is_network_error() {
        let err = status(r#"{"success": false, "message": "db down"}"#).unwrap_err();
        assert!(err.is_network());
        assert!(err.to_string().contains("db down"));
    }

    #[test]
    fn checkout_session_id_from_explicit_field() {
        let response: CreateCheckoutResponse = serde_json::from_str(
            r#"{"success": true, "checkout_url": "https://pay.example.com/x", "session_id": "cs_live_9"}"#,
        )
        .unwrap();
        let (id, url) = response.into_parts().unwrap();
        assert_eq!(id.as_str(), "cs_live_9");
        assert_eq!(url, "https://pay.example.com/x");
    }

    #[test]
    fn checkout_session_id_from_url_path() {
        let response: CreateCheckoutResponse = serde_json::from_str(
            r#"{"success": true, "checkout_url": "https://checkout.stripe.com/c/pay/cs_test_a1B2#fid"}"#,
        )
        .unwrap();
        let (id, _) = response.into_parts().unwrap();
        assert_eq!(id.as_str(), "cs_test_a1B2");
    }

    #[test]
    fn checkout_session_id_from_url_query() {
        let response: CreateCheckoutResponse = serde_json::from_str(
            r#"{"success": true, "checkout_url": "https://pay.example.com/start?session_id=sess_42"}"#,
        )
        .unwrap();
        let (id, _) = response.into_parts().unwrap();
        assert_eq!(id.as_str(), "sess_42");
    }

    #[test]
    fn checkout_without_session_id_is_malformed() {
        let response: CreateCheckoutResponse = serde_json::from_str(
            r#"{"success": true, "checkout_url": "https://pay.example.com/start"}"#,
        )
        .unwrap();
        assert!(matches!(
            response.into_parts(),
            Err(ClientError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn checkout_rejection_carries_message() {
        let response: CreateCheckoutResponse =
            serde_json::from_str(r#"{"success": false, "message": "plan not configured"}"#).unwrap();
        let err = response.into_parts().unwrap_err();
        assert!(err.is_network());
        assert!(err.to_string().contains("plan not configured"));
    }

    #[test]
    fn verify_maps_flag_to_status() {
        let resolved: VerifySessionResponse =
            serde_json::from_str(r#"{"success": true, "is_subscribed": true}"#).unwrap();
        let pending: VerifySessionResponse =
            serde_json::from_str(r#"{"success": true, "is_subscribed": false}"#).unwrap();
        assert_eq!(resolved.into_status(), Ok(SubscriptionStatus::Active));
        assert_eq!(pending.into_status(), Ok(SubscriptionStatus::Pending));
    }

    #[test]
    fn ack_failure_is_network_error() {
        let ack: AckResponse =
            serde_json::from_str(r#"{"success": false, "message": "no subscription"}"#).unwrap();
        assert!(ack.into_result(Endpoint::Cancel).unwrap_err().is_network());
    }
}
