//! Subscription backend adapters.
//!
//! Implements the `EntitlementClient` port:
//! - `HttpEntitlementClient` talks JSON over HTTP to the real backend
//! - `MockEntitlementClient` simulates the backend in memory for tests
//!
//! # Configuration
//!
//! The HTTP adapter needs the backend base URL, by default
//! `http://localhost:8001/api/subscription`. Endpoint paths (`status`,
//! `create-checkout`, `verify-session`, `cancel`) are joined beneath it.

mod dto;
mod http_client;
mod mock_client;

pub use dto::{
    AckResponse, CreateCheckoutResponse, StatusResponse, UserRequest, VerifySessionResponse,
};
pub use http_client::{BackendClientConfig, HttpClientBuildError, HttpEntitlementClient};
pub use mock_client::{
    MethodCall, MockEntitlementClient, CANCEL_SUBSCRIPTION, CREATE_CHECKOUT, DEV_ACTIVATE,
    FETCH_STATUS, VERIFY_CHECKOUT,
};
