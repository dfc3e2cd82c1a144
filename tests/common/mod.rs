//! In-process fake subscription backend for integration tests.
//!
//! Serves the same JSON routes as the real backend under
//! `/api/subscription`, with knobs to misbehave.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use entitlement_sync::adapters::backend::{BackendClientConfig, HttpEntitlementClient};

/// How `/status` answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusMode {
    #[default]
    Normal,
    /// 200 with a body that is not the expected JSON
    Malformed,
    /// 500 with a plain text body
    ServerError,
    /// Never answers within any sane deadline
    Hang,
}

#[derive(Debug, Default)]
struct FakeState {
    statuses: HashMap<String, String>,
    sessions: HashMap<String, String>,
    paid: HashSet<String>,
    status_mode: StatusMode,
    omit_session_id: bool,
    next_session: u32,
    verify_calls: u32,
}

type Shared = Arc<Mutex<FakeState>>;

pub struct FakeBackend {
    pub base_url: String,
    state: Shared,
}

impl FakeBackend {
    /// Bind to an ephemeral port and start serving.
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(FakeState::default()));

        let api = Router::new()
            .route("/status", get(status))
            .route("/create-checkout", post(create_checkout))
            .route("/verify-session", post(verify_session))
            .route("/cancel", post(cancel))
            .route("/dev-activate", post(dev_activate))
            .with_state(Arc::clone(&state));
        let app = Router::new().nest("/api/subscription", api);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}/api/subscription", addr),
            state,
        }
    }

    /// HTTP adapter pointed at this backend.
    pub fn client(&self, timeout: Duration) -> HttpEntitlementClient {
        let config = BackendClientConfig::new(&self.base_url)
            .unwrap()
            .with_timeout(timeout);
        HttpEntitlementClient::new(config).unwrap()
    }

    pub fn set_status(&self, user_id: &str, status: &str) {
        self.lock()
            .statuses
            .insert(user_id.to_string(), status.to_string());
    }

    pub fn status_of(&self, user_id: &str) -> String {
        self.lock()
            .statuses
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| "none".to_string())
    }

    pub fn set_status_mode(&self, mode: StatusMode) {
        self.lock().status_mode = mode;
    }

    /// Return checkout sessions without a `session_id` field.
    pub fn omit_session_ids(&self) {
        self.lock().omit_session_id = true;
    }

    /// Complete payment for a session, as the browser flow would.
    pub fn pay(&self, session_id: &str) {
        self.lock().paid.insert(session_id.to_string());
    }

    pub fn verify_calls(&self) -> u32 {
        self.lock().verify_calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }
}

#[derive(Debug, Deserialize)]
struct UserQuery {
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct UserBody {
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct VerifyQuery {
    session_id: String,
    user_id: String,
}

async fn status(State(state): State<Shared>, Query(query): Query<UserQuery>) -> Response {
    let (mode, status) = {
        let state = state.lock().unwrap();
        let status = state
            .statuses
            .get(&query.user_id)
            .cloned()
            .unwrap_or_else(|| "none".to_string());
        (state.status_mode, status)
    };

    match mode {
        StatusMode::Normal => status_body(&status).into_response(),
        StatusMode::Malformed => (StatusCode::OK, "<html>upstream gateway</html>").into_response(),
        StatusMode::ServerError => {
            (StatusCode::INTERNAL_SERVER_ERROR, "database unavailable").into_response()
        }
        StatusMode::Hang => {
            tokio::time::sleep(Duration::from_secs(30)).await;
            status_body(&status).into_response()
        }
    }
}

fn status_body(status: &str) -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "is_subscribed": status == "active",
        "status": status,
    }))
}

async fn create_checkout(State(state): State<Shared>, Json(body): Json<UserBody>) -> Response {
    let mut state = state.lock().unwrap();
    state.next_session += 1;
    let session_id = format!("cs_test_{:04}", state.next_session);
    state.sessions.insert(session_id.clone(), body.user_id);

    let checkout_url = format!("https://checkout.stripe.test/c/pay/{}#fidkdWxOYHwn", session_id);
    let body = if state.omit_session_id {
        json!({ "success": true, "checkout_url": checkout_url })
    } else {
        json!({ "success": true, "checkout_url": checkout_url, "session_id": session_id })
    };
    Json(body).into_response()
}

async fn verify_session(State(state): State<Shared>, Query(query): Query<VerifyQuery>) -> Response {
    let mut state = state.lock().unwrap();
    state.verify_calls += 1;

    let owner = state.sessions.get(&query.session_id).cloned();
    if owner.as_deref() != Some(query.user_id.as_str()) {
        return Json(json!({ "success": false, "message": "Session not found" })).into_response();
    }

    let paid = state.paid.contains(&query.session_id);
    if paid {
        state
            .statuses
            .insert(query.user_id.clone(), "active".to_string());
    }
    Json(json!({ "success": true, "is_subscribed": paid })).into_response()
}

async fn cancel(State(state): State<Shared>, Json(body): Json<UserBody>) -> Response {
    let mut state = state.lock().unwrap();
    state
        .statuses
        .insert(body.user_id, "cancelled".to_string());
    Json(json!({ "success": true, "message": "Subscription cancelled" })).into_response()
}

async fn dev_activate(State(state): State<Shared>, Json(body): Json<UserBody>) -> Response {
    let mut state = state.lock().unwrap();
    state.statuses.insert(body.user_id, "active".to_string());
    Json(json!({ "success": true })).into_response()
}
