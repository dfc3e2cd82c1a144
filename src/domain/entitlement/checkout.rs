//! Checkout attempt value objects.
//!
//! Everything here is transient: a checkout session lives for one attempt,
//! a poll attempt for one polling run. Neither is ever persisted.

use serde::Serialize;
use std::fmt;

use super::EntitlementSnapshot;
use crate::domain::foundation::{CheckoutSessionId, Timestamp};

/// URL of the externally hosted checkout page.
pub type ExternalUrl = String;

/// One outstanding checkout created by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutSession {
    pub session_id: CheckoutSessionId,
    pub created_at: Timestamp,
    pub external_url: ExternalUrl,
}

impl CheckoutSession {
    pub fn new(session_id: CheckoutSessionId, external_url: impl Into<String>) -> Self {
        Self {
            session_id,
            created_at: Timestamp::now(),
            external_url: external_url.into(),
        }
    }
}

/// Token identifying one polling run.
///
/// Strictly increasing per state machine; a result tagged with anything
/// other than the currently active generation is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PollGeneration(u64);

impl PollGeneration {
    pub const fn first() -> Self {
        Self(1)
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PollGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

/// Counter state scoping one polling run.
#[derive(Debug, Clone)]
pub struct PollAttempt {
    generation: PollGeneration,
    count: u32,
    started_at: Timestamp,
    last_sample: Option<EntitlementSnapshot>,
}

impl PollAttempt {
    pub fn start(generation: PollGeneration) -> Self {
        Self {
            generation,
            count: 0,
            started_at: Timestamp::now(),
            last_sample: None,
        }
    }

    pub fn generation(&self) -> PollGeneration {
        self.generation
    }

    /// Number of verify calls issued so far.
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// Registers one more verify call and returns its 1-based attempt number.
    pub fn record_attempt(&mut self) -> u32 {
        self.count += 1;
        self.count
    }

    /// Keeps the newest verify response seen in this run.
    pub fn record_sample(&mut self, sample: EntitlementSnapshot) {
        let newer = self
            .last_sample
            .as_ref()
            .map_or(true, |current| sample.supersedes(current));
        if newer {
            self.last_sample = Some(sample);
        }
    }

    pub fn last_sample(&self) -> Option<&EntitlementSnapshot> {
        self.last_sample.as_ref()
    }

    pub fn into_last_sample(self) -> Option<EntitlementSnapshot> {
        self.last_sample
    }

    pub fn is_exhausted(&self, max_attempts: u32) -> bool {
        self.count >= max_attempts
    }
}

/// Terminal result of `await_completion`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckoutOutcome {
    /// Backend confirmed the subscription; state is `Subscribed`.
    Activated,

    /// Polling stopped early (cancelled or superseded); checkout may still
    /// complete in the browser.
    StillPending,

    /// Attempt cap reached without confirmation. Not an error: a later
    /// manual refresh picks up a late completion.
    TimedOut,

    /// Polling could not run for this session.
    Failed { reason: String },
}

impl CheckoutOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        CheckoutOutcome::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_activated(&self) -> bool {
        matches!(self, CheckoutOutcome::Activated)
    }
}
