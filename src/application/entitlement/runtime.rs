//! Process-wide wiring of the entitlement components.
//!
//! One `EntitlementRuntime` is built per process, handed to whatever needs
//! it, and shut down explicitly. There is no global instance.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::adapters::backend::{BackendClientConfig, HttpClientBuildError, HttpEntitlementClient};
use crate::adapters::storage::FileIdentityStore;
use crate::config::{AppConfig, ValidationError};
use crate::ports::{EntitlementClient, IdentityStore};

use super::{CheckoutCoordinator, CheckoutCoordinatorConfig, EntitlementStateMachine};

/// Errors building a runtime from configuration.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ValidationError),

    #[error("Backend client setup failed: {0}")]
    Backend(#[from] HttpClientBuildError),

    #[error("No identity location configured and no platform data directory available")]
    NoIdentityLocation,
}

/// The state machine and checkout coordinator sharing one backend client.
pub struct EntitlementRuntime {
    machine: Arc<EntitlementStateMachine>,
    coordinator: Arc<CheckoutCoordinator>,
}

impl EntitlementRuntime {
    /// Assemble a runtime from already-built adapters.
    pub fn new(
        client: Arc<dyn EntitlementClient>,
        identity_store: Arc<dyn IdentityStore>,
        request_timeout: Duration,
        coordinator_config: CheckoutCoordinatorConfig,
    ) -> Self {
        let machine = Arc::new(
            EntitlementStateMachine::new(client, identity_store)
                .with_request_timeout(request_timeout),
        );
        let coordinator = Arc::new(CheckoutCoordinator::with_config(
            Arc::clone(&machine),
            coordinator_config,
        ));
        Self {
            machine,
            coordinator,
        }
    }

    /// Build the production runtime: reqwest client, file identity store.
    ///
    /// # Errors
    ///
    /// - `Invalid` if `config` fails validation
    /// - `Backend` if the HTTP client cannot be built
    /// - `NoIdentityLocation` if no identity path can be determined
    pub fn from_config(config: &AppConfig) -> Result<Self, RuntimeError> {
        config.validate()?;

        let backend_config = BackendClientConfig::new(&config.backend.base_url)?
            .with_timeout(config.backend.request_timeout());
        let client = Arc::new(HttpEntitlementClient::new(backend_config)?);

        let identity_path = identity_path(config)?;
        tracing::info!(
            backend = %config.backend.base_url,
            identity_path = %identity_path.display(),
            environment = ?config.environment,
            "Building entitlement runtime"
        );
        let store: Arc<dyn IdentityStore> = Arc::new(FileIdentityStore::new(identity_path));

        let machine = Arc::new(
            EntitlementStateMachine::new(client.clone(), store)
                .with_request_timeout(config.backend.request_timeout()),
        );
        let coordinator =
            CheckoutCoordinator::with_config(Arc::clone(&machine), config.polling.coordinator_config());

        #[cfg(feature = "dev-activate")]
        let coordinator = if config.dev_activate_allowed() {
            tracing::warn!("Dev activation bypass enabled");
            coordinator.with_dev_activation(client)
        } else {
            coordinator
        };

        Ok(Self {
            machine,
            coordinator: Arc::new(coordinator),
        })
    }

    pub fn machine(&self) -> &Arc<EntitlementStateMachine> {
        &self.machine
    }

    pub fn coordinator(&self) -> &Arc<CheckoutCoordinator> {
        &self.coordinator
    }

    /// Stop any in-flight checkout poll.
    pub fn shutdown(&self) {
        self.coordinator.shutdown();
        tracing::debug!("Entitlement runtime shut down");
    }
}

fn identity_path(config: &AppConfig) -> Result<PathBuf, RuntimeError> {
    config
        .storage
        .identity_path
        .clone()
        .or_else(FileIdentityStore::default_path)
        .ok_or(RuntimeError::NoIdentityLocation)
}
