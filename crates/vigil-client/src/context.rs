//! Explicit handle to the backend collaborators.
//!
//! Every view receives an [`AppContext`] instead of reaching for a global
//! client. Cloning is cheap: all fields are reference counted.

use std::sync::Arc;

use vigil_net::RegistrationNotifier;
use vigil_shared::config::ClientConfig;
use vigil_shared::types::UserId;
use vigil_store::RemoteStore;

use crate::error::ClientError;
use crate::feed::ChangeFeed;

#[derive(Clone)]
pub struct AppContext {
    store: Arc<dyn RemoteStore>,
    notifier: Arc<dyn RegistrationNotifier>,
    config: Arc<ClientConfig>,
}

impl AppContext {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        notifier: Arc<dyn RegistrationNotifier>,
        config: ClientConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            config: Arc::new(config),
        }
    }

    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    pub fn notifier(&self) -> &Arc<dyn RegistrationNotifier> {
        &self.notifier
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn feed(&self) -> ChangeFeed {
        ChangeFeed::new(self.store.clone())
    }

    /// The signed-in user, or [`ClientError::AuthRequired`].
    pub async fn identity(&self) -> Result<UserId, ClientError> {
        self.store
            .current_identity()
            .await
            .ok_or(ClientError::AuthRequired)
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
