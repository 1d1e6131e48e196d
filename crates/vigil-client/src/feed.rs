//! Change-feed subscriber.
//!
//! [`ChangeFeed::subscribe`] opens a subscription on the store and spawns one
//! task that drains it, so events for a subscription reach the callback one at
//! a time in delivery order. The returned [`SubscriptionHandle`] must be
//! released with [`SubscriptionHandle::unsubscribe`] when the view goes away;
//! dropping it only stops local delivery.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use vigil_store::{
    ChangeEvent, FeedStream, Record, RemoteStore, Scope, StoreError, SubscriptionId, Table,
};

use crate::view_state::{Keyed, SharedViewState};

#[derive(Clone)]
pub struct ChangeFeed {
    store: Arc<dyn RemoteStore>,
}

impl ChangeFeed {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    /// Subscribe to `scope` and call `on_event` for each change, in order.
    ///
    /// Events that do not match the scope are dropped here even if the
    /// transport delivered them.
    pub async fn subscribe<F>(
        &self,
        scope: Scope,
        mut on_event: F,
    ) -> Result<SubscriptionHandle, StoreError>
    where
        F: FnMut(ChangeEvent) + Send + 'static,
    {
        let FeedStream {
            id,
            scope,
            mut events,
        } = self.store.subscribe(scope).await?;

        debug!(subscription = %id, scope = %scope, "Subscribed to change feed");

        let task_scope = scope.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if !task_scope.matches(&event.record) {
                    debug!(subscription = %id, key = %event.record.key(), "Dropping out-of-scope event");
                    continue;
                }
                on_event(event);
            }
            debug!(subscription = %id, "Change feed closed");
        });

        Ok(SubscriptionHandle {
            id,
            scope,
            store: self.store.clone(),
            task: Some(task),
        })
    }

    /// Subscribe to `scope` and merge every event into `state`.
    pub async fn sync_into<T>(
        &self,
        scope: Scope,
        state: SharedViewState<T>,
    ) -> Result<SubscriptionHandle, StoreError>
    where
        T: Keyed + TryFrom<Record, Error = Table> + Send + 'static,
    {
        self.subscribe(scope, move |event| {
            let op = event.op;
            let key = event.record.key();
            match state.lock() {
                Ok(mut guard) => {
                    let outcome = guard.apply(event);
                    debug!(?op, %key, ?outcome, "Merged change");
                }
                Err(e) => warn!(%key, "View state lock poisoned: {e}"),
            }
        })
        .await
    }
}

/// Live subscription owned by a view.
pub struct SubscriptionHandle {
    id: SubscriptionId,
    scope: Scope,
    store: Arc<dyn RemoteStore>,
    task: Option<JoinHandle<()>>,
}

impl SubscriptionHandle {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// `false` once the transport closed the subscription.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop delivery and release the subscription on the store. No callback
    /// runs after this returns. Failures to release are logged, not returned:
    /// the subscription may already be gone with its transport.
    pub async fn unsubscribe(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
        if let Err(e) = self.store.unsubscribe(self.id).await {
            warn!(subscription = %self.id, error = %e, "Failed to release subscription");
        } else {
            debug!(subscription = %self.id, "Unsubscribed from change feed");
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .field("scope", &self.scope)
            .field("active", &self.is_active())
            .finish()
    }
}
