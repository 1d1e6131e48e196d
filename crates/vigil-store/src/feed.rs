//! Change-feed publisher.
//!
//! [`FeedHub`] keeps one unbounded channel per open subscription and fans each
//! committed change out to every subscription whose scope matches. Publishing
//! happens while the writer still holds the database lock, so per-scope
//! delivery order equals commit order.

use std::collections::BTreeMap;
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::query::Scope;
use crate::remote::{ChangeEvent, FeedStream, SubscriptionId};

struct Subscriber {
    scope: Scope,
    tx: mpsc::UnboundedSender<ChangeEvent>,
}

struct HubInner {
    connected: bool,
    next_id: u64,
    subscribers: BTreeMap<SubscriptionId, Subscriber>,
}

pub struct FeedHub {
    inner: Mutex<HubInner>,
}

impl FeedHub {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HubInner {
                connected: true,
                next_id: 1,
                subscribers: BTreeMap::new(),
            }),
        }
    }

    pub fn subscribe(&self, scope: Scope) -> Result<FeedStream> {
        scope.validate()?;

        let mut inner = self.inner.lock().map_err(|_| StoreError::LockPoisoned)?;
        if !inner.connected {
            return Err(StoreError::FeedUnavailable);
        }

        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;

        let (tx, rx) = mpsc::unbounded_channel();
        inner.subscribers.insert(
            id,
            Subscriber {
                scope: scope.clone(),
                tx,
            },
        );

        debug!(subscription = %id, scope = %scope, "Feed subscription opened");

        Ok(FeedStream {
            id,
            scope,
            events: rx,
        })
    }

    /// Returns `false` when the subscription was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<bool> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::LockPoisoned)?;
        let removed = inner.subscribers.remove(&id).is_some();
        debug!(subscription = %id, removed, "Feed subscription released");
        Ok(removed)
    }

    /// Deliver `event` to every matching subscription; returns how many
    /// received it. Subscriptions whose receiver is gone are pruned.
    pub fn publish(&self, event: &ChangeEvent) -> usize {
        let Ok(mut inner) = self.inner.lock() else {
            warn!("Feed hub lock poisoned, dropping event");
            return 0;
        };

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, sub) in &inner.subscribers {
            if !sub.scope.matches(&event.record) {
                continue;
            }
            if sub.tx.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                closed.push(*id);
            }
        }
        for id in closed {
            inner.subscribers.remove(&id);
        }

        debug!(
            op = ?event.op,
            table = %event.table(),
            key = %event.record.key(),
            delivered,
            "Published change"
        );
        delivered
    }

    /// Drop every subscription and refuse new ones until [`FeedHub::reconnect`].
    pub fn disconnect(&self) -> usize {
        let Ok(mut inner) = self.inner.lock() else {
            return 0;
        };
        inner.connected = false;
        let dropped = inner.subscribers.len();
        inner.subscribers.clear();
        info!(dropped, "Change feed disconnected");
        dropped
    }

    pub fn reconnect(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.connected = true;
            info!("Change feed reconnected");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock().map(|inner| inner.connected).unwrap_or(false)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.subscribers.len())
            .unwrap_or(0)
    }
}

impl Default for FeedHub {
    fn default() -> Self {
        Self::new()
    }
}
