//! Remote Store client contract.
//!
//! Everything above this crate talks to the backend through [`RemoteStore`]:
//! table queries and writes, the change feed, blob storage and the current
//! identity. [`crate::LocalStore`] is the in-tree implementation.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use vigil_shared::types::UserId;

use crate::error::Result;
use crate::models::{NewRecord, Record};
use crate::query::{Filter, Order, Scope, Table};

/// Kind of row change pushed by the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeOp {
    Insert,
    Update,
}

/// One server-pushed change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub op: ChangeOp,
    pub record: Record,
}

impl ChangeEvent {
    pub fn insert(record: Record) -> Self {
        Self {
            op: ChangeOp::Insert,
            record,
        }
    }

    pub fn update(record: Record) -> Self {
        Self {
            op: ChangeOp::Update,
            record,
        }
    }

    pub fn table(&self) -> Table {
        self.record.table()
    }
}

/// Server-side identifier of an open subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Receiving end of a subscription. The channel closes when the transport
/// drops or the subscription is released.
#[derive(Debug)]
pub struct FeedStream {
    pub id: SubscriptionId,
    pub scope: Scope,
    pub events: mpsc::UnboundedReceiver<ChangeEvent>,
}

/// Object written to blob storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    pub bucket: String,
    pub path: String,
    pub size: u64,
    /// BLAKE3 content hash (hex string).
    pub blake3_hash: String,
}

/// Progress callback: `(bytes_transferred, total_bytes)`. Callers may pass
/// closures that borrow locals.
pub type ProgressFn<'a> = dyn Fn(u64, u64) + Send + Sync + 'a;

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Rows of `table` matching `filter`, ordered by creation time.
    async fn query(&self, table: Table, filter: Option<Filter>, order: Order) -> Result<Vec<Record>>;

    /// Insert a row; the store assigns id, timestamps and defaults.
    async fn insert(&self, record: NewRecord) -> Result<Record>;

    /// Delete by primary key. `Ok(false)` when nothing matched.
    async fn delete(&self, table: Table, id: Uuid) -> Result<bool>;

    /// Open a change-feed subscription for `scope`.
    async fn subscribe(&self, scope: Scope) -> Result<FeedStream>;

    /// Release a subscription. Releasing an unknown or already closed
    /// subscription is not an error.
    async fn unsubscribe(&self, id: SubscriptionId) -> Result<()>;

    /// Write `bytes` to `bucket/path`, reporting progress as it goes.
    /// Never overwrites an existing object.
    async fn upload_blob(
        &self,
        bucket: &str,
        path: &str,
        bytes: Bytes,
        on_progress: &ProgressFn<'_>,
    ) -> Result<StoredObject>;

    /// Public URL of `bucket/path`.
    async fn public_url(&self, bucket: &str, path: &str) -> Result<String>;

    /// Identity of the signed-in user, if any.
    async fn current_identity(&self) -> Option<UserId>;
}
