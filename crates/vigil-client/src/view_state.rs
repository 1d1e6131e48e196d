//! Local View State Store.
//!
//! A [`ViewState`] is the ordered list a view renders. It changes in exactly
//! two ways: a bulk fetch replaces it wholesale, and feed events are merged
//! one at a time with [`ViewState::merge`]:
//!
//! * insert: prepended, unless an entry with the same key is already present
//! * update: replaces the entry with the same key in place, otherwise ignored
//!
//! Both rules are idempotent, so a redelivered event never duplicates or
//! reorders anything.

use std::fmt::Debug;
use std::sync::{Arc, Mutex};

use vigil_shared::types::{CameraId, JobId, NotificationId};
use vigil_store::{Camera, ChangeEvent, ChangeOp, Notification, Record, Table, VideoAnalysisJob};

/// An entry with a stable primary key.
pub trait Keyed {
    type Key: PartialEq + Debug + Copy;

    fn key(&self) -> Self::Key;
}

impl Keyed for Camera {
    type Key = CameraId;

    fn key(&self) -> CameraId {
        self.id
    }
}

impl Keyed for Notification {
    type Key = NotificationId;

    fn key(&self) -> NotificationId {
        self.id
    }
}

impl Keyed for VideoAnalysisJob {
    type Key = JobId;

    fn key(&self) -> JobId {
        self.id
    }
}

/// What a merge did to the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Updated,
    Ignored,
}

#[derive(Debug, Clone)]
pub struct ViewState<T> {
    items: Vec<T>,
}

/// A view state shared between a view and its feed task.
pub type SharedViewState<T> = Arc<Mutex<ViewState<T>>>;

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Keyed> ViewState<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedViewState<T> {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Replace the whole list with a fetched snapshot, order kept as given.
    pub fn replace_all(&mut self, items: Vec<T>) {
        self.items = items;
    }

    pub fn merge(&mut self, op: ChangeOp, item: T) -> MergeOutcome {
        let existing = self.position(&item.key());
        match (op, existing) {
            (ChangeOp::Insert, None) => {
                self.items.insert(0, item);
                MergeOutcome::Inserted
            }
            (ChangeOp::Insert, Some(_)) => MergeOutcome::Ignored,
            (ChangeOp::Update, Some(idx)) => {
                self.items[idx] = item;
                MergeOutcome::Updated
            }
            (ChangeOp::Update, None) => MergeOutcome::Ignored,
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn get(&self, key: &T::Key) -> Option<&T> {
        self.items.iter().find(|item| item.key() == *key)
    }

    pub fn position(&self, key: &T::Key) -> Option<usize> {
        self.items.iter().position(|item| item.key() == *key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> ViewState<T>
where
    T: Keyed + TryFrom<Record, Error = Table>,
{
    /// Merge a feed event. Events for another table are ignored.
    pub fn apply(&mut self, event: ChangeEvent) -> MergeOutcome {
        let op = event.op;
        match T::try_from(event.record) {
            Ok(item) => self.merge(op, item),
            Err(_) => MergeOutcome::Ignored,
        }
    }
}
