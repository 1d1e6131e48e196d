//! Screen-level controllers. Each view owns its state, talks to the backend
//! only through its [`crate::AppContext`] and keeps the last failure as a
//! display string.

pub mod analysis;
pub mod camera_detail;
pub mod cameras;
pub mod notifications;

pub use analysis::VideoAnalysisView;
pub use camera_detail::CameraDetailView;
pub use cameras::CameraListView;
pub use notifications::{NotificationListView, NotificationRow};

use std::sync::MutexGuard;

use tracing::warn;

use vigil_store::StoreError;

use crate::error::ClientError;
use crate::feed::SubscriptionHandle;
use crate::view_state::{Keyed, SharedViewState, ViewState};

/// Remember the outcome of a view operation: failures become the displayed
/// error, success clears it.
pub(crate) fn track<T, E: std::fmt::Display>(
    error: &mut Option<String>,
    result: Result<T, E>,
) -> Result<T, E> {
    match &result {
        Ok(_) => *error = None,
        Err(e) => {
            warn!("{e}");
            *error = Some(e.to_string());
        }
    }
    result
}

pub(crate) async fn release(subscription: &mut Option<SubscriptionHandle>) {
    if let Some(handle) = subscription.take() {
        handle.unsubscribe().await;
    }
}

pub(crate) fn lock<T>(state: &SharedViewState<T>) -> Result<MutexGuard<'_, ViewState<T>>, ClientError> {
    state
        .lock()
        .map_err(|_| ClientError::Store(StoreError::LockPoisoned))
}

/// Copy of the current items, empty if the state lock is poisoned.
pub(crate) fn snapshot<T: Keyed + Clone>(state: &SharedViewState<T>) -> Vec<T> {
    match state.lock() {
        Ok(guard) => guard.items().to_vec(),
        Err(e) => {
            warn!("View state lock poisoned: {e}");
            Vec::new()
        }
    }
}
