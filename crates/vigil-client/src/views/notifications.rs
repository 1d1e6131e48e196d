use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use vigil_shared::types::CameraId;
use vigil_store::{Camera, Filter, Notification, Order, Scope, Table};

use crate::context::AppContext;
use crate::error::ClientError;
use crate::feed::SubscriptionHandle;
use crate::projector::format_submitted;
use crate::view_state::{SharedViewState, ViewState};
use crate::views::{lock, release, snapshot, track};

/// A notification joined with the name of the camera that raised it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationRow {
    pub notification: Notification,
    /// `None` when the camera was deleted or is unknown to this view.
    pub camera_name: Option<String>,
    pub received_at: String,
}

/// Every notification of the signed-in user, newest first.
pub struct NotificationListView {
    ctx: AppContext,
    camera_names: HashMap<CameraId, String>,
    notifications: SharedViewState<Notification>,
    subscription: Option<SubscriptionHandle>,
    error: Option<String>,
}

impl NotificationListView {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            camera_names: HashMap::new(),
            notifications: ViewState::shared(),
            subscription: None,
            error: None,
        }
    }

    pub async fn activate(&mut self) -> Result<(), ClientError> {
        release(&mut self.subscription).await;
        let result = self.load_and_subscribe().await;
        track(&mut self.error, result)
    }

    pub async fn deactivate(&mut self) {
        release(&mut self.subscription).await;
    }

    pub fn rows(&self) -> Vec<NotificationRow> {
        snapshot(&self.notifications)
            .into_iter()
            .map(|notification| NotificationRow {
                camera_name: notification
                    .camera_id
                    .and_then(|id| self.camera_names.get(&id).cloned()),
                received_at: format_submitted(notification.timestamp),
                notification,
            })
            .collect()
    }

    pub fn is_live(&self) -> bool {
        self.subscription.as_ref().is_some_and(|s| s.is_active())
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    async fn load_and_subscribe(&mut self) -> Result<(), ClientError> {
        let user = self.ctx.identity().await?;
        let store = self.ctx.store();
        let filter = Filter::Owner(user.clone());

        let (cameras, notifications) = tokio::try_join!(
            store.query(Table::Cameras, Some(filter.clone()), Order::NewestFirst),
            store.query(Table::Notifications, Some(filter), Order::NewestFirst),
        )?;

        self.camera_names = cameras
            .into_iter()
            .filter_map(|row| Camera::try_from(row).ok())
            .map(|camera| (camera.id, camera.camera_name))
            .collect();

        let notifications: Vec<Notification> = notifications
            .into_iter()
            .filter_map(|row| Notification::try_from(row).ok())
            .collect();
        debug!(user = %user, count = notifications.len(), "Loaded notifications");
        lock(&self.notifications)?.replace_all(notifications);

        let handle = self
            .ctx
            .feed()
            .sync_into(
                Scope::owner(Table::Notifications, user),
                self.notifications.clone(),
            )
            .await?;
        self.subscription = Some(handle);
        Ok(())
    }
}
