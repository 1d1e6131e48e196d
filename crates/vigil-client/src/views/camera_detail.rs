use tracing::debug;

use vigil_shared::types::CameraId;
use vigil_store::{Camera, Filter, Notification, Order, Scope, Table};

use crate::context::AppContext;
use crate::error::ClientError;
use crate::feed::SubscriptionHandle;
use crate::view_state::{SharedViewState, ViewState};
use crate::views::{lock, release, snapshot, track};

/// One camera and its live notification stream.
pub struct CameraDetailView {
    ctx: AppContext,
    camera_id: CameraId,
    camera: Option<Camera>,
    notifications: SharedViewState<Notification>,
    subscription: Option<SubscriptionHandle>,
    error: Option<String>,
}

impl CameraDetailView {
    pub fn new(ctx: AppContext, camera_id: CameraId) -> Self {
        Self {
            ctx,
            camera_id,
            camera: None,
            notifications: ViewState::shared(),
            subscription: None,
            error: None,
        }
    }

    /// Load the camera and its notifications, then follow new ones.
    pub async fn activate(&mut self) -> Result<(), ClientError> {
        release(&mut self.subscription).await;
        let result = self.load_and_subscribe().await;
        track(&mut self.error, result)
    }

    pub async fn deactivate(&mut self) {
        release(&mut self.subscription).await;
    }

    pub fn camera_id(&self) -> CameraId {
        self.camera_id
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    /// Newest first.
    pub fn notifications(&self) -> Vec<Notification> {
        snapshot(&self.notifications)
    }

    pub fn is_live(&self) -> bool {
        self.subscription.as_ref().is_some_and(|s| s.is_active())
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    async fn load_and_subscribe(&mut self) -> Result<(), ClientError> {
        let store = self.ctx.store();
        let filter = Filter::Camera(self.camera_id);

        let (cameras, notifications) = tokio::try_join!(
            store.query(Table::Cameras, Some(filter.clone()), Order::NewestFirst),
            store.query(Table::Notifications, Some(filter), Order::NewestFirst),
        )?;

        let camera = cameras
            .into_iter()
            .find_map(|row| Camera::try_from(row).ok())
            .ok_or_else(|| ClientError::NotFound(format!("Camera {}", self.camera_id)))?;
        self.camera = Some(camera);

        let notifications: Vec<Notification> = notifications
            .into_iter()
            .filter_map(|row| Notification::try_from(row).ok())
            .collect();
        debug!(camera = %self.camera_id, count = notifications.len(), "Loaded notifications");
        lock(&self.notifications)?.replace_all(notifications);

        let handle = self
            .ctx
            .feed()
            .sync_into(
                Scope::camera(Table::Notifications, self.camera_id),
                self.notifications.clone(),
            )
            .await?;
        self.subscription = Some(handle);
        Ok(())
    }
}
