use tracing::{info, warn};

use vigil_net::RegisterCameraRequest;
use vigil_shared::types::CameraId;
use vigil_shared::ValidationError;
use vigil_store::{Camera, Filter, NewCamera, NewRecord, Order, Table};

use crate::context::AppContext;
use crate::error::ClientError;
use crate::view_state::ViewState;
use crate::views::track;

/// The signed-in user's cameras, newest first. Refreshed after every change
/// instead of following the feed.
pub struct CameraListView {
    ctx: AppContext,
    cameras: ViewState<Camera>,
    error: Option<String>,
}

impl CameraListView {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            cameras: ViewState::new(),
            error: None,
        }
    }

    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        let result = self.fetch().await;
        track(&mut self.error, result)
    }

    /// Register a camera, then tell the processing service about it. The
    /// camera stays registered if that call fails.
    pub async fn add_camera(&mut self, name: &str, address: &str) -> Result<Camera, ClientError> {
        let result = self.create(name.trim(), address.trim()).await;
        let camera = track(&mut self.error, result)?;
        self.refresh().await?;
        Ok(camera)
    }

    /// `Ok(false)` when the camera was already gone.
    pub async fn delete_camera(&mut self, id: CameraId) -> Result<bool, ClientError> {
        let result = self
            .ctx
            .store()
            .delete(Table::Cameras, id.0)
            .await
            .map_err(ClientError::from);
        let removed = track(&mut self.error, result)?;
        info!(camera = %id, removed, "Camera deleted");
        self.refresh().await?;
        Ok(removed)
    }

    pub fn cameras(&self) -> &[Camera] {
        self.cameras.items()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    async fn fetch(&mut self) -> Result<(), ClientError> {
        let user = self.ctx.identity().await?;
        let rows = self
            .ctx
            .store()
            .query(Table::Cameras, Some(Filter::Owner(user)), Order::NewestFirst)
            .await?;
        let cameras = rows
            .into_iter()
            .filter_map(|row| Camera::try_from(row).ok())
            .collect();
        self.cameras.replace_all(cameras);
        Ok(())
    }

    async fn create(&self, name: &str, address: &str) -> Result<Camera, ClientError> {
        if name.is_empty() {
            return Err(ValidationError::BlankField { field: "Camera name" }.into());
        }
        if address.is_empty() {
            return Err(ValidationError::BlankField { field: "IP address" }.into());
        }
        let user = self.ctx.identity().await?;

        let record = self
            .ctx
            .store()
            .insert(NewRecord::Camera(NewCamera {
                user_id: user.clone(),
                camera_name: name.to_string(),
                ip_address: address.to_string(),
            }))
            .await?;
        let camera = Camera::try_from(record)
            .map_err(|table| ClientError::NotFound(format!("Camera row in {table}")))?;
        info!(camera = %camera.id, name = %camera.camera_name, "Camera added");

        let request = RegisterCameraRequest {
            user_id: user,
            camera_id: camera.id,
            camera_url: camera.ip_address.clone(),
        };
        let call = self.ctx.notifier().register_camera(&request);
        match tokio::time::timeout(self.ctx.config().notify_timeout, call).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(camera = %camera.id, error = %e, "Camera registration failed"),
            Err(_) => warn!(camera = %camera.id, "Camera registration timed out"),
        }

        Ok(camera)
    }
}
