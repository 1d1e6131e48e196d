//! Request bodies understood by the processing service.

use serde::{Deserialize, Serialize};

use vigil_shared::types::{CameraId, UserId};

pub const REGISTER_CAMERA_PATH: &str = "/registerCamera";
pub const REGISTER_VIDEO_PATH: &str = "/registerVideo";

/// Body of `POST /registerCamera`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterCameraRequest {
    pub user_id: UserId,
    pub camera_id: CameraId,
    pub camera_url: String,
}

/// Body of `POST /registerVideo`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterVideoRequest {
    pub video_url: String,
}
