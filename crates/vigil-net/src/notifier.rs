//! HTTP client for the processing service's registration endpoints.
//!
//! Both calls are fire-and-forget from the caller's perspective: a failure is
//! returned as [`NotifyError`] so the caller can log it, but nothing is
//! retried and nothing is rolled back.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use vigil_shared::config::ClientConfig;

use crate::error::NotifyError;
use crate::messages::{
    RegisterCameraRequest, RegisterVideoRequest, REGISTER_CAMERA_PATH, REGISTER_VIDEO_PATH,
};

#[async_trait]
pub trait RegistrationNotifier: Send + Sync {
    /// Tell the processing service a camera was registered.
    async fn register_camera(&self, request: &RegisterCameraRequest) -> Result<(), NotifyError>;

    /// Tell the processing service a video is waiting for analysis.
    async fn register_video(&self, request: &RegisterVideoRequest) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
    base_url: String,
}

impl HttpNotifier {
    pub fn new(config: &ClientConfig) -> Result<Self, NotifyError> {
        let base_url = config.processing_service_url.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(NotifyError::InvalidUrl(base_url));
        }

        let client = reqwest::Client::builder()
            .timeout(config.notify_timeout)
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        endpoint: &'static str,
        body: &B,
    ) -> Result<(), NotifyError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(url = %url, "Posting registration");

        let resp = self.client.post(&url).json(body).send().await?;

        if !resp.status().is_success() {
            return Err(NotifyError::Status {
                endpoint,
                status: resp.status().as_u16(),
            });
        }

        info!(endpoint, "Registration accepted");
        Ok(())
    }
}

#[async_trait]
impl RegistrationNotifier for HttpNotifier {
    async fn register_camera(&self, request: &RegisterCameraRequest) -> Result<(), NotifyError> {
        self.post(REGISTER_CAMERA_PATH, request).await
    }

    async fn register_video(&self, request: &RegisterVideoRequest) -> Result<(), NotifyError> {
        self.post(REGISTER_VIDEO_PATH, request).await
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::Value;

    use vigil_shared::types::{CameraId, UserId};

    use super::*;

    type Seen = Arc<Mutex<Vec<(String, Value)>>>;

    async fn record(path: &'static str, seen: Seen, body: Value) -> StatusCode {
        seen.lock().unwrap().push((path.to_string(), body));
        StatusCode::OK
    }

    async fn spawn_stub(fail: bool) -> (SocketAddr, Seen) {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let app = if fail {
            Router::new()
                .route("/registerVideo", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
                .with_state(seen.clone())
        } else {
            Router::new()
                .route(
                    "/registerCamera",
                    post(|State(seen): State<Seen>, Json(body): Json<Value>| {
                        record(REGISTER_CAMERA_PATH, seen, body)
                    }),
                )
                .route(
                    "/registerVideo",
                    post(|State(seen): State<Seen>, Json(body): Json<Value>| {
                        record(REGISTER_VIDEO_PATH, seen, body)
                    }),
                )
                .with_state(seen.clone())
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (addr, seen)
    }

    fn notifier_for(addr: SocketAddr) -> HttpNotifier {
        let config = ClientConfig {
            processing_service_url: format!("http://{addr}/"),
            notify_timeout: Duration::from_secs(2),
            ..ClientConfig::default()
        };
        HttpNotifier::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_posts_expected_bodies() {
        let (addr, seen) = spawn_stub(false).await;
        let notifier = notifier_for(addr);
        let camera_id = CameraId::new();

        notifier
            .register_camera(&RegisterCameraRequest {
                user_id: UserId::new("u1"),
                camera_id,
                camera_url: "10.0.0.4:8080".into(),
            })
            .await
            .unwrap();
        notifier
            .register_video(&RegisterVideoRequest {
                video_url: "https://store/videos/a.mp4".into(),
            })
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, "/registerCamera");
        assert_eq!(seen[0].1["camera_id"], camera_id.to_string());
        assert_eq!(seen[1].0, "/registerVideo");
        assert_eq!(seen[1].1["video_url"], "https://store/videos/a.mp4");
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let (addr, _seen) = spawn_stub(true).await;
        let err = notifier_for(addr)
            .register_video(&RegisterVideoRequest {
                video_url: "https://store/videos/a.mp4".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_a_transport_error() {
        // bind then drop to get a port nobody listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = notifier_for(addr)
            .register_video(&RegisterVideoRequest { video_url: "x".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Transport(_)));
    }

    #[test]
    fn test_rejects_non_http_base() {
        let config = ClientConfig {
            processing_service_url: "ftp://worker".into(),
            ..ClientConfig::default()
        };
        assert!(matches!(HttpNotifier::new(&config), Err(NotifyError::InvalidUrl(_))));
    }
}
