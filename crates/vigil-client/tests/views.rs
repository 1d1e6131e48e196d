use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use vigil_client::views::{CameraDetailView, CameraListView, NotificationListView, VideoAnalysisView};
use vigil_client::{init_tracing, AppContext, ClientError, StatusIcon, UploadCandidate, UploadState};
use vigil_net::{NotifyError, RegisterCameraRequest, RegisterVideoRequest, RegistrationNotifier};
use vigil_shared::config::ClientConfig;
use vigil_shared::types::{CameraId, UserId};
use vigil_store::{AnalysisResults, JobStatus, JobTransition, LocalStore, StoreError};

#[derive(Default)]
struct StubNotifier {
    fail: bool,
    cameras: Mutex<Vec<RegisterCameraRequest>>,
    videos: Mutex<Vec<String>>,
}

#[async_trait]
impl RegistrationNotifier for StubNotifier {
    async fn register_camera(&self, request: &RegisterCameraRequest) -> Result<(), NotifyError> {
        self.cameras.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(NotifyError::Status { endpoint: "/registerCamera", status: 502 });
        }
        Ok(())
    }

    async fn register_video(&self, request: &RegisterVideoRequest) -> Result<(), NotifyError> {
        self.videos.lock().unwrap().push(request.video_url.clone());
        if self.fail {
            return Err(NotifyError::Status { endpoint: "/registerVideo", status: 502 });
        }
        Ok(())
    }
}

struct Env {
    store: Arc<LocalStore>,
    notifier: Arc<StubNotifier>,
    ctx: AppContext,
    _dir: TempDir,
}

async fn env(fail_notify: bool) -> Env {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let config = ClientConfig {
        storage_bucket: "videos".into(),
        public_base_url: "https://store".into(),
        ..ClientConfig::default()
    };
    let store = Arc::new(LocalStore::ephemeral(dir.path(), &config).await.unwrap());
    store.sign_in(UserId::new("u1"));
    let notifier = Arc::new(StubNotifier { fail: fail_notify, ..Default::default() });
    let ctx = AppContext::new(store.clone(), notifier.clone(), config);
    Env { store, notifier, ctx, _dir: dir }
}

async fn eventually(what: &str, mut check: impl FnMut() -> bool) {
    for _ in 0..400 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}

#[tokio::test]
async fn test_upload_then_follow_job_to_completion() {
    let env = env(false).await;
    let mut view = VideoAnalysisView::new(env.ctx.clone());
    view.activate().await.unwrap();
    assert!(view.is_live());

    let file = UploadCandidate::new("clip.mp4", "video/mp4", vec![0x42u8; 50 * 1024 * 1024]);
    let id = view.upload(Some(file)).await.unwrap();
    assert_eq!(view.upload_state(), UploadState::default());
    assert_eq!(view.error(), None);

    eventually("pending job", || view.jobs().iter().any(|j| j.id == id)).await;
    let job = view.jobs()[0].clone();
    assert_eq!(job.status, JobStatus::Pending);
    let name = job.video_url.strip_prefix("https://store/videos/u1-").unwrap();
    let (millis, rest) = name.split_once('-').unwrap();
    assert!(millis.parse::<i64>().is_ok());
    assert_eq!(rest, "clip.mp4");
    assert_eq!(*env.notifier.videos.lock().unwrap(), vec![job.video_url.clone()]);

    env.store.transition_job(id, JobTransition::Processing).unwrap();
    eventually("processing", || view.jobs()[0].status == JobStatus::Processing).await;
    assert_eq!(view.jobs().len(), 1);

    env.store
        .transition_job(id, JobTransition::Completed(AnalysisResults::new(false, 0.92)))
        .unwrap();
    eventually("completed", || view.jobs()[0].status == JobStatus::Completed).await;

    let rows = view.rows();
    assert_eq!(rows.len(), 1);
    let (_, projected) = &rows[0];
    assert_eq!(projected.icon, StatusIcon::Success);
    let detection = projected.detection.as_ref().unwrap();
    assert_eq!(detection.detected, "No");
    assert_eq!(detection.confidence.as_deref(), Some("92.0%"));

    view.deactivate().await;
    assert_eq!(env.store.feed().subscriber_count(), 0);
}

#[tokio::test]
async fn test_reactivation_recovers_changes_missed_during_a_gap() {
    let env = env(false).await;
    let mut view = VideoAnalysisView::new(env.ctx.clone());
    view.activate().await.unwrap();

    let id = view
        .upload(Some(UploadCandidate::new("a.mp4", "video/mp4", vec![1u8; 64])))
        .await
        .unwrap();
    eventually("job", || view.jobs().len() == 1).await;

    env.store.disconnect_feed();
    eventually("feed closed", || !view.is_live()).await;

    // missed while the transport was down
    env.store.transition_job(id, JobTransition::Processing).unwrap();
    assert_eq!(view.jobs()[0].status, JobStatus::Pending);

    let err = view.activate().await.unwrap_err();
    assert!(matches!(err, ClientError::Store(StoreError::FeedUnavailable)));
    assert!(view.error().is_some());

    env.store.reconnect_feed();
    view.activate().await.unwrap();
    assert!(view.is_live());
    assert_eq!(view.error(), None);
    assert_eq!(view.jobs()[0].status, JobStatus::Processing);

    env.store.transition_job(id, JobTransition::Error).unwrap();
    eventually("error", || view.jobs()[0].status == JobStatus::Error).await;
    assert_eq!(view.rows()[0].1.icon, StatusIcon::Warning);
}

#[tokio::test]
async fn test_no_merge_after_deactivate() {
    let env = env(false).await;
    let mut view = VideoAnalysisView::new(env.ctx.clone());
    view.activate().await.unwrap();
    view.deactivate().await;
    // deactivating twice is fine
    view.deactivate().await;

    view.upload(Some(UploadCandidate::new("a.mp4", "video/mp4", vec![1u8; 8])))
        .await
        .unwrap();
    // not live, so the upload re-fetched
    assert_eq!(view.jobs().len(), 1);
    let id = view.jobs()[0].id;

    env.store.transition_job(id, JobTransition::Processing).unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(view.jobs()[0].status, JobStatus::Pending);
}

#[tokio::test]
async fn test_signed_out_user_sees_an_error() {
    let env = env(false).await;
    env.store.sign_out();

    let mut view = VideoAnalysisView::new(env.ctx.clone());
    assert!(matches!(view.activate().await, Err(ClientError::AuthRequired)));
    assert!(view.error().unwrap().contains("signed in"));

    let err = view
        .upload(Some(UploadCandidate::new("a.mp4", "video/mp4", vec![1u8; 8])))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("signed in"));
    assert!(view.jobs().is_empty());
}

#[tokio::test]
async fn test_camera_survives_registration_failure() {
    let env = env(true).await;
    let mut cameras = CameraListView::new(env.ctx.clone());

    let camera = cameras.add_camera("  Porch ", "10.0.0.4:8080").await.unwrap();
    assert_eq!(camera.camera_name, "Porch");
    assert_eq!(cameras.cameras(), &[camera.clone()]);
    assert_eq!(cameras.error(), None);

    let sent = env.notifier.cameras.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].camera_id, camera.id);
    assert_eq!(sent[0].camera_url, "10.0.0.4:8080");

    assert!(cameras.add_camera("", "10.0.0.5").await.is_err());
    assert_eq!(cameras.error(), Some("Camera name must not be empty"));
    assert_eq!(cameras.cameras().len(), 1);

    assert!(cameras.delete_camera(camera.id).await.unwrap());
    assert!(cameras.cameras().is_empty());
    assert!(!cameras.delete_camera(camera.id).await.unwrap());
}

#[tokio::test]
async fn test_camera_detail_follows_only_its_camera() {
    let env = env(false).await;
    let mut cameras = CameraListView::new(env.ctx.clone());
    let porch = cameras.add_camera("Porch", "10.0.0.4").await.unwrap();
    let garage = cameras.add_camera("Garage", "10.0.0.5").await.unwrap();
    env.store.record_camera_event(porch.id, "Motion detected").unwrap();

    let mut detail = CameraDetailView::new(env.ctx.clone(), porch.id);
    detail.activate().await.unwrap();
    assert_eq!(detail.camera().map(|c| c.camera_name.as_str()), Some("Porch"));
    assert_eq!(detail.notifications().len(), 1);

    env.store.record_camera_event(garage.id, "Door opened").unwrap();
    let latest = env.store.record_camera_event(porch.id, "Violence detected").unwrap();
    eventually("porch event", || detail.notifications().len() == 2).await;
    assert_eq!(detail.notifications()[0].id, latest.id);

    detail.deactivate().await;
    assert!(!detail.is_live());

    let mut missing = CameraDetailView::new(env.ctx.clone(), CameraId::new());
    assert!(matches!(missing.activate().await, Err(ClientError::NotFound(_))));
}

#[tokio::test]
async fn test_camera_detail_hides_other_users_cameras() {
    let env = env(false).await;
    env.store.sign_in(UserId::new("u2"));
    let mut theirs = CameraListView::new(env.ctx.clone());
    let gate = theirs.add_camera("Gate", "10.0.0.9").await.unwrap();
    env.store.record_camera_event(gate.id, "Motion detected").unwrap();

    env.store.sign_in(UserId::new("u1"));
    let mut detail = CameraDetailView::new(env.ctx.clone(), gate.id);
    assert!(matches!(detail.activate().await, Err(ClientError::NotFound(_))));
    assert!(detail.camera().is_none());
    assert!(detail.notifications().is_empty());
    assert!(!detail.is_live());
}

#[tokio::test]
async fn test_notification_list_names_cameras() {
    let env = env(false).await;
    let mut cameras = CameraListView::new(env.ctx.clone());
    let porch = cameras.add_camera("Porch", "10.0.0.4").await.unwrap();

    let mut list = NotificationListView::new(env.ctx.clone());
    list.activate().await.unwrap();
    assert!(list.rows().is_empty());

    env.store.record_camera_event(porch.id, "Motion detected").unwrap();
    eventually("notification", || list.rows().len() == 1).await;

    let row = &list.rows()[0];
    assert_eq!(row.camera_name.as_deref(), Some("Porch"));
    assert_eq!(row.notification.notification_text, "Motion detected");

    list.deactivate().await;
}
