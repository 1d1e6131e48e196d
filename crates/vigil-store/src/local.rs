//! SQLite + filesystem implementation of [`RemoteStore`].
//!
//! Besides the client contract, [`LocalStore`] exposes the hooks that the
//! hosted backend performs on its own: the camera-event trigger that creates
//! notifications, the worker that moves jobs through their lifecycle, and
//! feed transport loss.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use vigil_shared::config::ClientConfig;
use vigil_shared::types::{CameraId, JobId, NotificationId, UserId};

use crate::blob_store::BlobStore;
use crate::database::{default_data_dir, Database};
use crate::error::{Result, StoreError};
use crate::feed::FeedHub;
use crate::models::{
    Camera, JobStatus, JobTransition, NewRecord, Notification, Record, VideoAnalysisJob,
};
use crate::query::{Filter, Order, Scope, Table};
use crate::remote::{ChangeEvent, FeedStream, ProgressFn, RemoteStore, StoredObject, SubscriptionId};

pub struct LocalStore {
    db: Mutex<Database>,
    blobs: BlobStore,
    feed: FeedHub,
    identity: RwLock<Option<UserId>>,
    public_base_url: Url,
    chunk_size: usize,
}

impl LocalStore {
    /// Open the store under the platform data directory.
    pub async fn open_default(config: &ClientConfig) -> Result<Self> {
        let dir = default_data_dir()?;
        Self::open(&dir, config).await
    }

    /// Open (or create) a store rooted at `data_dir`: `vigil.db` plus a
    /// `blobs/` directory.
    pub async fn open(data_dir: &Path, config: &ClientConfig) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;
        let db = Database::open_at(&data_dir.join("vigil.db"))?;
        let blobs = BlobStore::new(data_dir.join("blobs")).await?;
        Self::assemble(db, blobs, config)
    }

    /// In-memory database with blobs under `blob_dir`.
    pub async fn ephemeral(blob_dir: &Path, config: &ClientConfig) -> Result<Self> {
        let db = Database::open_in_memory()?;
        let blobs = BlobStore::new(blob_dir.to_path_buf()).await?;
        Self::assemble(db, blobs, config)
    }

    fn assemble(db: Database, blobs: BlobStore, config: &ClientConfig) -> Result<Self> {
        let public_base_url = Url::parse(&config.public_base_url)
            .map_err(|e| StoreError::InvalidUrl(format!("{}: {e}", config.public_base_url)))?;

        info!(
            base_url = %public_base_url,
            blobs = %blobs.base_path().display(),
            "Local store ready"
        );

        Ok(Self {
            db: Mutex::new(db),
            blobs,
            feed: FeedHub::new(),
            identity: RwLock::new(None),
            public_base_url,
            chunk_size: config.upload_chunk_size,
        })
    }

    pub fn feed(&self) -> &FeedHub {
        &self.feed
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    pub fn sign_in(&self, user: UserId) {
        if let Ok(mut guard) = self.identity.write() {
            info!(user = %user, "Signed in");
            *guard = Some(user);
        }
    }

    pub fn sign_out(&self) {
        if let Ok(mut guard) = self.identity.write() {
            *guard = None;
        }
    }

    /// Server-side trigger: a camera reported an event, so its owner gets a
    /// notification.
    pub fn record_camera_event(&self, camera_id: CameraId, text: &str) -> Result<Notification> {
        let db = self.db()?;
        let camera = db.get_camera(camera_id)?;

        let notification = Notification {
            id: NotificationId::new(),
            user_id: camera.user_id,
            camera_id: Some(camera_id),
            notification_text: text.to_string(),
            timestamp: Utc::now(),
        };
        db.insert_notification(&notification)?;
        self.feed
            .publish(&ChangeEvent::insert(Record::Notification(notification.clone())));

        Ok(notification)
    }

    /// Worker hook: move a job to its next status. Results are written only
    /// together with `completed` and cleared otherwise.
    pub fn transition_job(&self, id: JobId, transition: JobTransition) -> Result<VideoAnalysisJob> {
        let db = self.db()?;
        let mut job = db.get_analysis(id)?;

        let target = transition.target();
        if !job.status.can_transition_to(target) {
            return Err(StoreError::InvalidTransition {
                from: job.status,
                to: target,
            });
        }

        job.status = target;
        job.results = match transition {
            JobTransition::Completed(results) => Some(results),
            JobTransition::Processing | JobTransition::Error => None,
        };
        db.update_analysis(id, job.status, job.results.as_ref())?;
        self.feed
            .publish(&ChangeEvent::update(Record::Analysis(job.clone())));

        info!(job = %id, status = %job.status, "Job transitioned");
        Ok(job)
    }

    pub fn disconnect_feed(&self) -> usize {
        self.feed.disconnect()
    }

    pub fn reconnect_feed(&self) {
        self.feed.reconnect()
    }

    fn db(&self) -> Result<MutexGuard<'_, Database>> {
        self.db.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn signed_in(&self) -> Result<UserId> {
        self.identity
            .read()
            .map_err(|_| StoreError::LockPoisoned)?
            .clone()
            .ok_or(StoreError::Unauthenticated)
    }

    // row-level policy: writes only touch the caller's own rows
    fn authorize(&self, owner: &UserId) -> Result<()> {
        let user = self.signed_in()?;
        if &user != owner {
            return Err(StoreError::Forbidden(format!("{user} does not own this row")));
        }
        Ok(())
    }

    // row-level policy for reads: an unfiltered scope is narrowed to the
    // caller's rows and a filter on another user is refused
    fn read_scope(&self, scope: Scope) -> Result<(UserId, Scope)> {
        scope.validate()?;
        let user = self.signed_in()?;
        match scope.filter {
            Some(Filter::Owner(ref owner)) if owner != &user => Err(StoreError::Forbidden(
                format!("{user} cannot read rows of {owner}"),
            )),
            Some(_) => Ok((user, scope)),
            None => Ok((user.clone(), Scope::owner(scope.table, user))),
        }
    }
}

#[async_trait]
impl RemoteStore for LocalStore {
    async fn query(&self, table: Table, filter: Option<Filter>, order: Order) -> Result<Vec<Record>> {
        let (user, scope) = self.read_scope(Scope { table, filter })?;

        let db = self.db()?;
        let mut records: Vec<Record> = match table {
            Table::Cameras => db
                .list_cameras(scope.filter.as_ref(), order)?
                .into_iter()
                .map(Record::Camera)
                .collect(),
            Table::Notifications => db
                .list_notifications(scope.filter.as_ref(), order)?
                .into_iter()
                .map(Record::Notification)
                .collect(),
            Table::VideoAnalysis => {
                let owner = match &scope.filter {
                    Some(Filter::Owner(user)) => Some(user),
                    _ => None,
                };
                db.list_analyses(owner, order)?
                    .into_iter()
                    .map(Record::Analysis)
                    .collect()
            }
        };
        records.retain(|record| record.owner() == &user);
        Ok(records)
    }

    async fn insert(&self, record: NewRecord) -> Result<Record> {
        self.authorize(record.owner())?;

        let db = self.db()?;
        let inserted = match record {
            NewRecord::Camera(new) => {
                let camera = Camera {
                    id: CameraId::new(),
                    user_id: new.user_id,
                    camera_name: new.camera_name,
                    ip_address: new.ip_address,
                    created_at: Utc::now(),
                };
                db.insert_camera(&camera)?;
                Record::Camera(camera)
            }
            NewRecord::Analysis(new) => {
                let job = VideoAnalysisJob {
                    id: JobId::new(),
                    user_id: new.user_id,
                    video_url: new.video_url,
                    status: JobStatus::Pending,
                    results: None,
                    created_at: Utc::now(),
                };
                db.insert_analysis(&job)?;
                Record::Analysis(job)
            }
        };
        self.feed.publish(&ChangeEvent::insert(inserted.clone()));

        Ok(inserted)
    }

    async fn delete(&self, table: Table, id: Uuid) -> Result<bool> {
        let db = self.db()?;
        let owner = match table {
            Table::Cameras => db.get_camera(CameraId(id)).map(|c| c.user_id),
            Table::Notifications => db.get_notification(NotificationId(id)).map(|n| n.user_id),
            Table::VideoAnalysis => db.get_analysis(JobId(id)).map(|a| a.user_id),
        };
        let owner = match owner {
            Ok(owner) => owner,
            Err(StoreError::NotFound) => return Ok(false),
            Err(e) => return Err(e),
        };
        self.authorize(&owner)?;

        match table {
            Table::Cameras => db.delete_camera(CameraId(id)),
            Table::Notifications => db.delete_notification(NotificationId(id)),
            Table::VideoAnalysis => db.delete_analysis(JobId(id)),
        }
    }

    async fn subscribe(&self, scope: Scope) -> Result<FeedStream> {
        let (user, scope) = self.read_scope(scope)?;

        // held until the subscription exists so ownership cannot change in between
        let db = self.db()?;
        if let Some(Filter::Camera(id)) = &scope.filter {
            let camera = db.get_camera(*id)?;
            if camera.user_id != user {
                return Err(StoreError::Forbidden(format!("{user} does not own camera {id}")));
            }
        }
        self.feed.subscribe(scope)
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> Result<()> {
        self.feed.unsubscribe(id)?;
        Ok(())
    }

    async fn upload_blob(
        &self,
        bucket: &str,
        path: &str,
        bytes: Bytes,
        on_progress: &ProgressFn<'_>,
    ) -> Result<StoredObject> {
        self.signed_in()?;
        self.blobs
            .write_object(bucket, path, &bytes, self.chunk_size, on_progress)
            .await
    }

    async fn public_url(&self, bucket: &str, path: &str) -> Result<String> {
        let mut url = self.public_base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidUrl(format!("{} cannot be a base", self.public_base_url)))?
            .pop_if_empty()
            .push(bucket)
            .push(path);
        Ok(url.to_string())
    }

    async fn current_identity(&self) -> Option<UserId> {
        match self.identity.read() {
            Ok(guard) => guard.clone(),
            Err(_) => {
                warn!("Identity lock poisoned");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisResults, NewAnalysis, NewCamera};
    use tempfile::TempDir;

    async fn store() -> (LocalStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = ClientConfig {
            public_base_url: "https://store".into(),
            upload_chunk_size: 4,
            ..ClientConfig::default()
        };
        let store = LocalStore::open(dir.path(), &config).await.unwrap();
        (store, dir)
    }

    fn new_job(owner: &str) -> NewRecord {
        NewRecord::Analysis(NewAnalysis {
            user_id: UserId::new(owner),
            video_url: "https://store/videos/clip.mp4".into(),
        })
    }

    #[tokio::test]
    async fn test_writes_require_matching_identity() {
        let (store, _dir) = store().await;
        assert!(matches!(store.insert(new_job("u1")).await, Err(StoreError::Unauthenticated)));

        store.sign_in(UserId::new("u2"));
        assert!(matches!(store.insert(new_job("u1")).await, Err(StoreError::Forbidden(_))));

        store.sign_in(UserId::new("u1"));
        let record = store.insert(new_job("u1")).await.unwrap();
        let Record::Analysis(job) = record else { panic!("expected a job") };
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.results.is_none());
    }

    #[tokio::test]
    async fn test_insert_and_transition_are_published_in_order() {
        let (store, _dir) = store().await;
        let user = UserId::new("u1");
        store.sign_in(user.clone());
        let mut feed = store
            .subscribe(Scope::owner(Table::VideoAnalysis, user))
            .await
            .unwrap();

        let record = store.insert(new_job("u1")).await.unwrap();
        let id = JobId(record.key());
        store.transition_job(id, JobTransition::Processing).unwrap();
        store
            .transition_job(id, JobTransition::Completed(AnalysisResults::new(false, 0.92)))
            .unwrap();

        let ops: Vec<_> = (0..3)
            .map(|_| feed.events.try_recv().unwrap())
            .map(|ev| match ev.record {
                Record::Analysis(job) => (ev.op, job.status),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(
            ops,
            vec![
                (crate::remote::ChangeOp::Insert, JobStatus::Pending),
                (crate::remote::ChangeOp::Update, JobStatus::Processing),
                (crate::remote::ChangeOp::Update, JobStatus::Completed),
            ]
        );
    }

    #[tokio::test]
    async fn test_terminal_jobs_reject_transitions() {
        let (store, _dir) = store().await;
        store.sign_in(UserId::new("u1"));
        let id = JobId(store.insert(new_job("u1")).await.unwrap().key());

        store.transition_job(id, JobTransition::Error).unwrap();
        let err = store.transition_job(id, JobTransition::Processing).unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidTransition { from: JobStatus::Error, to: JobStatus::Processing }
        ));
    }

    #[tokio::test]
    async fn test_camera_event_trigger_targets_owner() {
        let (store, _dir) = store().await;
        let user = UserId::new("u1");
        store.sign_in(user.clone());
        let camera = store
            .insert(NewRecord::Camera(NewCamera {
                user_id: user.clone(),
                camera_name: "Porch".into(),
                ip_address: "10.0.0.4:8080".into(),
            }))
            .await
            .unwrap();
        let camera_id = CameraId(camera.key());

        let notification = store.record_camera_event(camera_id, "Motion detected").unwrap();
        assert_eq!(notification.user_id, user);

        let listed = store
            .query(Table::Notifications, Some(Filter::Camera(camera_id)), Order::NewestFirst)
            .await
            .unwrap();
        assert_eq!(listed, vec![Record::Notification(notification)]);
    }

    #[tokio::test]
    async fn test_inserted_row_equals_queried_row() {
        let (store, _dir) = store().await;
        store.sign_in(UserId::new("u1"));
        let mut feed = store.subscribe(Scope::table(Table::VideoAnalysis)).await.unwrap();

        let inserted = store.insert(new_job("u1")).await.unwrap();
        let pushed = feed.events.try_recv().unwrap().record;
        let listed = store.query(Table::VideoAnalysis, None, Order::NewestFirst).await.unwrap();

        assert_eq!(pushed, inserted);
        assert_eq!(listed, vec![inserted]);
    }

    #[tokio::test]
    async fn test_reads_are_limited_to_own_rows() {
        let (store, _dir) = store().await;
        store.sign_in(UserId::new("u2"));
        let theirs = store
            .insert(NewRecord::Camera(NewCamera {
                user_id: UserId::new("u2"),
                camera_name: "Gate".into(),
                ip_address: "10.0.0.9".into(),
            }))
            .await
            .unwrap();
        let theirs = CameraId(theirs.key());
        store.record_camera_event(theirs, "Motion detected").unwrap();
        store.insert(new_job("u2")).await.unwrap();

        store.sign_in(UserId::new("u1"));
        for table in [Table::Cameras, Table::Notifications, Table::VideoAnalysis] {
            assert!(store.query(table, None, Order::NewestFirst).await.unwrap().is_empty());
        }
        assert!(store
            .query(Table::Cameras, Some(Filter::Camera(theirs)), Order::NewestFirst)
            .await
            .unwrap()
            .is_empty());
        assert!(store
            .query(Table::Notifications, Some(Filter::Camera(theirs)), Order::NewestFirst)
            .await
            .unwrap()
            .is_empty());
        assert!(matches!(
            store
                .query(Table::VideoAnalysis, Some(Filter::Owner(UserId::new("u2"))), Order::NewestFirst)
                .await,
            Err(StoreError::Forbidden(_))
        ));
        assert!(matches!(
            store.subscribe(Scope::camera(Table::Notifications, theirs)).await,
            Err(StoreError::Forbidden(_))
        ));
        assert!(matches!(
            store.subscribe(Scope::owner(Table::VideoAnalysis, UserId::new("u2"))).await,
            Err(StoreError::Forbidden(_))
        ));

        // an unfiltered subscription only sees the caller's rows
        let mut mine = store.subscribe(Scope::table(Table::Notifications)).await.unwrap();
        store.record_camera_event(theirs, "Door opened").unwrap();
        assert!(mine.events.try_recv().is_err());

        store.sign_out();
        assert!(matches!(
            store.query(Table::Cameras, None, Order::NewestFirst).await,
            Err(StoreError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_public_url_is_derived_from_path() {
        let (store, _dir) = store().await;
        let url = store.public_url("videos", "u1-1700000000000-clip.mp4").await.unwrap();
        assert_eq!(url, "https://store/videos/u1-1700000000000-clip.mp4");

        let spaced = store.public_url("videos", "my clip.mp4").await.unwrap();
        assert_eq!(spaced, "https://store/videos/my%20clip.mp4");
    }

    #[tokio::test]
    async fn test_delete_missing_row_is_not_an_error() {
        let (store, _dir) = store().await;
        store.sign_in(UserId::new("u1"));
        assert!(!store.delete(Table::Cameras, Uuid::new_v4()).await.unwrap());
    }
}
