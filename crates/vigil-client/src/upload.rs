//! Video upload pipeline.
//!
//! `validate -> check identity -> upload blob -> resolve public URL -> create
//! job -> notify processing service`. Each step runs only if the previous one
//! succeeded. The observable [`UploadState`] goes back to idle on every exit
//! path, success included.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use vigil_net::RegisterVideoRequest;
use vigil_shared::config::ClientConfig;
use vigil_shared::types::{JobId, UserId};
use vigil_shared::ValidationError;
use vigil_store::{NewAnalysis, NewRecord};

use crate::context::AppContext;
use crate::error::UploadError;

/// Reported to an optional listener each time the percentage grows.
pub type ProgressListener = dyn Fn(u8) + Send + Sync;

/// Fallback MIME type for unrecognised extensions.
const OCTET_STREAM: &str = "application/octet-stream";

/// MIME type for a video file extension.
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "mp4" | "m4v" => "video/mp4",
        "avi" => "video/avi",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        _ => OCTET_STREAM,
    }
}

/// A file the user picked for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCandidate {
    file_name: String,
    mime_type: String,
    bytes: Bytes,
}

impl UploadCandidate {
    /// Any directory part of `file_name` is dropped.
    pub fn new(file_name: &str, mime_type: &str, bytes: impl Into<Bytes>) -> Self {
        let file_name = file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(file_name)
            .to_string();
        Self {
            file_name,
            mime_type: mime_type.to_string(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime = path
            .extension()
            .and_then(|e| e.to_str())
            .map(mime_for_extension)
            .unwrap_or(OCTET_STREAM);
        Ok(Self::new(&file_name, mime, bytes))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }
}

/// Check a candidate against the configured limits. Checks run in a fixed
/// order and the first failure wins: missing file, type, empty, size.
pub fn validate<'a>(
    file: Option<&'a UploadCandidate>,
    config: &ClientConfig,
) -> Result<&'a UploadCandidate, ValidationError> {
    let file = file.ok_or(ValidationError::MissingFile)?;

    if !config.accepts_mime(file.mime_type()) {
        return Err(ValidationError::UnsupportedType {
            mime: file.mime_type().to_string(),
            allowed: config.allowed_mime_types.join(", "),
        });
    }
    if file.size() == 0 {
        return Err(ValidationError::EmptyFile);
    }
    if file.size() > config.max_upload_size {
        return Err(ValidationError::TooLarge {
            size: file.size(),
            max: config.max_upload_size,
        });
    }
    Ok(file)
}

/// Storage object name: `{owner}-{epoch millis}-{file name}`.
pub fn object_name(owner: &UserId, at: DateTime<Utc>, file_name: &str) -> String {
    format!("{owner}-{}-{file_name}", at.timestamp_millis())
}

/// Percentage for `loaded / total`, held below 100 until the upload is done.
fn capped_percent(loaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = loaded.min(total).saturating_mul(100) / total;
    pct.min(99) as u8
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UploadState {
    pub uploading: bool,
    /// 0..=100, never decreasing within one upload.
    pub progress: u8,
}

struct Progress<'a> {
    state: &'a watch::Sender<UploadState>,
    listener: Option<&'a ProgressListener>,
    last: AtomicU8,
}

impl Progress<'_> {
    fn report(&self, loaded: u64, total: u64) {
        self.advance(capped_percent(loaded, total));
    }

    fn complete(&self) {
        self.advance(100);
    }

    fn advance(&self, pct: u8) {
        let prev = self.last.fetch_max(pct, Ordering::SeqCst);
        if pct <= prev {
            return;
        }
        self.state.send_modify(|s| s.progress = s.progress.max(pct));
        if let Some(listener) = self.listener {
            listener(pct);
        }
    }
}

// Resets the observable state and frees the pipeline however `upload` exits.
struct InFlight<'a> {
    pipeline: &'a UploadPipeline,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.pipeline.state.send_replace(UploadState::default());
        self.pipeline.busy.store(false, Ordering::Release);
    }
}

pub struct UploadPipeline {
    ctx: AppContext,
    state: watch::Sender<UploadState>,
    busy: AtomicBool,
    listener: Option<Arc<ProgressListener>>,
}

impl UploadPipeline {
    pub fn new(ctx: AppContext) -> Self {
        let (state, _) = watch::channel(UploadState::default());
        Self {
            ctx,
            state,
            busy: AtomicBool::new(false),
            listener: None,
        }
    }

    pub fn with_progress_listener(mut self, listener: Arc<ProgressListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn state(&self) -> UploadState {
        *self.state.borrow()
    }

    pub fn watch(&self) -> watch::Receiver<UploadState> {
        self.state.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Run the pipeline for `file` on behalf of `owner` and return the id of
    /// the created job. Only one upload runs at a time; a second call while
    /// one is in flight fails with [`UploadError::Busy`] and changes nothing.
    pub async fn upload(
        &self,
        file: Option<UploadCandidate>,
        owner: Option<UserId>,
    ) -> Result<JobId, UploadError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(UploadError::Busy);
        }
        let _in_flight = InFlight { pipeline: self };
        self.state.send_replace(UploadState {
            uploading: true,
            progress: 0,
        });

        let config = self.ctx.config();
        let file = validate(file.as_ref(), config)?;
        let owner = owner.ok_or(UploadError::AuthRequired)?;

        let path = object_name(&owner, Utc::now(), file.file_name());
        info!(
            owner = %owner,
            path = %path,
            size = file.size(),
            mime = file.mime_type(),
            "Uploading video"
        );

        let progress = Progress {
            state: &self.state,
            listener: self.listener.as_deref(),
            last: AtomicU8::new(0),
        };
        let on_progress = |loaded: u64, total: u64| progress.report(loaded, total);

        let store = self.ctx.store();
        let stored = store
            .upload_blob(&config.storage_bucket, &path, file.bytes().clone(), &on_progress)
            .await
            .map_err(UploadError::Upload)?;
        progress.complete();
        debug!(path = %path, hash = %stored.blake3_hash, "Video stored");

        let video_url = store
            .public_url(&config.storage_bucket, &path)
            .await
            .map_err(UploadError::ResolveUrl)?;

        let record = store
            .insert(NewRecord::Analysis(NewAnalysis {
                user_id: owner.clone(),
                video_url: video_url.clone(),
            }))
            .await
            .map_err(|source| {
                warn!(bucket = %config.storage_bucket, path = %path, "Uploaded video has no analysis job");
                UploadError::CreateJob {
                    path: path.clone(),
                    source,
                }
            })?;

        let job_id = JobId(record.key());
        info!(job = %job_id, video_url = %video_url, "Analysis job created");

        self.notify(video_url).await;
        Ok(job_id)
    }

    async fn notify(&self, video_url: String) {
        let request = RegisterVideoRequest { video_url };
        let call = self.ctx.notifier().register_video(&request);
        match tokio::time::timeout(self.ctx.config().notify_timeout, call).await {
            Ok(Ok(())) => debug!("Processing service notified"),
            Ok(Err(e)) => warn!(error = %e, "Video registration failed"),
            Err(_) => warn!("Video registration timed out"),
        }
    }
}
