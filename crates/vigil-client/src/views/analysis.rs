use tokio::sync::watch;
use tracing::debug;

use vigil_shared::types::JobId;
use vigil_store::{Filter, Order, Scope, Table, VideoAnalysisJob};

use crate::context::AppContext;
use crate::error::{ClientError, UploadError};
use crate::feed::SubscriptionHandle;
use crate::projector::{project, JobView};
use crate::upload::{UploadCandidate, UploadPipeline, UploadState};
use crate::view_state::{SharedViewState, ViewState};
use crate::views::{lock, release, snapshot, track};

/// The signed-in user's analysis jobs, kept live, plus the upload control.
pub struct VideoAnalysisView {
    ctx: AppContext,
    pipeline: UploadPipeline,
    jobs: SharedViewState<VideoAnalysisJob>,
    subscription: Option<SubscriptionHandle>,
    error: Option<String>,
}

impl VideoAnalysisView {
    pub fn new(ctx: AppContext) -> Self {
        Self::with_pipeline(ctx.clone(), UploadPipeline::new(ctx))
    }

    pub fn with_pipeline(ctx: AppContext, pipeline: UploadPipeline) -> Self {
        Self {
            ctx,
            pipeline,
            jobs: ViewState::shared(),
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

    /// Upload `file` as the signed-in user. Without a live subscription the
    /// list is re-fetched so the new job still shows up.
    pub async fn upload(&mut self, file: Option<UploadCandidate>) -> Result<JobId, UploadError> {
        let owner = self.ctx.store().current_identity().await;
        let result = self.pipeline.upload(file, owner).await;
        let id = track(&mut self.error, result)?;

        if !self.is_live() {
            if let Err(e) = self.fetch().await {
                debug!(error = %e, "Refresh after upload failed");
            }
        }
        Ok(id)
    }

    pub fn jobs(&self) -> Vec<VideoAnalysisJob> {
        snapshot(&self.jobs)
    }

    pub fn rows(&self) -> Vec<(VideoAnalysisJob, JobView)> {
        self.jobs()
            .into_iter()
            .map(|job| {
                let view = project(&job);
                (job, view)
            })
            .collect()
    }

    pub fn upload_state(&self) -> UploadState {
        self.pipeline.state()
    }

    pub fn watch_upload(&self) -> watch::Receiver<UploadState> {
        self.pipeline.watch()
    }

    pub fn is_live(&self) -> bool {
        self.subscription.as_ref().is_some_and(|s| s.is_active())
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    async fn fetch(&self) -> Result<(), ClientError> {
        let user = self.ctx.identity().await?;
        let rows = self
            .ctx
            .store()
            .query(Table::VideoAnalysis, Some(Filter::Owner(user)), Order::NewestFirst)
            .await?;
        let jobs: Vec<VideoAnalysisJob> = rows
            .into_iter()
            .filter_map(|row| VideoAnalysisJob::try_from(row).ok())
            .collect();
        debug!(count = jobs.len(), "Loaded analysis jobs");
        lock(&self.jobs)?.replace_all(jobs);
        Ok(())
    }

    async fn load_and_subscribe(&mut self) -> Result<(), ClientError> {
        self.fetch().await?;
        let user = self.ctx.identity().await?;
        let handle = self
            .ctx
            .feed()
            .sync_into(Scope::owner(Table::VideoAnalysis, user), self.jobs.clone())
            .await?;
        self.subscription = Some(handle);
        Ok(())
    }
}
