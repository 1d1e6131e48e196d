use thiserror::Error;

use vigil_shared::ValidationError;
use vigil_store::StoreError;

/// Failures of view operations. `to_string()` is what the view displays.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("You must be signed in to do that")]
    AuthRequired,

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures of [`crate::UploadPipeline::upload`], in pipeline order.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("You must be signed in to upload videos")]
    AuthRequired,

    #[error("Another upload is already in progress")]
    Busy,

    #[error("Upload failed: {0}")]
    Upload(#[source] StoreError),

    #[error("Could not resolve the video URL: {0}")]
    ResolveUrl(#[source] StoreError),

    // the blob at `path` stays in storage
    #[error("Video uploaded but the analysis job could not be created: {source}")]
    CreateJob {
        path: String,
        #[source]
        source: StoreError,
    },
}

impl UploadError {
    /// Whether the user can fix this by choosing a different file.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
