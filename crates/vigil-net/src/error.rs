use thiserror::Error;

/// A registration call did not reach a 2xx response. Callers log it and move
/// on; it is never surfaced as an operation failure.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Processing service unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Processing service answered {status} for {endpoint}")]
    Status { endpoint: &'static str, status: u16 },

    #[error("Invalid processing service URL: {0}")]
    InvalidUrl(String),
}
