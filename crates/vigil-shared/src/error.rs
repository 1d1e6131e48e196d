use thiserror::Error;

/// Input rejected before any side effect. The messages are shown to the user
/// as-is, next to the control that triggered the action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please choose a video file to upload")]
    MissingFile,

    #[error("Unsupported file type '{mime}'. Allowed types: {allowed}")]
    UnsupportedType { mime: String, allowed: String },

    #[error("The selected file is empty")]
    EmptyFile,

    #[error("File too large: {size} bytes (max {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("{field} must not be empty")]
    BlankField { field: &'static str },
}
