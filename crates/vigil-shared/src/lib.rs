//! Types shared by every Vigil crate: identifiers, constants, client
//! configuration and the validation error taxonomy.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

pub use config::ClientConfig;
pub use error::ValidationError;
pub use types::{CameraId, JobId, NotificationId, UserId};
