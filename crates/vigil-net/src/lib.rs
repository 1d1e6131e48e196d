// Best-effort registration calls to the external processing service.

pub mod error;
pub mod messages;
pub mod notifier;

pub use error::NotifyError;
pub use messages::{RegisterCameraRequest, RegisterVideoRequest};
pub use notifier::{HttpNotifier, RegistrationNotifier};
