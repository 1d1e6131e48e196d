pub mod context;
pub mod error;
pub mod feed;
pub mod projector;
pub mod upload;
pub mod view_state;
pub mod views;

use tracing_subscriber::{fmt, EnvFilter};

use vigil_shared::constants::APP_NAME;

pub use context::AppContext;
pub use error::{ClientError, UploadError};
pub use feed::{ChangeFeed, SubscriptionHandle};
pub use projector::{project, JobView, StatusIcon};
pub use upload::{UploadCandidate, UploadPipeline, UploadState};
pub use view_state::{Keyed, MergeOutcome, SharedViewState, ViewState};

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter; calling this more than once is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("vigil_client=debug,vigil_store=info,vigil_net=info,warn")
    });

    let installed = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("Starting {APP_NAME} client core");
    }
}
