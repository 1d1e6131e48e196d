/// Application name
pub const APP_NAME: &str = "Vigil";

/// Storage bucket that receives uploaded videos
pub const DEFAULT_VIDEO_BUCKET: &str = "video-analysis";

/// Maximum video upload size in bytes (100 MiB)
pub const MAX_UPLOAD_SIZE: u64 = 100 * 1024 * 1024;

/// MIME types accepted by the upload pipeline
pub const ALLOWED_VIDEO_MIME_TYPES: &[&str] = &["video/mp4", "video/avi"];

/// Base URL of the external processing service
pub const DEFAULT_PROCESSING_URL: &str = "http://127.0.0.1:5000";

/// Public base URL used when resolving blob paths
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://127.0.0.1:54321/storage/v1/object/public";

/// Timeout for best-effort registration calls, in seconds
pub const DEFAULT_NOTIFY_TIMEOUT_SECS: u64 = 10;

/// Bytes written per progress tick during a blob upload (1 MiB)
pub const DEFAULT_UPLOAD_CHUNK_SIZE: usize = 1024 * 1024;

/// Table names as they appear on the wire and in the database
pub const TABLE_CAMERAS: &str = "cameras";
pub const TABLE_NOTIFICATIONS: &str = "notifications";
pub const TABLE_VIDEO_ANALYSIS: &str = "video_analysis";
