//! Client configuration loaded from environment variables.
//!
//! Every setting has a default so the client works against a local backend
//! with zero configuration.

use std::time::Duration;

use crate::constants::{
    ALLOWED_VIDEO_MIME_TYPES, DEFAULT_NOTIFY_TIMEOUT_SECS, DEFAULT_PROCESSING_URL,
    DEFAULT_PUBLIC_BASE_URL, DEFAULT_UPLOAD_CHUNK_SIZE, DEFAULT_VIDEO_BUCKET, MAX_UPLOAD_SIZE,
};

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Storage bucket that receives uploaded videos.
    /// Env: `VIGIL_BUCKET`
    /// Default: `video-analysis`
    pub storage_bucket: String,

    /// Largest accepted upload in bytes.
    /// Env: `VIGIL_MAX_UPLOAD_BYTES`
    /// Default: 100 MiB
    pub max_upload_size: u64,

    /// MIME types the upload pipeline accepts.
    /// Env: `VIGIL_ALLOWED_MIME` (comma separated)
    /// Default: `video/mp4,video/avi`
    pub allowed_mime_types: Vec<String>,

    /// Base URL of the external processing service.
    /// Env: `VIGIL_PROCESSING_URL`
    pub processing_service_url: String,

    /// Public base URL under which blob objects are served.
    /// Env: `VIGIL_PUBLIC_BASE_URL`
    pub public_base_url: String,

    /// Timeout applied to best-effort registration calls.
    /// Env: `VIGIL_NOTIFY_TIMEOUT_SECS`
    pub notify_timeout: Duration,

    /// Bytes transferred between two progress reports.
    /// Env: `VIGIL_UPLOAD_CHUNK_BYTES`
    pub upload_chunk_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            storage_bucket: DEFAULT_VIDEO_BUCKET.to_string(),
            max_upload_size: MAX_UPLOAD_SIZE,
            allowed_mime_types: ALLOWED_VIDEO_MIME_TYPES
                .iter()
                .map(|m| m.to_string())
                .collect(),
            processing_service_url: DEFAULT_PROCESSING_URL.to_string(),
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
            notify_timeout: Duration::from_secs(DEFAULT_NOTIFY_TIMEOUT_SECS),
            upload_chunk_size: DEFAULT_UPLOAD_CHUNK_SIZE,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] but reads values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(bucket) = lookup("VIGIL_BUCKET") {
            let bucket = bucket.trim();
            if bucket.is_empty() || bucket.contains('/') {
                tracing::warn!(value = %bucket, "Invalid VIGIL_BUCKET, using default");
            } else {
                config.storage_bucket = bucket.to_string();
            }
        }

        if let Some(val) = lookup("VIGIL_MAX_UPLOAD_BYTES") {
            match val.trim().parse::<u64>() {
                Ok(n) if n > 0 => config.max_upload_size = n,
                _ => tracing::warn!(value = %val, "Invalid VIGIL_MAX_UPLOAD_BYTES, using default"),
            }
        }

        if let Some(val) = lookup("VIGIL_ALLOWED_MIME") {
            let types: Vec<String> = val
                .split(',')
                .map(|m| m.trim().to_ascii_lowercase())
                .filter(|m| !m.is_empty())
                .collect();
            if types.is_empty() {
                tracing::warn!("Empty VIGIL_ALLOWED_MIME, using default");
            } else {
                config.allowed_mime_types = types;
            }
        }

        if let Some(url) = lookup("VIGIL_PROCESSING_URL") {
            if !url.trim().is_empty() {
                config.processing_service_url = url.trim().trim_end_matches('/').to_string();
            }
        }

        if let Some(url) = lookup("VIGIL_PUBLIC_BASE_URL") {
            if !url.trim().is_empty() {
                config.public_base_url = url.trim().trim_end_matches('/').to_string();
            }
        }

        if let Some(val) = lookup("VIGIL_NOTIFY_TIMEOUT_SECS") {
            match val.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.notify_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %val, "Invalid VIGIL_NOTIFY_TIMEOUT_SECS, using default"),
            }
        }

        if let Some(val) = lookup("VIGIL_UPLOAD_CHUNK_BYTES") {
            match val.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.upload_chunk_size = n,
                _ => tracing::warn!(value = %val, "Invalid VIGIL_UPLOAD_CHUNK_BYTES, using default"),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }

    /// Whether `mime` is in the allow-set (case-insensitive).
    pub fn accepts_mime(&self, mime: &str) -> bool {
        let mime = mime.trim().to_ascii_lowercase();
        self.allowed_mime_types.iter().any(|m| *m == mime)
    }
}
