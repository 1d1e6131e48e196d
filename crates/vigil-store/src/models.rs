//! Record shapes persisted by the Remote Store.
//!
//! Every struct derives `Serialize` and `Deserialize` so the same value can be
//! stored, pushed over the change feed and handed to the UI layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vigil_shared::types::{CameraId, JobId, NotificationId, UserId};

use crate::query::{Filter, Table};

// ---------------------------------------------------------------------------
// Camera
// ---------------------------------------------------------------------------

/// A camera registered by a user. Cameras are created and deleted, never
/// updated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Camera {
    pub id: CameraId,
    /// Registering user; the only owner a camera ever has.
    pub user_id: UserId,
    pub camera_name: String,
    /// Network address of the camera's image endpoint.
    pub ip_address: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// A server-generated camera event. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    /// Originating camera. Absent once the camera is deleted.
    pub camera_id: Option<CameraId>,
    pub notification_text: String,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Video analysis job
// ---------------------------------------------------------------------------

/// Lifecycle of a [`VideoAnalysisJob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Error,
    /// Any status string this client does not know about.
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "pending" => Self::Pending,
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            "error" => Self::Error,
            _ => Self::Unknown,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Transitions the processing service may perform.
    ///
    /// `pending -> processing -> completed | error`, with `pending` allowed
    /// to jump straight to a terminal state.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Processing | Self::Completed | Self::Error) => true,
            (Self::Processing, Self::Completed | Self::Error) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional classification details attached to a result.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DetectionDetails {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Severity on a 0-10 scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Per-frame score reported by the processing service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrameScore {
    /// Offset into the video, in seconds.
    pub timestamp: f64,
    pub confidence: f64,
}

/// Structured result payload written by the processing service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResults {
    pub violence_detected: bool,
    /// Model confidence in `[0, 1]`. Older workers omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<DetectionDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frames: Option<Vec<FrameScore>>,
}

impl AnalysisResults {
    pub fn new(violence_detected: bool, confidence: f64) -> Self {
        Self {
            violence_detected,
            confidence: Some(confidence),
            details: None,
            frames: None,
        }
    }
}

/// One submitted video tracked through its analysis lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoAnalysisJob {
    pub id: JobId,
    pub user_id: UserId,
    pub video_url: String,
    pub status: JobStatus,
    /// Present iff `status == Completed`.
    pub results: Option<AnalysisResults>,
    pub created_at: DateTime<Utc>,
}

/// A status change performed by the processing service.
#[derive(Debug, Clone, PartialEq)]
pub enum JobTransition {
    Processing,
    Completed(AnalysisResults),
    Error,
}

impl JobTransition {
    pub fn target(&self) -> JobStatus {
        match self {
            Self::Processing => JobStatus::Processing,
            Self::Completed(_) => JobStatus::Completed,
            Self::Error => JobStatus::Error,
        }
    }
}

// ---------------------------------------------------------------------------
// Record envelopes
// ---------------------------------------------------------------------------

/// A row of any table, as returned by queries and carried by the change feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "table", content = "record")]
pub enum Record {
    #[serde(rename = "cameras")]
    Camera(Camera),
    #[serde(rename = "notifications")]
    Notification(Notification),
    #[serde(rename = "video_analysis")]
    Analysis(VideoAnalysisJob),
}

impl Record {
    pub fn table(&self) -> Table {
        match self {
            Self::Camera(_) => Table::Cameras,
            Self::Notification(_) => Table::Notifications,
            Self::Analysis(_) => Table::VideoAnalysis,
        }
    }

    /// Primary key, regardless of table.
    pub fn key(&self) -> Uuid {
        match self {
            Self::Camera(c) => c.id.0,
            Self::Notification(n) => n.id.0,
            Self::Analysis(a) => a.id.0,
        }
    }

    pub fn owner(&self) -> &UserId {
        match self {
            Self::Camera(c) => &c.user_id,
            Self::Notification(n) => &n.user_id,
            Self::Analysis(a) => &a.user_id,
        }
    }

    /// Whether this row satisfies `filter`. A camera filter on `cameras`
    /// selects the camera itself; on `notifications` it selects the camera's
    /// events.
    pub fn matches(&self, filter: &Filter) -> bool {
        match (self, filter) {
            (_, Filter::Owner(user)) => self.owner() == user,
            (Self::Camera(c), Filter::Camera(id)) => c.id == *id,
            (Self::Notification(n), Filter::Camera(id)) => n.camera_id == Some(*id),
            (Self::Analysis(_), Filter::Camera(_)) => false,
        }
    }
}

impl TryFrom<Record> for Camera {
    type Error = Table;

    fn try_from(record: Record) -> Result<Self, Table> {
        match record {
            Record::Camera(c) => Ok(c),
            other => Err(other.table()),
        }
    }
}

impl TryFrom<Record> for Notification {
    type Error = Table;

    fn try_from(record: Record) -> Result<Self, Table> {
        match record {
            Record::Notification(n) => Ok(n),
            other => Err(other.table()),
        }
    }
}

impl TryFrom<Record> for VideoAnalysisJob {
    type Error = Table;

    fn try_from(record: Record) -> Result<Self, Table> {
        match record {
            Record::Analysis(a) => Ok(a),
            other => Err(other.table()),
        }
    }
}

/// Fields supplied by the client when creating a camera.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewCamera {
    pub user_id: UserId,
    pub camera_name: String,
    pub ip_address: String,
}

/// Fields supplied by the client when creating an analysis job. The store
/// assigns `pending` status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewAnalysis {
    pub user_id: UserId,
    pub video_url: String,
}

/// Insert payload. Notifications are absent: only the server creates them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewRecord {
    Camera(NewCamera),
    Analysis(NewAnalysis),
}

impl NewRecord {
    pub fn table(&self) -> Table {
        match self {
            Self::Camera(_) => Table::Cameras,
            Self::Analysis(_) => Table::VideoAnalysis,
        }
    }

    pub fn owner(&self) -> &UserId {
        match self {
            Self::Camera(c) => &c.user_id,
            Self::Analysis(a) => &a.user_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_strings_deserialize() {
        let status: JobStatus = serde_json::from_str("\"queued\"").unwrap();
        assert_eq!(status, JobStatus::Unknown);
        assert_eq!(JobStatus::parse("queued"), JobStatus::Unknown);
        assert_eq!(JobStatus::parse("processing"), JobStatus::Processing);
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for next in [JobStatus::Pending, JobStatus::Processing, JobStatus::Completed, JobStatus::Error] {
            assert!(!JobStatus::Completed.can_transition_to(next));
            assert!(!JobStatus::Error.can_transition_to(next));
        }
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Processing.can_transition_to(JobStatus::Pending));
    }

    #[test]
    fn results_accept_sparse_payloads() {
        let results: AnalysisResults =
            serde_json::from_str(r#"{"violence_detected": true}"#).unwrap();
        assert!(results.violence_detected);
        assert_eq!(results.confidence, None);

        let results: AnalysisResults = serde_json::from_str(
            r#"{"violence_detected": false, "confidence": 0.4,
                "details": {"type": "fight", "severity": 7},
                "frames": [{"timestamp": 1.5, "confidence": 0.2}]}"#,
        )
        .unwrap();
        let details = results.details.unwrap();
        assert_eq!(details.kind.as_deref(), Some("fight"));
        assert_eq!(details.severity, Some(7.0));
        assert_eq!(results.frames.unwrap().len(), 1);
    }

    #[test]
    fn camera_filter_semantics_depend_on_table() {
        let cam = CameraId::new();
        let owner = UserId::new("u1");
        let camera = Record::Camera(Camera {
            id: cam,
            user_id: owner.clone(),
            camera_name: "Porch".into(),
            ip_address: "10.0.0.2:8080".into(),
            created_at: Utc::now(),
        });
        let event = Record::Notification(Notification {
            id: NotificationId::new(),
            user_id: owner.clone(),
            camera_id: Some(cam),
            notification_text: "Motion".into(),
            timestamp: Utc::now(),
        });

        assert!(camera.matches(&Filter::Camera(cam)));
        assert!(event.matches(&Filter::Camera(cam)));
        assert!(event.matches(&Filter::Owner(owner)));
        assert!(!event.matches(&Filter::Camera(CameraId::new())));
    }
}
