//! Job status projector: turns a [`VideoAnalysisJob`] into what the analysis
//! list renders. Pure, no I/O.

use chrono::{DateTime, Utc};
use serde::Serialize;

use vigil_shared::types::JobId;
use vigil_store::{AnalysisResults, DetectionDetails, FrameScore, JobStatus, VideoAnalysisJob};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusIcon {
    Success,
    /// Rendered animated.
    InProgress,
    Warning,
    Waiting,
}

impl StatusIcon {
    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Success => "check-circle",
            Self::InProgress | Self::Waiting => "clock",
            Self::Warning => "alert-triangle",
        }
    }

    pub fn is_animated(&self) -> bool {
        matches!(self, Self::InProgress)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailField {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameRow {
    pub timestamp: String,
    pub confidence: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectionView {
    pub violence_detected: bool,
    /// "Yes" or "No".
    pub detected: &'static str,
    pub headline: &'static str,
    /// One decimal and a percent sign; absent when the score is unknown.
    pub confidence: Option<String>,
    pub details: Vec<DetailField>,
    pub frames: Vec<FrameRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobView {
    pub id: JobId,
    pub icon: StatusIcon,
    pub label: &'static str,
    pub submitted_at: String,
    pub video_url: String,
    /// Present only for completed jobs that carry results.
    pub detection: Option<DetectionView>,
}

pub fn project(job: &VideoAnalysisJob) -> JobView {
    let (icon, label) = status_display(job.status);
    let detection = match (job.status, &job.results) {
        (JobStatus::Completed, Some(results)) => Some(detection_view(results)),
        _ => None,
    };

    JobView {
        id: job.id,
        icon,
        label,
        submitted_at: format_submitted(job.created_at),
        video_url: job.video_url.clone(),
        detection,
    }
}

fn status_display(status: JobStatus) -> (StatusIcon, &'static str) {
    match status {
        JobStatus::Completed => (StatusIcon::Success, "Completed"),
        JobStatus::Processing => (StatusIcon::InProgress, "Processing"),
        JobStatus::Error => (StatusIcon::Warning, "Error"),
        JobStatus::Pending => (StatusIcon::Waiting, "Pending"),
        JobStatus::Unknown => (StatusIcon::Waiting, "Unknown"),
    }
}

/// e.g. "Oct 19, 2026, 3:04 PM"
pub fn format_submitted(at: DateTime<Utc>) -> String {
    at.format("%b %-d, %Y, %-I:%M %p").to_string()
}

/// A `[0, 1]` score as a percentage with one decimal.
fn format_percent(fraction: f64) -> Option<String> {
    fraction
        .is_finite()
        .then(|| format!("{:.1}%", fraction * 100.0))
}

fn detection_view(results: &AnalysisResults) -> DetectionView {
    let detected = results.violence_detected;
    DetectionView {
        violence_detected: detected,
        detected: if detected { "Yes" } else { "No" },
        headline: if detected { "Violence Detected" } else { "No Violence" },
        confidence: results.confidence.and_then(format_percent),
        details: results.details.as_ref().map(detail_fields).unwrap_or_default(),
        frames: results
            .frames
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(frame_row)
            .collect(),
    }
}

fn detail_fields(details: &DetectionDetails) -> Vec<DetailField> {
    let mut fields = Vec::new();
    if let Some(kind) = details.kind.as_deref().filter(|k| !k.trim().is_empty()) {
        fields.push(DetailField {
            label: "Type",
            value: title_case(kind),
        });
    }
    if let Some(severity) = details.severity.filter(|s| s.is_finite() && *s != 0.0) {
        fields.push(DetailField {
            label: "Severity",
            value: format!("{severity}/10"),
        });
    }
    if let Some(location) = details.location.as_deref().filter(|l| !l.trim().is_empty()) {
        fields.push(DetailField {
            label: "Location",
            value: location.to_string(),
        });
    }
    fields
}

fn frame_row(frame: &FrameScore) -> FrameRow {
    FrameRow {
        timestamp: format!("{}s", frame.timestamp),
        confidence: format_percent(frame.confidence).unwrap_or_else(|| "-".to_string()),
    }
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
