//! Table, filter and scope descriptors shared by queries and subscriptions.

use serde::{Deserialize, Serialize};

use vigil_shared::constants::{TABLE_CAMERAS, TABLE_NOTIFICATIONS, TABLE_VIDEO_ANALYSIS};
use vigil_shared::types::{CameraId, UserId};

use crate::error::{Result, StoreError};
use crate::models::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Cameras,
    Notifications,
    VideoAnalysis,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cameras => TABLE_CAMERAS,
            Self::Notifications => TABLE_NOTIFICATIONS,
            Self::VideoAnalysis => TABLE_VIDEO_ANALYSIS,
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Equality predicate applied to a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// `user_id = eq.<user>`
    Owner(UserId),
    /// `camera_id = eq.<camera>` on notifications, `id = eq.<camera>` on cameras.
    Camera(CameraId),
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Owner(user) => write!(f, "user_id=eq.{user}"),
            Self::Camera(camera) => write!(f, "camera_id=eq.{camera}"),
        }
    }
}

/// Result ordering on the table's creation timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Order {
    #[default]
    NewestFirst,
    OldestFirst,
}

impl Order {
    pub(crate) fn sql(&self) -> &'static str {
        match self {
            Self::NewestFirst => "DESC",
            Self::OldestFirst => "ASC",
        }
    }
}

/// What a single subscription observes: a table plus an optional filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub table: Table,
    pub filter: Option<Filter>,
}

impl Scope {
    pub fn table(table: Table) -> Self {
        Self { table, filter: None }
    }

    pub fn owner(table: Table, user: UserId) -> Self {
        Self {
            table,
            filter: Some(Filter::Owner(user)),
        }
    }

    pub fn camera(table: Table, camera: CameraId) -> Self {
        Self {
            table,
            filter: Some(Filter::Camera(camera)),
        }
    }

    /// Reject filters the table has no column for.
    pub fn validate(&self) -> Result<()> {
        match (self.table, &self.filter) {
            (Table::VideoAnalysis, Some(Filter::Camera(_))) => Err(StoreError::InvalidScope {
                scope: self.to_string(),
                reason: "video_analysis has no camera column",
            }),
            _ => Ok(()),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        record.table() == self.table
            && self
                .filter
                .as_ref()
                .map_or(true, |filter| record.matches(filter))
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.filter {
            Some(filter) => write!(f, "{}?{}", self.table, filter),
            None => write!(f, "{}", self.table),
        }
    }
}
