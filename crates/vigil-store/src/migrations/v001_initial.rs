//! v001 -- Initial schema creation.
//!
//! Creates `cameras`, `notifications` and `video_analysis`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Cameras
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS cameras (
    id          TEXT PRIMARY KEY NOT NULL,    -- UUID v4
    user_id     TEXT NOT NULL,                -- identity provider subject
    camera_name TEXT NOT NULL,
    ip_address  TEXT NOT NULL,
    created_at  TEXT NOT NULL                 -- RFC-3339, microseconds, UTC
);

CREATE INDEX IF NOT EXISTS idx_cameras_user_created
    ON cameras(user_id, created_at DESC);

-- ----------------------------------------------------------------
-- Notifications (written by the camera event trigger only)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS notifications (
    id                TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    user_id           TEXT NOT NULL,
    camera_id         TEXT,                       -- nullable FK -> cameras(id)
    notification_text TEXT NOT NULL,
    timestamp         TEXT NOT NULL,

    FOREIGN KEY (camera_id) REFERENCES cameras(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_notifications_user_ts
    ON notifications(user_id, timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_notifications_camera_ts
    ON notifications(camera_id, timestamp DESC);

-- ----------------------------------------------------------------
-- Video analysis jobs
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS video_analysis (
    id         TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    user_id    TEXT NOT NULL,
    video_url  TEXT NOT NULL,
    status     TEXT NOT NULL DEFAULT 'pending',
    results    TEXT,                          -- JSON, NULL unless completed
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_video_analysis_user_created
    ON video_analysis(user_id, created_at DESC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
