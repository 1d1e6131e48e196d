//! CRUD operations for [`Notification`] records.

use rusqlite::{params, params_from_iter};

use vigil_shared::types::{CameraId, NotificationId, UserId};

use crate::database::{format_ts, not_found, parse_ts, parse_uuid, Database};
use crate::error::{Result, StoreError};
use crate::models::Notification;
use crate::query::{Filter, Order};

impl Database {
    pub fn insert_notification(&self, notification: &Notification) -> Result<()> {
        self.conn().execute(
            "INSERT INTO notifications (id, user_id, camera_id, notification_text, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                notification.id.to_string(),
                notification.user_id.as_str(),
                notification.camera_id.map(|c| c.to_string()),
                notification.notification_text,
                format_ts(&notification.timestamp),
            ],
        )?;
        Ok(())
    }

    pub fn get_notification(&self, id: NotificationId) -> Result<Notification> {
        self.conn()
            .query_row(
                "SELECT id, user_id, camera_id, notification_text, timestamp
                 FROM notifications WHERE id = ?1",
                params![id.to_string()],
                row_to_notification,
            )
            .map_err(not_found)
    }

    pub fn list_notifications(
        &self,
        filter: Option<&Filter>,
        order: Order,
    ) -> Result<Vec<Notification>> {
        let (clause, args): (&str, Vec<String>) = match filter {
            None => ("", Vec::new()),
            Some(Filter::Owner(user)) => ("WHERE user_id = ?1", vec![user.0.clone()]),
            Some(Filter::Camera(id)) => ("WHERE camera_id = ?1", vec![id.to_string()]),
        };
        let sql = format!(
            "SELECT id, user_id, camera_id, notification_text, timestamp
             FROM notifications
             {clause}
             ORDER BY timestamp {dir}, rowid {dir}",
            dir = order.sql(),
        );

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), row_to_notification)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    pub fn delete_notification(&self, id: NotificationId) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM notifications WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(affected > 0)
    }
}

fn row_to_notification(row: &rusqlite::Row<'_>) -> rusqlite::Result<Notification> {
    let id_str: String = row.get(0)?;
    let user_id: String = row.get(1)?;
    let camera_str: Option<String> = row.get(2)?;
    let notification_text: String = row.get(3)?;
    let ts_str: String = row.get(4)?;

    let camera_id = match camera_str {
        Some(s) => Some(CameraId(parse_uuid(2, &s)?)),
        None => None,
    };

    Ok(Notification {
        id: NotificationId(parse_uuid(0, &id_str)?),
        user_id: UserId(user_id),
        camera_id,
        notification_text,
        timestamp: parse_ts(4, &ts_str)?,
    })
}
