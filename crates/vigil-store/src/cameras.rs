//! CRUD operations for [`Camera`] records.

use rusqlite::{params, params_from_iter};

use vigil_shared::types::{CameraId, UserId};

use crate::database::{format_ts, not_found, parse_ts, parse_uuid, Database};
use crate::error::{Result, StoreError};
use crate::models::Camera;
use crate::query::{Filter, Order};

impl Database {
    pub fn insert_camera(&self, camera: &Camera) -> Result<()> {
        self.conn().execute(
            "INSERT INTO cameras (id, user_id, camera_name, ip_address, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                camera.id.to_string(),
                camera.user_id.as_str(),
                camera.camera_name,
                camera.ip_address,
                format_ts(&camera.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_camera(&self, id: CameraId) -> Result<Camera> {
        self.conn()
            .query_row(
                "SELECT id, user_id, camera_name, ip_address, created_at
                 FROM cameras
                 WHERE id = ?1",
                params![id.to_string()],
                row_to_camera,
            )
            .map_err(not_found)
    }

    pub fn list_cameras(&self, filter: Option<&Filter>, order: Order) -> Result<Vec<Camera>> {
        let (clause, args): (&str, Vec<String>) = match filter {
            None => ("", Vec::new()),
            Some(Filter::Owner(user)) => ("WHERE user_id = ?1", vec![user.0.clone()]),
            Some(Filter::Camera(id)) => ("WHERE id = ?1", vec![id.to_string()]),
        };
        let sql = format!(
            "SELECT id, user_id, camera_name, ip_address, created_at
             FROM cameras
             {clause}
             ORDER BY created_at {dir}, rowid {dir}",
            dir = order.sql(),
        );

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), row_to_camera)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    // ON DELETE SET NULL: the camera's notifications survive without a back-reference
    pub fn delete_camera(&self, id: CameraId) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM cameras WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }
}

fn row_to_camera(row: &rusqlite::Row<'_>) -> rusqlite::Result<Camera> {
    let id_str: String = row.get(0)?;
    let user_id: String = row.get(1)?;
    let camera_name: String = row.get(2)?;
    let ip_address: String = row.get(3)?;
    let created_str: String = row.get(4)?;

    Ok(Camera {
        id: CameraId(parse_uuid(0, &id_str)?),
        user_id: UserId(user_id),
        camera_name,
        ip_address,
        created_at: parse_ts(4, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn camera(owner: &str, name: &str, age_secs: i64) -> Camera {
        Camera {
            id: CameraId::new(),
            user_id: UserId::new(owner),
            camera_name: name.to_string(),
            ip_address: "192.168.1.20:8080".to_string(),
            created_at: Utc::now() - Duration::seconds(age_secs),
        }
    }

    #[test]
    fn list_is_newest_first_and_owner_scoped() {
        let db = Database::open_in_memory().unwrap();
        let old = camera("u1", "Garage", 60);
        let new = camera("u1", "Porch", 1);
        let other = camera("u2", "Shed", 5);
        for c in [&old, &new, &other] {
            db.insert_camera(c).unwrap();
        }

        let listed = db
            .list_cameras(Some(&Filter::Owner(UserId::new("u1"))), Order::NewestFirst)
            .unwrap();
        let names: Vec<_> = listed.iter().map(|c| c.camera_name.as_str()).collect();
        assert_eq!(names, ["Porch", "Garage"]);

        let by_id = db.list_cameras(Some(&Filter::Camera(other.id)), Order::NewestFirst).unwrap();
        assert_eq!(by_id, vec![other]);
    }

    #[test]
    fn delete_reports_whether_a_row_went_away() {
        let db = Database::open_in_memory().unwrap();
        let c = camera("u1", "Porch", 0);
        db.insert_camera(&c).unwrap();

        assert!(db.delete_camera(c.id).unwrap());
        assert!(!db.delete_camera(c.id).unwrap());
        assert!(matches!(db.get_camera(c.id), Err(StoreError::NotFound)));
    }
}
