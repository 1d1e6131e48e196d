//! CRUD operations for [`VideoAnalysisJob`] records.

use rusqlite::{params, params_from_iter};

use vigil_shared::types::{JobId, UserId};

use crate::database::{format_ts, not_found, parse_ts, parse_uuid, Database};
use crate::error::{Result, StoreError};
use crate::models::{AnalysisResults, JobStatus, VideoAnalysisJob};
use crate::query::Order;

impl Database {
    pub fn insert_analysis(&self, job: &VideoAnalysisJob) -> Result<()> {
        let results = job.results.as_ref().map(serde_json::to_string).transpose()?;
        self.conn().execute(
            "INSERT INTO video_analysis (id, user_id, video_url, status, results, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                job.id.to_string(),
                job.user_id.as_str(),
                job.video_url,
                job.status.as_str(),
                results,
                format_ts(&job.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_analysis(&self, id: JobId) -> Result<VideoAnalysisJob> {
        self.conn()
            .query_row(
                "SELECT id, user_id, video_url, status, results, created_at
                 FROM video_analysis WHERE id = ?1",
                params![id.to_string()],
                row_to_analysis,
            )
            .map_err(not_found)
    }

    pub fn list_analyses(&self, owner: Option<&UserId>, order: Order) -> Result<Vec<VideoAnalysisJob>> {
        let (clause, args): (&str, Vec<String>) = match owner {
            None => ("", Vec::new()),
            Some(user) => ("WHERE user_id = ?1", vec![user.0.clone()]),
        };
        let sql = format!(
            "SELECT id, user_id, video_url, status, results, created_at
             FROM video_analysis
             {clause}
             ORDER BY created_at {dir}, rowid {dir}",
            dir = order.sql(),
        );

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), row_to_analysis)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Overwrite status and results together.
    pub fn update_analysis(
        &self,
        id: JobId,
        status: JobStatus,
        results: Option<&AnalysisResults>,
    ) -> Result<bool> {
        let results = results.map(serde_json::to_string).transpose()?;
        let affected = self.conn().execute(
            "UPDATE video_analysis SET status = ?2, results = ?3 WHERE id = ?1",
            params![id.to_string(), status.as_str(), results],
        )?;
        Ok(affected > 0)
    }

    pub fn delete_analysis(&self, id: JobId) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM video_analysis WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(affected > 0)
    }
}

fn row_to_analysis(row: &rusqlite::Row<'_>) -> rusqlite::Result<VideoAnalysisJob> {
    let id_str: String = row.get(0)?;
    let user_id: String = row.get(1)?;
    let video_url: String = row.get(2)?;
    let status_str: String = row.get(3)?;
    let results_json: Option<String> = row.get(4)?;
    let created_str: String = row.get(5)?;

    let results = match results_json {
        Some(json) => Some(serde_json::from_str::<AnalysisResults>(&json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?),
        None => None,
    };

    Ok(VideoAnalysisJob {
        id: JobId(parse_uuid(0, &id_str)?),
        user_id: UserId(user_id),
        video_url,
        status: JobStatus::parse(&status_str),
        results,
        created_at: parse_ts(5, &created_str)?,
    })
}
