use setu_core::model::{EnrollmentId, LessonId, LessonProgress};

use super::{
    SqliteRepository,
    mapping::{id_i64, map_progress_row},
};
use crate::repository::{ProgressRepository, StorageError};

fn conn_err(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_progress(
        &self,
        enrollment_id: EnrollmentId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT enrollment_id, lesson_id, watch_time_secs, last_position_secs,
                   is_completed, started_at, last_heartbeat_at, completed_at
            FROM lesson_progress
            WHERE enrollment_id = ?1 AND lesson_id = ?2
            ",
        )
        .bind(id_i64("enrollment_id", enrollment_id.value())?)
        .bind(id_i64("lesson_id", lesson_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn_err)?;

        row.map(|r| map_progress_row(&r)).transpose()
    }

    async fn progress_for_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Vec<LessonProgress>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT enrollment_id, lesson_id, watch_time_secs, last_position_secs,
                   is_completed, started_at, last_heartbeat_at, completed_at
            FROM lesson_progress
            WHERE enrollment_id = ?1
            ORDER BY lesson_id ASC
            ",
        )
        .bind(id_i64("enrollment_id", enrollment_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn_err)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(map_progress_row(&row)?);
        }
        Ok(records)
    }

    async fn upsert_progress(&self, progress: &LessonProgress) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO lesson_progress (
                enrollment_id, lesson_id, watch_time_secs, last_position_secs,
                is_completed, started_at, last_heartbeat_at, completed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(enrollment_id, lesson_id) DO UPDATE SET
                -- keep started_at from the original insert; watch time and the
                -- completion latch only ever move forward
                watch_time_secs = MAX(lesson_progress.watch_time_secs, excluded.watch_time_secs),
                last_position_secs = excluded.last_position_secs,
                is_completed = MAX(lesson_progress.is_completed, excluded.is_completed),
                last_heartbeat_at = excluded.last_heartbeat_at,
                completed_at = COALESCE(lesson_progress.completed_at, excluded.completed_at)
            ",
        )
        .bind(id_i64("enrollment_id", progress.enrollment_id().value())?)
        .bind(id_i64("lesson_id", progress.lesson_id().value())?)
        .bind(i64::from(progress.watch_time_secs()))
        .bind(i64::from(progress.last_position_secs()))
        .bind(progress.is_completed())
        .bind(progress.started_at())
        .bind(progress.last_heartbeat_at())
        .bind(progress.completed_at())
        .execute(&self.pool)
        .await
        .map_err(conn_err)?;

        Ok(())
    }
}
