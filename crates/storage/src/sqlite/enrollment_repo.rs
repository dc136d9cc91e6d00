use setu_core::model::{CourseId, Enrollment, EnrollmentId, LearnerId, LessonProgress, McqAttempt};

use super::{
    SqliteRepository,
    mapping::{id_i64, map_enrollment_row},
};
use crate::repository::{
    EnrollmentPersistence, EnrollmentRepository, NewEnrollmentRecord, StorageError,
};

fn conn_err(e: sqlx::Error) -> StorageError {
    match e.as_database_error() {
        Some(db) if db.is_unique_violation() => StorageError::Conflict,
        _ => StorageError::Connection(e.to_string()),
    }
}

/// Score columns are overwritten; the two latches and `completed_at` are
/// guarded so a stale writer can never revoke them.
const UPDATE_ENROLLMENT_SQL: &str = r"
    UPDATE enrollments SET
        unit_progress = ?2,
        quiz_score = ?3,
        mastery_score = ?4,
        certificate_unlocked = MAX(certificate_unlocked, ?5),
        is_completed = MAX(is_completed, ?6),
        completed_at = COALESCE(completed_at, ?7)
    WHERE id = ?1
";

// All binds are owned, so the returned query borrows nothing from the
// enrollment.
fn bind_enrollment_update<'q>(
    enrollment: &Enrollment,
) -> Result<sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>, StorageError>
{
    Ok(sqlx::query(UPDATE_ENROLLMENT_SQL)
        .bind(id_i64("enrollment_id", enrollment.id().value())?)
        .bind(i64::from(enrollment.unit_progress()))
        .bind(i64::from(enrollment.quiz_score()))
        .bind(i64::from(enrollment.mastery_score()))
        .bind(enrollment.certificate_unlocked())
        .bind(enrollment.is_completed())
        .bind(enrollment.completed_at()))
}

#[async_trait::async_trait]
impl EnrollmentRepository for SqliteRepository {
    async fn insert_enrollment(
        &self,
        record: NewEnrollmentRecord,
    ) -> Result<EnrollmentId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO enrollments (
                learner_id, course_id, enrolled_at,
                unit_progress, quiz_score, mastery_score,
                certificate_unlocked, is_completed, completed_at
            )
            VALUES (?1, ?2, ?3, 0, 0, 0, 0, 0, NULL)
            ",
        )
        .bind(id_i64("learner_id", record.learner_id.value())?)
        .bind(id_i64("course_id", record.course_id.value())?)
        .bind(record.enrolled_at)
        .execute(&self.pool)
        .await
        .map_err(conn_err)?;

        let id = u64::try_from(res.last_insert_rowid())
            .map_err(|_| StorageError::Serialization("enrollment rowid overflow".into()))?;
        Ok(EnrollmentId::new(id))
    }

    async fn get_enrollment(
        &self,
        learner_id: LearnerId,
        course_id: CourseId,
    ) -> Result<Enrollment, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, learner_id, course_id, enrolled_at,
                   unit_progress, quiz_score, mastery_score,
                   certificate_unlocked, is_completed, completed_at
            FROM enrollments
            WHERE learner_id = ?1 AND course_id = ?2
            ",
        )
        .bind(id_i64("learner_id", learner_id.value())?)
        .bind(id_i64("course_id", course_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn_err)?
        .ok_or(StorageError::NotFound)?;

        map_enrollment_row(&row)
    }

    async fn update_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError> {
        let res = bind_enrollment_update(enrollment)?
            .execute(&self.pool)
            .await
            .map_err(conn_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl EnrollmentPersistence for SqliteRepository {
    async fn apply_heartbeat(
        &self,
        enrollment: &Enrollment,
        progress: &LessonProgress,
    ) -> Result<(), StorageError> {
        if progress.enrollment_id() != enrollment.id() {
            return Err(StorageError::Conflict);
        }

        let mut tx = self.pool.begin().await.map_err(conn_err)?;

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
        .execute(&mut *tx)
        .await
        .map_err(conn_err)?;

        let res = bind_enrollment_update(enrollment)?
            .execute(&mut *tx)
            .await
            .map_err(conn_err)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        tx.commit().await.map_err(conn_err)?;
        Ok(())
    }

    async fn apply_attempt(
        &self,
        enrollment: &Enrollment,
        attempt: &McqAttempt,
    ) -> Result<(), StorageError> {
        if attempt.enrollment_id() != enrollment.id() {
            return Err(StorageError::Conflict);
        }

        let mut tx = self.pool.begin().await.map_err(conn_err)?;

        sqlx::query(
            r"
            INSERT INTO mcq_attempts (
                enrollment_id, question_id, selected_option, is_correct, attempted_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(enrollment_id, question_id) DO UPDATE SET
                -- last answer wins
                selected_option = excluded.selected_option,
                is_correct = excluded.is_correct,
                attempted_at = excluded.attempted_at
            ",
        )
        .bind(id_i64("enrollment_id", attempt.enrollment_id().value())?)
        .bind(id_i64("question_id", attempt.question_id().value())?)
        .bind(attempt.selected().as_str())
        .bind(attempt.is_correct())
        .bind(attempt.attempted_at())
        .execute(&mut *tx)
        .await
        .map_err(conn_err)?;

        let res = bind_enrollment_update(enrollment)?
            .execute(&mut *tx)
            .await
            .map_err(conn_err)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        tx.commit().await.map_err(conn_err)?;
        Ok(())
    }
}
