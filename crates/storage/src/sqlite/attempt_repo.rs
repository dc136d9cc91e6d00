use setu_core::model::{EnrollmentId, McqAttempt, QuestionId};

use super::{
    SqliteRepository,
    mapping::{id_i64, map_attempt_row},
};
use crate::repository::{AttemptRepository, StorageError};

fn conn_err(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn get_attempt(
        &self,
        enrollment_id: EnrollmentId,
        question_id: QuestionId,
    ) -> Result<Option<McqAttempt>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT enrollment_id, question_id, selected_option, is_correct, attempted_at
            FROM mcq_attempts
            WHERE enrollment_id = ?1 AND question_id = ?2
            ",
        )
        .bind(id_i64("enrollment_id", enrollment_id.value())?)
        .bind(id_i64("question_id", question_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn_err)?;

        row.map(|r| map_attempt_row(&r)).transpose()
    }

    async fn attempts_for_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Vec<McqAttempt>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT enrollment_id, question_id, selected_option, is_correct, attempted_at
            FROM mcq_attempts
            WHERE enrollment_id = ?1
            ORDER BY question_id ASC
            ",
        )
        .bind(id_i64("enrollment_id", enrollment_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn_err)?;

        let mut attempts = Vec::with_capacity(rows.len());
        for row in rows {
            attempts.push(map_attempt_row(&row)?);
        }
        Ok(attempts)
    }

    async fn upsert_attempt(&self, attempt: &McqAttempt) -> Result<(), StorageError> {
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
        .execute(&self.pool)
        .await
        .map_err(conn_err)?;

        Ok(())
    }
}
