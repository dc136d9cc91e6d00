use setu_core::model::{LessonId, McqQuestion, QuestionId};

use super::{
    SqliteRepository,
    mapping::{id_i64, map_question_row},
};
use crate::repository::{QuestionRepository, StorageError};

fn conn_err(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn upsert_question(&self, question: &McqQuestion) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO mcq_questions (
                id, lesson_id, question_text, option_a, option_b, option_c, option_d,
                correct_option, explanation, position, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(id) DO UPDATE SET
                question_text = excluded.question_text,
                option_a = excluded.option_a,
                option_b = excluded.option_b,
                option_c = excluded.option_c,
                option_d = excluded.option_d,
                correct_option = excluded.correct_option,
                explanation = excluded.explanation,
                position = excluded.position
            ",
        )
        .bind(id_i64("question_id", question.id().value())?)
        .bind(id_i64("lesson_id", question.lesson_id().value())?)
        .bind(question.text())
        .bind(question.option_text(setu_core::model::McqOption::A))
        .bind(question.option_text(setu_core::model::McqOption::B))
        .bind(question.option_text(setu_core::model::McqOption::C))
        .bind(question.option_text(setu_core::model::McqOption::D))
        .bind(question.correct_option().as_str())
        .bind(question.explanation())
        .bind(i64::from(question.position()))
        .bind(question.created_at())
        .execute(&self.pool)
        .await
        .map_err(conn_err)?;

        Ok(())
    }

    async fn get_question(&self, id: QuestionId) -> Result<McqQuestion, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, lesson_id, question_text, option_a, option_b, option_c, option_d,
                   correct_option, explanation, position, created_at
            FROM mcq_questions
            WHERE id = ?1
            ",
        )
        .bind(id_i64("question_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn_err)?
        .ok_or(StorageError::NotFound)?;

        map_question_row(&row)
    }

    async fn questions_for_lesson(
        &self,
        lesson_id: LessonId,
    ) -> Result<Vec<McqQuestion>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, lesson_id, question_text, option_a, option_b, option_c, option_d,
                   correct_option, explanation, position, created_at
            FROM mcq_questions
            WHERE lesson_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(id_i64("lesson_id", lesson_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn_err)?;

        let mut questions = Vec::with_capacity(rows.len());
        for row in rows {
            questions.push(map_question_row(&row)?);
        }
        Ok(questions)
    }
}
