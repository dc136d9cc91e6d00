use setu_core::model::{Course, CourseId, Lesson, LessonId, LessonResource};

use super::{
    SqliteRepository,
    mapping::{id_i64, map_course_row, map_lesson_row, map_resource_row},
};
use crate::repository::{CourseRepository, StorageError};

fn conn_err(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl CourseRepository for SqliteRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO courses (id, slug, title, description, level, thumbnail_url, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                -- keep created_at from the original insert; only update mutable fields
                slug = excluded.slug,
                title = excluded.title,
                description = excluded.description,
                level = excluded.level,
                thumbnail_url = excluded.thumbnail_url
            ",
        )
        .bind(id_i64("course_id", course.id().value())?)
        .bind(course.slug())
        .bind(course.title())
        .bind(course.description())
        .bind(course.level().as_str())
        .bind(course.thumbnail_url().map(|u| u.as_str()))
        .bind(course.created_at())
        .execute(&self.pool)
        .await
        .map_err(conn_err)?;

        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Course, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, slug, title, description, level, thumbnail_url, created_at
            FROM courses
            WHERE id = ?1
            ",
        )
        .bind(id_i64("course_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn_err)?
        .ok_or(StorageError::NotFound)?;

        map_course_row(&row)
    }

    async fn get_course_by_slug(&self, slug: &str) -> Result<Course, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, slug, title, description, level, thumbnail_url, created_at
            FROM courses
            WHERE slug = ?1
            ",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn_err)?
        .ok_or(StorageError::NotFound)?;

        map_course_row(&row)
    }

    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO lessons (
                id, course_id, title, description, position, duration_secs,
                video_id, is_preview, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                position = excluded.position,
                duration_secs = excluded.duration_secs,
                video_id = excluded.video_id,
                is_preview = excluded.is_preview
            ",
        )
        .bind(id_i64("lesson_id", lesson.id().value())?)
        .bind(id_i64("course_id", lesson.course_id().value())?)
        .bind(lesson.title())
        .bind(lesson.description())
        .bind(i64::from(lesson.position()))
        .bind(i64::from(lesson.duration_secs()))
        .bind(lesson.video_id().map(setu_core::model::VideoId::as_str))
        .bind(lesson.is_preview())
        .bind(lesson.created_at())
        .execute(&self.pool)
        .await
        .map_err(conn_err)?;

        Ok(())
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Lesson, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, course_id, title, description, position, duration_secs,
                   video_id, is_preview, created_at
            FROM lessons
            WHERE id = ?1
            ",
        )
        .bind(id_i64("lesson_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn_err)?
        .ok_or(StorageError::NotFound)?;

        map_lesson_row(&row)
    }

    async fn lessons_for_course(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, course_id, title, description, position, duration_secs,
                   video_id, is_preview, created_at
            FROM lessons
            WHERE course_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(id_i64("course_id", course_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn_err)?;

        let mut lessons = Vec::with_capacity(rows.len());
        for row in rows {
            lessons.push(map_lesson_row(&row)?);
        }
        Ok(lessons)
    }

    async fn upsert_resource(&self, resource: &LessonResource) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO lesson_resources (id, lesson_id, title, kind, url, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                kind = excluded.kind,
                url = excluded.url
            ",
        )
        .bind(id_i64("resource_id", resource.id().value())?)
        .bind(id_i64("lesson_id", resource.lesson_id().value())?)
        .bind(resource.title())
        .bind(resource.kind().as_str())
        .bind(resource.url().as_str())
        .bind(resource.created_at())
        .execute(&self.pool)
        .await
        .map_err(conn_err)?;

        Ok(())
    }

    async fn resources_for_lesson(
        &self,
        lesson_id: LessonId,
    ) -> Result<Vec<LessonResource>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, lesson_id, title, kind, url, created_at
            FROM lesson_resources
            WHERE lesson_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_i64("lesson_id", lesson_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn_err)?;

        let mut resources = Vec::with_capacity(rows.len());
        for row in rows {
            resources.push(map_resource_row(&row)?);
        }
        Ok(resources)
    }
}
