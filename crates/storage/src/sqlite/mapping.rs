use sqlx::Row;

use setu_core::model::{
    Certificate, Course, CourseId, CourseLevel, Enrollment, EnrollmentId, LearnerId, Lesson,
    LessonId, LessonProgress, LessonResource, McqAttempt, McqOption, McqQuestion, QuestionId,
    ResourceId, ResourceKind,
};

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn i64_to_u8(field: &'static str, v: i64) -> Result<u8, StorageError> {
    u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn course_id_from_i64(v: i64) -> Result<CourseId, StorageError> {
    Ok(CourseId::new(i64_to_u64("course_id", v)?))
}

pub(crate) fn lesson_id_from_i64(v: i64) -> Result<LessonId, StorageError> {
    Ok(LessonId::new(i64_to_u64("lesson_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn enrollment_id_from_i64(v: i64) -> Result<EnrollmentId, StorageError> {
    Ok(EnrollmentId::new(i64_to_u64("enrollment_id", v)?))
}

pub(crate) fn learner_id_from_i64(v: i64) -> Result<LearnerId, StorageError> {
    Ok(LearnerId::new(i64_to_u64("learner_id", v)?))
}

pub(crate) fn resource_id_from_i64(v: i64) -> Result<ResourceId, StorageError> {
    Ok(ResourceId::new(i64_to_u64("resource_id", v)?))
}

pub(crate) fn option_from_str(s: &str) -> Result<McqOption, StorageError> {
    McqOption::parse(s).map_err(ser)
}

pub(crate) fn map_course_row(row: &sqlx::sqlite::SqliteRow) -> Result<Course, StorageError> {
    let level_str: String = row.try_get("level").map_err(ser)?;
    let thumbnail: Option<String> = row.try_get("thumbnail_url").map_err(ser)?;

    Course::new(
        course_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("slug").map_err(ser)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<Option<String>, _>("description").map_err(ser)?,
        CourseLevel::parse(&level_str).map_err(ser)?,
        thumbnail.as_deref(),
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_lesson_row(row: &sqlx::sqlite::SqliteRow) -> Result<Lesson, StorageError> {
    let video: Option<String> = row.try_get("video_id").map_err(ser)?;

    Lesson::new(
        lesson_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<Option<String>, _>("description").map_err(ser)?,
        i64_to_u32("position", row.try_get::<i64, _>("position").map_err(ser)?)?,
        i64_to_u32(
            "duration_secs",
            row.try_get::<i64, _>("duration_secs").map_err(ser)?,
        )?,
        video.as_deref(),
        row.try_get::<bool, _>("is_preview").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_resource_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<LessonResource, StorageError> {
    let kind_str: String = row.try_get("kind").map_err(ser)?;
    let url: String = row.try_get("url").map_err(ser)?;

    LessonResource::new(
        resource_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        lesson_id_from_i64(row.try_get::<i64, _>("lesson_id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        ResourceKind::parse(&kind_str).map_err(ser)?,
        &url,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_question_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<McqQuestion, StorageError> {
    let correct: String = row.try_get("correct_option").map_err(ser)?;

    McqQuestion::new(
        question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        lesson_id_from_i64(row.try_get::<i64, _>("lesson_id").map_err(ser)?)?,
        row.try_get::<String, _>("question_text").map_err(ser)?,
        [
            row.try_get::<String, _>("option_a").map_err(ser)?,
            row.try_get::<String, _>("option_b").map_err(ser)?,
            row.try_get::<String, _>("option_c").map_err(ser)?,
            row.try_get::<String, _>("option_d").map_err(ser)?,
        ],
        option_from_str(&correct)?,
        row.try_get::<String, _>("explanation").map_err(ser)?,
        i64_to_u32("position", row.try_get::<i64, _>("position").map_err(ser)?)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_enrollment_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<Enrollment, StorageError> {
    Enrollment::from_persisted(
        enrollment_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        learner_id_from_i64(row.try_get::<i64, _>("learner_id").map_err(ser)?)?,
        course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?,
        row.try_get("enrolled_at").map_err(ser)?,
        i64_to_u8(
            "unit_progress",
            row.try_get::<i64, _>("unit_progress").map_err(ser)?,
        )?,
        i64_to_u8("quiz_score", row.try_get::<i64, _>("quiz_score").map_err(ser)?)?,
        i64_to_u8(
            "mastery_score",
            row.try_get::<i64, _>("mastery_score").map_err(ser)?,
        )?,
        row.try_get::<bool, _>("certificate_unlocked").map_err(ser)?,
        row.try_get::<bool, _>("is_completed").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_progress_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<LessonProgress, StorageError> {
    LessonProgress::from_persisted(
        enrollment_id_from_i64(row.try_get::<i64, _>("enrollment_id").map_err(ser)?)?,
        lesson_id_from_i64(row.try_get::<i64, _>("lesson_id").map_err(ser)?)?,
        i64_to_u32(
            "watch_time_secs",
            row.try_get::<i64, _>("watch_time_secs").map_err(ser)?,
        )?,
        i64_to_u32(
            "last_position_secs",
            row.try_get::<i64, _>("last_position_secs").map_err(ser)?,
        )?,
        row.try_get::<bool, _>("is_completed").map_err(ser)?,
        row.try_get("started_at").map_err(ser)?,
        row.try_get("last_heartbeat_at").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_attempt_row(row: &sqlx::sqlite::SqliteRow) -> Result<McqAttempt, StorageError> {
    let selected: String = row.try_get("selected_option").map_err(ser)?;

    Ok(McqAttempt::from_persisted(
        enrollment_id_from_i64(row.try_get::<i64, _>("enrollment_id").map_err(ser)?)?,
        question_id_from_i64(row.try_get::<i64, _>("question_id").map_err(ser)?)?,
        option_from_str(&selected)?,
        row.try_get::<bool, _>("is_correct").map_err(ser)?,
        row.try_get("attempted_at").map_err(ser)?,
    ))
}

pub(crate) fn map_certificate_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<Certificate, StorageError> {
    Ok(Certificate::from_persisted(
        row.try_get::<String, _>("certificate_id").map_err(ser)?,
        enrollment_id_from_i64(row.try_get::<i64, _>("enrollment_id").map_err(ser)?)?,
        row.try_get::<String, _>("student_name").map_err(ser)?,
        row.try_get::<String, _>("course_title").map_err(ser)?,
        i64_to_u8(
            "final_score",
            row.try_get::<i64, _>("final_score").map_err(ser)?,
        )?,
        row.try_get("issued_at").map_err(ser)?,
    ))
}
