//! Shared error types for the services crate.
//!
//! Three tiers: `ValidationError` for malformed or unauthorized requests
//! (the web layer maps these to 4xx), `DomainError` for legal requests that
//! hit a business rule (delivered as a `success: false` envelope), and
//! `StorageError` for persistence failures (5xx, never swallowed).

use thiserror::Error;

use setu_core::model::{CertificateError, LearnerId, LessonId, QuestionId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Request is malformed or refers to entities that do not exist or do not
/// belong together. No state is mutated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("course not found: {0}")]
    CourseNotFound(String),

    #[error("lesson {lesson_id} not found in course {course_slug}")]
    LessonNotFound {
        course_slug: String,
        lesson_id: LessonId,
    },

    #[error("question not found: {0}")]
    QuestionNotFound(QuestionId),

    #[error("question {question_id} does not belong to lesson {lesson_id}")]
    QuestionNotInLesson {
        lesson_id: LessonId,
        question_id: QuestionId,
    },

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("learner {learner_id} is not enrolled in course {course_slug}")]
    NotEnrolled {
        learner_id: LearnerId,
        course_slug: String,
    },
}

/// Legal request that violates a business rule. No state is mutated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DomainError {
    #[error("lesson {0} has no duration set")]
    LessonWithoutDuration(LessonId),

    #[error("already enrolled in course {0}")]
    AlreadyEnrolled(String),

    #[error("certificate is not yet earned for course {0}")]
    CertificateNotEarned(String),
}

/// Errors emitted by `LessonWatchService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LessonWatchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QuizAnswerService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizAnswerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `EnrollmentService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EnrollError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CertificateService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CertificateServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Certificate(#[from] CertificateError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
