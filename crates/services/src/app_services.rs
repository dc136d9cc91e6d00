use std::sync::Arc;

use setu_core::Clock;
use storage::repository::Storage;

use crate::certificate_service::CertificateService;
use crate::enrollment_service::EnrollmentService;
use crate::error::AppServicesError;
use crate::mastery_service::MasteryService;
use crate::quiz_service::QuizAnswerService;
use crate::watch_service::LessonWatchService;

/// Assembles the handler services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    enrollment: Arc<EnrollmentService>,
    watch: Arc<LessonWatchService>,
    quiz: Arc<QuizAnswerService>,
    certificates: Arc<CertificateService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::with_storage(&storage, clock))
    }

    /// Build services over an existing storage aggregate (any backend).
    #[must_use]
    pub fn with_storage(storage: &Storage, clock: Clock) -> Self {
        let mastery = || {
            MasteryService::new(
                Arc::clone(&storage.courses),
                Arc::clone(&storage.progress),
                Arc::clone(&storage.attempts),
            )
        };

        let enrollment = Arc::new(EnrollmentService::new(
            clock,
            Arc::clone(&storage.courses),
            Arc::clone(&storage.questions),
            Arc::clone(&storage.enrollments),
            Arc::clone(&storage.progress),
            Arc::clone(&storage.attempts),
        ));
        let watch = Arc::new(LessonWatchService::new(
            clock,
            Arc::clone(&storage.courses),
            Arc::clone(&storage.enrollments),
            Arc::clone(&storage.progress),
            Arc::clone(&storage.enrollment_writes),
            mastery(),
        ));
        let quiz = Arc::new(QuizAnswerService::new(
            clock,
            Arc::clone(&storage.courses),
            Arc::clone(&storage.questions),
            Arc::clone(&storage.enrollments),
            Arc::clone(&storage.enrollment_writes),
            mastery(),
        ));
        let certificates = Arc::new(CertificateService::new(
            clock,
            Arc::clone(&storage.courses),
            Arc::clone(&storage.enrollments),
            Arc::clone(&storage.certificates),
        ));

        Self {
            enrollment,
            watch,
            quiz,
            certificates,
        }
    }

    #[must_use]
    pub fn enrollment(&self) -> Arc<EnrollmentService> {
        Arc::clone(&self.enrollment)
    }

    #[must_use]
    pub fn watch(&self) -> Arc<LessonWatchService> {
        Arc::clone(&self.watch)
    }

    #[must_use]
    pub fn quiz(&self) -> Arc<QuizAnswerService> {
        Arc::clone(&self.quiz)
    }

    #[must_use]
    pub fn certificates(&self) -> Arc<CertificateService> {
        Arc::clone(&self.certificates)
    }
}
