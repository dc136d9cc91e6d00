use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use setu_core::model::{
    Certificate, Course, CourseId, Enrollment, EnrollmentId, LearnerId, Lesson, LessonId,
    LessonProgress, LessonResource, McqAttempt, McqQuestion, QuestionId, ResourceId,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Insert shape for a new enrollment; the backend assigns the id.
#[derive(Debug, Clone)]
pub struct NewEnrollmentRecord {
    pub learner_id: LearnerId,
    pub course_id: CourseId,
    pub enrolled_at: DateTime<Utc>,
}

//
// ─── REPOSITORY CONTRACTS ──────────────────────────────────────────────────────
//

/// Repository contract for courses, their lessons, and lesson resources.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Persist or update a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError>;

    /// Fetch a course by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_course(&self, id: CourseId) -> Result<Course, StorageError>;

    /// Fetch a course by its unique slug.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_course_by_slug(&self, slug: &str) -> Result<Course, StorageError>;

    /// Persist or update a lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lesson cannot be stored.
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError>;

    /// Fetch a lesson by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_lesson(&self, id: LessonId) -> Result<Lesson, StorageError>;

    /// All lessons of a course, ordered by position.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn lessons_for_course(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError>;

    /// Persist or update a lesson resource.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the resource cannot be stored.
    async fn upsert_resource(&self, resource: &LessonResource) -> Result<(), StorageError>;

    /// All resources of a lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn resources_for_lesson(
        &self,
        lesson_id: LessonId,
    ) -> Result<Vec<LessonResource>, StorageError>;
}

/// Repository contract for MCQ questions.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Persist or update a question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(&self, question: &McqQuestion) -> Result<(), StorageError>;

    /// Fetch a question by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_question(&self, id: QuestionId) -> Result<McqQuestion, StorageError>;

    /// All questions of a lesson, ordered by position.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn questions_for_lesson(
        &self,
        lesson_id: LessonId,
    ) -> Result<Vec<McqQuestion>, StorageError>;
}

/// Repository contract for enrollments.
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Insert a new enrollment and return the assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the learner is already enrolled
    /// in the course.
    async fn insert_enrollment(
        &self,
        record: NewEnrollmentRecord,
    ) -> Result<EnrollmentId, StorageError>;

    /// Fetch the enrollment tying a learner to a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the learner is not enrolled.
    async fn get_enrollment(
        &self,
        learner_id: LearnerId,
        course_id: CourseId,
    ) -> Result<Enrollment, StorageError>;

    /// Persist updated enrollment state.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn update_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError>;
}

/// Repository contract for per-lesson watch records.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch one progress record, if the lesson has been started.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn get_progress(
        &self,
        enrollment_id: EnrollmentId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError>;

    /// All progress records of an enrollment.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn progress_for_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Vec<LessonProgress>, StorageError>;

    /// Persist or update a progress record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn upsert_progress(&self, progress: &LessonProgress) -> Result<(), StorageError>;
}

/// Repository contract for MCQ attempts.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Fetch the learner's attempt for one question, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn get_attempt(
        &self,
        enrollment_id: EnrollmentId,
        question_id: QuestionId,
    ) -> Result<Option<McqAttempt>, StorageError>;

    /// All attempts of an enrollment (one per answered question).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn attempts_for_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Vec<McqAttempt>, StorageError>;

    /// Persist an attempt; a prior attempt for the same question is
    /// overwritten (last answer wins).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn upsert_attempt(&self, attempt: &McqAttempt) -> Result<(), StorageError>;
}

/// Atomic write paths for the two handler mutations.
///
/// Each call commits the base-table row and the recomputed enrollment in a
/// single transaction so no reader ever observes one without the other, and
/// a failure leaves both untouched.
#[async_trait]
pub trait EnrollmentPersistence: Send + Sync {
    /// Persist a heartbeat: the progress record plus the enrollment.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the record does not belong to the
    /// enrollment, or storage errors on failure.
    async fn apply_heartbeat(
        &self,
        enrollment: &Enrollment,
        progress: &LessonProgress,
    ) -> Result<(), StorageError>;

    /// Persist an answer: the attempt row plus the enrollment.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the attempt does not belong to
    /// the enrollment, or storage errors on failure.
    async fn apply_attempt(
        &self,
        enrollment: &Enrollment,
        attempt: &McqAttempt,
    ) -> Result<(), StorageError>;
}

/// Repository contract for issued certificates.
#[async_trait]
pub trait CertificateRepository: Send + Sync {
    /// Insert a freshly issued certificate.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the enrollment already has one.
    async fn insert_certificate(&self, certificate: &Certificate) -> Result<(), StorageError>;

    /// The certificate issued for an enrollment, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn certificate_for_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Option<Certificate>, StorageError>;

    /// Public verification lookup by certificate id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn find_by_public_id(
        &self,
        certificate_id: &str,
    ) -> Result<Option<Certificate>, StorageError>;
}

//
// ─── IN-MEMORY IMPLEMENTATION ──────────────────────────────────────────────────
//

#[derive(Default)]
struct InMemoryState {
    courses: HashMap<CourseId, Course>,
    lessons: HashMap<LessonId, Lesson>,
    resources: HashMap<ResourceId, LessonResource>,
    questions: HashMap<QuestionId, McqQuestion>,
    enrollments: HashMap<EnrollmentId, Enrollment>,
    next_enrollment_id: u64,
    progress: HashMap<(EnrollmentId, LessonId), LessonProgress>,
    attempts: HashMap<(EnrollmentId, QuestionId), McqAttempt>,
    certificates: HashMap<String, Certificate>,
}

/// In-memory repository for tests and prototyping.
///
/// A single mutex guards all state, which also serializes per-enrollment
/// read-modify-write the way the SQLite backend's transactions do.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, InMemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        self.lock()?.courses.insert(course.id(), course.clone());
        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Course, StorageError> {
        self.lock()?
            .courses
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn get_course_by_slug(&self, slug: &str) -> Result<Course, StorageError> {
        self.lock()?
            .courses
            .values()
            .find(|c| c.slug() == slug)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        self.lock()?.lessons.insert(lesson.id(), lesson.clone());
        Ok(())
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Lesson, StorageError> {
        self.lock()?
            .lessons
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn lessons_for_course(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError> {
        let mut lessons: Vec<Lesson> = self
            .lock()?
            .lessons
            .values()
            .filter(|l| l.course_id() == course_id)
            .cloned()
            .collect();
        lessons.sort_by_key(Lesson::position);
        Ok(lessons)
    }

    async fn upsert_resource(&self, resource: &LessonResource) -> Result<(), StorageError> {
        self.lock()?
            .resources
            .insert(resource.id(), resource.clone());
        Ok(())
    }

    async fn resources_for_lesson(
        &self,
        lesson_id: LessonId,
    ) -> Result<Vec<LessonResource>, StorageError> {
        let mut resources: Vec<LessonResource> = self
            .lock()?
            .resources
            .values()
            .filter(|r| r.lesson_id() == lesson_id)
            .cloned()
            .collect();
        resources.sort_by_key(LessonResource::id);
        Ok(resources)
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn upsert_question(&self, question: &McqQuestion) -> Result<(), StorageError> {
        self.lock()?
            .questions
            .insert(question.id(), question.clone());
        Ok(())
    }

    async fn get_question(&self, id: QuestionId) -> Result<McqQuestion, StorageError> {
        self.lock()?
            .questions
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn questions_for_lesson(
        &self,
        lesson_id: LessonId,
    ) -> Result<Vec<McqQuestion>, StorageError> {
        let mut questions: Vec<McqQuestion> = self
            .lock()?
            .questions
            .values()
            .filter(|q| q.lesson_id() == lesson_id)
            .cloned()
            .collect();
        questions.sort_by_key(McqQuestion::position);
        Ok(questions)
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryRepository {
    async fn insert_enrollment(
        &self,
        record: NewEnrollmentRecord,
    ) -> Result<EnrollmentId, StorageError> {
        let mut state = self.lock()?;
        let exists = state
            .enrollments
            .values()
            .any(|e| e.learner_id() == record.learner_id && e.course_id() == record.course_id);
        if exists {
            return Err(StorageError::Conflict);
        }

        state.next_enrollment_id += 1;
        let id = EnrollmentId::new(state.next_enrollment_id);
        let enrollment = Enrollment::new(id, record.learner_id, record.course_id, record.enrolled_at);
        state.enrollments.insert(id, enrollment);
        Ok(id)
    }

    async fn get_enrollment(
        &self,
        learner_id: LearnerId,
        course_id: CourseId,
    ) -> Result<Enrollment, StorageError> {
        self.lock()?
            .enrollments
            .values()
            .find(|e| e.learner_id() == learner_id && e.course_id() == course_id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn update_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        if !state.enrollments.contains_key(&enrollment.id()) {
            return Err(StorageError::NotFound);
        }
        state.enrollments.insert(enrollment.id(), enrollment.clone());
        Ok(())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(
        &self,
        enrollment_id: EnrollmentId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError> {
        Ok(self.lock()?.progress.get(&(enrollment_id, lesson_id)).cloned())
    }

    async fn progress_for_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Vec<LessonProgress>, StorageError> {
        let mut records: Vec<LessonProgress> = self
            .lock()?
            .progress
            .values()
            .filter(|p| p.enrollment_id() == enrollment_id)
            .cloned()
            .collect();
        records.sort_by_key(LessonProgress::lesson_id);
        Ok(records)
    }

    async fn upsert_progress(&self, progress: &LessonProgress) -> Result<(), StorageError> {
        self.lock()?.progress.insert(
            (progress.enrollment_id(), progress.lesson_id()),
            progress.clone(),
        );
        Ok(())
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn get_attempt(
        &self,
        enrollment_id: EnrollmentId,
        question_id: QuestionId,
    ) -> Result<Option<McqAttempt>, StorageError> {
        Ok(self.lock()?.attempts.get(&(enrollment_id, question_id)).cloned())
    }

    async fn attempts_for_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Vec<McqAttempt>, StorageError> {
        let mut attempts: Vec<McqAttempt> = self
            .lock()?
            .attempts
            .values()
            .filter(|a| a.enrollment_id() == enrollment_id)
            .cloned()
            .collect();
        attempts.sort_by_key(McqAttempt::question_id);
        Ok(attempts)
    }

    async fn upsert_attempt(&self, attempt: &McqAttempt) -> Result<(), StorageError> {
        self.lock()?.attempts.insert(
            (attempt.enrollment_id(), attempt.question_id()),
            attempt.clone(),
        );
        Ok(())
    }
}

#[async_trait]
impl EnrollmentPersistence for InMemoryRepository {
    async fn apply_heartbeat(
        &self,
        enrollment: &Enrollment,
        progress: &LessonProgress,
    ) -> Result<(), StorageError> {
        if progress.enrollment_id() != enrollment.id() {
            return Err(StorageError::Conflict);
        }

        // One lock for both writes keeps the pair atomic.
        let mut state = self.lock()?;
        if !state.enrollments.contains_key(&enrollment.id()) {
            return Err(StorageError::NotFound);
        }
        state.enrollments.insert(enrollment.id(), enrollment.clone());
        state.progress.insert(
            (progress.enrollment_id(), progress.lesson_id()),
            progress.clone(),
        );
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

        let mut state = self.lock()?;
        if !state.enrollments.contains_key(&enrollment.id()) {
            return Err(StorageError::NotFound);
        }
        state.enrollments.insert(enrollment.id(), enrollment.clone());
        state.attempts.insert(
            (attempt.enrollment_id(), attempt.question_id()),
            attempt.clone(),
        );
        Ok(())
    }
}

#[async_trait]
impl CertificateRepository for InMemoryRepository {
    async fn insert_certificate(&self, certificate: &Certificate) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let exists = state
            .certificates
            .values()
            .any(|c| c.enrollment_id() == certificate.enrollment_id());
        if exists || state.certificates.contains_key(certificate.certificate_id()) {
            return Err(StorageError::Conflict);
        }
        state
            .certificates
            .insert(certificate.certificate_id().to_owned(), certificate.clone());
        Ok(())
    }

    async fn certificate_for_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Option<Certificate>, StorageError> {
        Ok(self
            .lock()?
            .certificates
            .values()
            .find(|c| c.enrollment_id() == enrollment_id)
            .cloned())
    }

    async fn find_by_public_id(
        &self,
        certificate_id: &str,
    ) -> Result<Option<Certificate>, StorageError> {
        Ok(self.lock()?.certificates.get(certificate_id).cloned())
    }
}

//
// ─── STORAGE AGGREGATE ─────────────────────────────────────────────────────────
//

/// Aggregates the repositories behind trait objects for easy backend
/// swapping.
#[derive(Clone)]
pub struct Storage {
    pub courses: Arc<dyn CourseRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
    pub enrollment_writes: Arc<dyn EnrollmentPersistence>,
    pub certificates: Arc<dyn CertificateRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_parts(InMemoryRepository::new())
    }

    pub(crate) fn from_parts<R>(repo: R) -> Self
    where
        R: CourseRepository
            + QuestionRepository
            + EnrollmentRepository
            + ProgressRepository
            + AttemptRepository
            + EnrollmentPersistence
            + CertificateRepository
            + Clone
            + 'static,
    {
        Self {
            courses: Arc::new(repo.clone()),
            questions: Arc::new(repo.clone()),
            enrollments: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            attempts: Arc::new(repo.clone()),
            enrollment_writes: Arc::new(repo.clone()),
            certificates: Arc::new(repo),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use setu_core::model::CourseLevel;
    use setu_core::time::fixed_now;

    fn build_course(id: u64, slug: &str) -> Course {
        Course::new(
            CourseId::new(id),
            slug,
            format!("Course {id}"),
            None,
            CourseLevel::Beginner,
            None,
            fixed_now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn course_round_trips_by_id_and_slug() {
        let repo = InMemoryRepository::new();
        let course = build_course(1, "rust-basics");
        repo.upsert_course(&course).await.unwrap();

        assert_eq!(repo.get_course(course.id()).await.unwrap(), course);
        assert_eq!(
            repo.get_course_by_slug("rust-basics").await.unwrap(),
            course
        );
        assert!(matches!(
            repo.get_course_by_slug("missing").await.unwrap_err(),
            StorageError::NotFound
        ));
    }

    #[tokio::test]
    async fn enrollment_insert_rejects_duplicates() {
        let repo = InMemoryRepository::new();
        let record = NewEnrollmentRecord {
            learner_id: LearnerId::new(1),
            course_id: CourseId::new(1),
            enrolled_at: fixed_now(),
        };

        let id = repo.insert_enrollment(record.clone()).await.unwrap();
        assert_eq!(id, EnrollmentId::new(1));

        assert!(matches!(
            repo.insert_enrollment(record).await.unwrap_err(),
            StorageError::Conflict
        ));
    }

    #[tokio::test]
    async fn apply_heartbeat_rejects_foreign_progress() {
        let repo = InMemoryRepository::new();
        let id = repo
            .insert_enrollment(NewEnrollmentRecord {
                learner_id: LearnerId::new(1),
                course_id: CourseId::new(1),
                enrolled_at: fixed_now(),
            })
            .await
            .unwrap();
        let enrollment = repo
            .get_enrollment(LearnerId::new(1), CourseId::new(1))
            .await
            .unwrap();

        let foreign = LessonProgress::start(EnrollmentId::new(99), LessonId::new(1), fixed_now());
        assert!(matches!(
            repo.apply_heartbeat(&enrollment, &foreign).await.unwrap_err(),
            StorageError::Conflict
        ));

        let mine = LessonProgress::start(id, LessonId::new(1), fixed_now());
        repo.apply_heartbeat(&enrollment, &mine).await.unwrap();
        assert!(repo.get_progress(id, LessonId::new(1)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn certificate_unique_per_enrollment() {
        let repo = InMemoryRepository::new();
        let cert = Certificate::from_persisted(
            "SS-DEADBEEF-1".into(),
            EnrollmentId::new(1),
            "Asha".into(),
            "Rust Basics".into(),
            90,
            fixed_now(),
        );
        repo.insert_certificate(&cert).await.unwrap();

        let again = Certificate::from_persisted(
            "SS-CAFEBABE-1".into(),
            EnrollmentId::new(1),
            "Asha".into(),
            "Rust Basics".into(),
            95,
            fixed_now(),
        );
        assert!(matches!(
            repo.insert_certificate(&again).await.unwrap_err(),
            StorageError::Conflict
        ));

        let found = repo.find_by_public_id("SS-DEADBEEF-1").await.unwrap();
        assert_eq!(found.unwrap().final_score(), 90);
    }
}
