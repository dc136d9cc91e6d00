use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use setu_core::Clock;
use setu_core::model::{Enrollment, LearnerId, McqAttempt, QuestionId};
use storage::repository::{
    AttemptRepository, CourseRepository, EnrollmentRepository, NewEnrollmentRecord,
    ProgressRepository, QuestionRepository, StorageError,
};

use crate::error::{DomainError, EnrollError, ValidationError};
use crate::view::{CourseState, LessonStateView, MasterySnapshot, QuestionState, ResourceView};

/// Course sign-up plus the initial-state payload.
pub struct EnrollmentService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
    questions: Arc<dyn QuestionRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    progress: Arc<dyn ProgressRepository>,
    attempts: Arc<dyn AttemptRepository>,
}

impl EnrollmentService {
    #[must_use]
    pub fn new(
        clock: Clock,
        courses: Arc<dyn CourseRepository>,
        questions: Arc<dyn QuestionRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        progress: Arc<dyn ProgressRepository>,
        attempts: Arc<dyn AttemptRepository>,
    ) -> Self {
        Self {
            clock,
            courses,
            questions,
            enrollments,
            progress,
            attempts,
        }
    }

    /// Enroll a learner in a course, with zeroed scores.
    ///
    /// # Errors
    ///
    /// `ValidationError::CourseNotFound` for an unknown slug,
    /// `DomainError::AlreadyEnrolled` for a duplicate sign-up.
    pub async fn enroll(
        &self,
        learner_id: LearnerId,
        course_slug: &str,
    ) -> Result<Enrollment, EnrollError> {
        let course = match self.courses.get_course_by_slug(course_slug).await {
            Ok(course) => course,
            Err(StorageError::NotFound) => {
                return Err(ValidationError::CourseNotFound(course_slug.to_owned()).into());
            }
            Err(err) => return Err(err.into()),
        };

        let enrolled_at = self.clock.now();
        let id = match self
            .enrollments
            .insert_enrollment(NewEnrollmentRecord {
                learner_id,
                course_id: course.id(),
                enrolled_at,
            })
            .await
        {
            Ok(id) => id,
            Err(StorageError::Conflict) => {
                return Err(DomainError::AlreadyEnrolled(course_slug.to_owned()).into());
            }
            Err(err) => return Err(err.into()),
        };

        info!(learner = %learner_id, course = %course_slug, enrollment = %id, "enrolled");
        Ok(Enrollment::new(id, learner_id, course.id(), enrolled_at))
    }

    /// Assemble the initial-state payload for an enrolled course.
    ///
    /// One structured snapshot the client fetches on load: lessons with
    /// watch state and resources, questions with the learner's grading where
    /// answered, and the score snapshot. Correct options stay hidden for
    /// unanswered questions.
    ///
    /// # Errors
    ///
    /// `ValidationError` for an unknown course or unenrolled learner,
    /// `StorageError` on load failure.
    pub async fn course_state(
        &self,
        learner_id: LearnerId,
        course_slug: &str,
    ) -> Result<CourseState, EnrollError> {
        let course = match self.courses.get_course_by_slug(course_slug).await {
            Ok(course) => course,
            Err(StorageError::NotFound) => {
                return Err(ValidationError::CourseNotFound(course_slug.to_owned()).into());
            }
            Err(err) => return Err(err.into()),
        };

        let enrollment = match self.enrollments.get_enrollment(learner_id, course.id()).await {
            Ok(enrollment) => enrollment,
            Err(StorageError::NotFound) => {
                return Err(ValidationError::NotEnrolled {
                    learner_id,
                    course_slug: course_slug.to_owned(),
                }
                .into());
            }
            Err(err) => return Err(err.into()),
        };

        let attempts: HashMap<QuestionId, McqAttempt> = self
            .attempts
            .attempts_for_enrollment(enrollment.id())
            .await?
            .into_iter()
            .map(|a| (a.question_id(), a))
            .collect();

        let lessons = self.courses.lessons_for_course(course.id()).await?;
        let mut lesson_views = Vec::with_capacity(lessons.len());
        for lesson in &lessons {
            let record = self.progress.get_progress(enrollment.id(), lesson.id()).await?;

            let resources = self
                .courses
                .resources_for_lesson(lesson.id())
                .await?
                .iter()
                .map(ResourceView::of)
                .collect();

            let questions = self
                .questions
                .questions_for_lesson(lesson.id())
                .await?
                .iter()
                .map(|q| QuestionState::of(q, attempts.get(&q.id())))
                .collect();

            lesson_views.push(LessonStateView::of(
                lesson,
                record.as_ref(),
                resources,
                questions,
            ));
        }

        Ok(CourseState {
            course_slug: course.slug().to_owned(),
            course_title: course.title().to_owned(),
            level: course.level().as_str().to_owned(),
            description: course.description().map(str::to_owned),
            lessons: lesson_views,
            snapshot: MasterySnapshot::of(&enrollment),
        })
    }
}
