use std::sync::Arc;

use tracing::{debug, info};

use setu_core::Clock;
use setu_core::model::{LearnerId, LessonId, McqAttempt, McqOption, QuestionId};
use storage::repository::{
    CourseRepository, EnrollmentPersistence, EnrollmentRepository, QuestionRepository,
    StorageError,
};

use crate::error::{QuizAnswerError, ValidationError};
use crate::mastery_service::MasteryService;
use crate::view::MasterySnapshot;

//
// ─── ANSWER OUTCOME ────────────────────────────────────────────────────────────
//

/// Result of grading one submitted answer.
///
/// The explanation is always included, for right and wrong answers alike;
/// it is only ever revealed here, after the answer landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub is_correct: bool,
    pub correct_option: McqOption,
    pub explanation: String,
    pub snapshot: MasterySnapshot,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Handles MCQ answer submissions: validation, grading, last-answer-wins
/// persistence, score recomputation.
pub struct QuizAnswerService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
    questions: Arc<dyn QuestionRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    writes: Arc<dyn EnrollmentPersistence>,
    mastery: MasteryService,
}

impl QuizAnswerService {
    #[must_use]
    pub fn new(
        clock: Clock,
        courses: Arc<dyn CourseRepository>,
        questions: Arc<dyn QuestionRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        writes: Arc<dyn EnrollmentPersistence>,
        mastery: MasteryService,
    ) -> Self {
        Self {
            clock,
            courses,
            questions,
            enrollments,
            writes,
            mastery,
        }
    }

    /// Grade and persist one submitted answer.
    ///
    /// Every validation runs before any mutation: the option must parse, the
    /// question must belong to the lesson, the lesson to the course, and the
    /// caller must be enrolled. A prior attempt for the same question is
    /// overwritten; the recompute sees the new attempt before it is
    /// committed, and attempt plus enrollment land in one transaction.
    ///
    /// # Errors
    ///
    /// `ValidationError` for a bad option or broken lookup chain;
    /// `StorageError` on persistence failure (nothing committed).
    pub async fn submit_answer(
        &self,
        learner_id: LearnerId,
        course_slug: &str,
        lesson_id: LessonId,
        question_id: QuestionId,
        selected_option: &str,
    ) -> Result<AnswerOutcome, QuizAnswerError> {
        let selected = McqOption::parse(selected_option)
            .map_err(|_| ValidationError::InvalidOption(selected_option.to_owned()))?;

        let course = match self.courses.get_course_by_slug(course_slug).await {
            Ok(course) => course,
            Err(StorageError::NotFound) => {
                return Err(ValidationError::CourseNotFound(course_slug.to_owned()).into());
            }
            Err(err) => return Err(err.into()),
        };

        let lesson = match self.courses.get_lesson(lesson_id).await {
            Ok(lesson) if lesson.course_id() == course.id() => lesson,
            Ok(_) | Err(StorageError::NotFound) => {
                return Err(ValidationError::LessonNotFound {
                    course_slug: course_slug.to_owned(),
                    lesson_id,
                }
                .into());
            }
            Err(err) => return Err(err.into()),
        };

        let question = match self.questions.get_question(question_id).await {
            Ok(question) => question,
            Err(StorageError::NotFound) => {
                return Err(ValidationError::QuestionNotFound(question_id).into());
            }
            Err(err) => return Err(err.into()),
        };
        if question.lesson_id() != lesson.id() {
            return Err(ValidationError::QuestionNotInLesson {
                lesson_id,
                question_id,
            }
            .into());
        }

        let mut enrollment = match self.enrollments.get_enrollment(learner_id, course.id()).await {
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

        let now = self.clock.now();
        let attempt = McqAttempt::grade(enrollment.id(), &question, selected, now);

        let change = self
            .mastery
            .update_scores_with_attempt(&mut enrollment, &attempt, now)
            .await?;

        self.writes.apply_attempt(&enrollment, &attempt).await?;

        debug!(
            enrollment = %enrollment.id(),
            question = %question_id,
            selected = %selected,
            is_correct = attempt.is_correct(),
            "answer graded"
        );
        if change.newly_unlocked_certificate {
            info!(enrollment = %enrollment.id(), course = %course.slug(), "certificate unlocked");
        }

        Ok(AnswerOutcome {
            is_correct: attempt.is_correct(),
            correct_option: question.correct_option(),
            explanation: question.explanation().to_owned(),
            snapshot: MasterySnapshot::of(&enrollment),
        })
    }
}
