use std::sync::Arc;

use tracing::{debug, info};

use setu_core::Clock;
use setu_core::model::{LearnerId, LessonId, LessonProgress};
use storage::repository::{
    CourseRepository, EnrollmentPersistence, EnrollmentRepository, ProgressRepository,
    StorageError,
};

use crate::error::{DomainError, LessonWatchError, ValidationError};
use crate::mastery_service::MasteryService;
use crate::view::MasterySnapshot;

//
// ─── HEARTBEAT INPUT / OUTCOME ─────────────────────────────────────────────────
//

/// One periodic watch-time report from the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    /// Seconds watched since the previous heartbeat, as reported by the
    /// client. Clamped server-side; never trusted as-is.
    pub watch_time_secs: u32,
    /// Current playhead position, used only as the resume point.
    pub position_secs: Option<u32>,
}

impl Heartbeat {
    #[must_use]
    pub fn watched(watch_time_secs: u32) -> Self {
        Self {
            watch_time_secs,
            position_secs: None,
        }
    }
}

/// What a heartbeat did, plus the refreshed score snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatOutcome {
    /// Seconds actually credited after the clamp.
    pub applied_secs: u32,
    pub lesson_completed: bool,
    /// True exactly once per lesson, on the completing heartbeat. The
    /// presentation layer uses this to unlock the lesson's quiz gate.
    pub newly_completed: bool,
    pub snapshot: MasterySnapshot,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Handles watch-time heartbeats: per-lesson state machine plus score
/// recomputation.
pub struct LessonWatchService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    progress: Arc<dyn ProgressRepository>,
    writes: Arc<dyn EnrollmentPersistence>,
    mastery: MasteryService,
}

impl LessonWatchService {
    #[must_use]
    pub fn new(
        clock: Clock,
        courses: Arc<dyn CourseRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        progress: Arc<dyn ProgressRepository>,
        writes: Arc<dyn EnrollmentPersistence>,
        mastery: MasteryService,
    ) -> Self {
        Self {
            clock,
            courses,
            enrollments,
            progress,
            writes,
            mastery,
        }
    }

    /// Process one heartbeat for `(learner, course, lesson)`.
    ///
    /// Validates the lookup chain fully before touching state, applies the
    /// clamped delta, evaluates the completion transition, recomputes the
    /// enrollment scores with the pending record overlaid, and commits both
    /// rows in one transaction.
    ///
    /// # Errors
    ///
    /// `ValidationError` for an unknown course/lesson or an unenrolled
    /// learner; `DomainError` for a zero-duration lesson; `StorageError` on
    /// persistence failure (nothing committed).
    pub async fn record_heartbeat(
        &self,
        learner_id: LearnerId,
        course_slug: &str,
        lesson_id: LessonId,
        heartbeat: Heartbeat,
    ) -> Result<HeartbeatOutcome, LessonWatchError> {
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

        if lesson.duration_secs() == 0 {
            return Err(DomainError::LessonWithoutDuration(lesson_id).into());
        }

        let now = self.clock.now();
        let mut record = self
            .progress
            .get_progress(enrollment.id(), lesson_id)
            .await?
            .unwrap_or_else(|| LessonProgress::start(enrollment.id(), lesson_id, now));

        let applied = record.record_heartbeat(
            heartbeat.watch_time_secs,
            heartbeat.position_secs,
            lesson.duration_secs(),
            now,
        );

        let change = self
            .mastery
            .update_scores_with_progress(&mut enrollment, &record, now)
            .await?;

        self.writes.apply_heartbeat(&enrollment, &record).await?;

        debug!(
            enrollment = %enrollment.id(),
            lesson = %lesson_id,
            reported = heartbeat.watch_time_secs,
            applied = applied.applied_secs,
            "heartbeat applied"
        );
        if applied.newly_completed {
            info!(enrollment = %enrollment.id(), lesson = %lesson_id, "lesson completed");
        }
        if change.newly_unlocked_certificate {
            info!(enrollment = %enrollment.id(), course = %course.slug(), "certificate unlocked");
        }

        Ok(HeartbeatOutcome {
            applied_secs: applied.applied_secs,
            lesson_completed: record.is_completed(),
            newly_completed: applied.newly_completed,
            snapshot: MasterySnapshot::of(&enrollment),
        })
    }
}
