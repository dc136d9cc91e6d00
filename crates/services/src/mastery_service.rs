use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use setu_core::model::{Enrollment, LessonId, LessonProgress, McqAttempt, ScoreChange};
use setu_core::{progress, scoring};
use storage::repository::{
    AttemptRepository, CourseRepository, ProgressRepository, StorageError,
};

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// The single authoritative recomputation path for enrollment scores.
///
/// Every mutation event (heartbeat, quiz answer) runs through one of the
/// `update_scores*` methods so the denormalized fields on `Enrollment` are
/// always derived from the base tables. The service mutates the enrollment
/// in memory only; the invoking handler persists it in the same transaction
/// as the triggering row.
pub struct MasteryService {
    courses: Arc<dyn CourseRepository>,
    progress: Arc<dyn ProgressRepository>,
    attempts: Arc<dyn AttemptRepository>,
}

impl MasteryService {
    #[must_use]
    pub fn new(
        courses: Arc<dyn CourseRepository>,
        progress: Arc<dyn ProgressRepository>,
        attempts: Arc<dyn AttemptRepository>,
    ) -> Self {
        Self {
            courses,
            progress,
            attempts,
        }
    }

    /// Recompute all score fields from persisted state.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if loading lessons, progress, or attempts
    /// fails.
    pub async fn update_scores(
        &self,
        enrollment: &mut Enrollment,
        now: DateTime<Utc>,
    ) -> Result<ScoreChange, StorageError> {
        self.recompute(enrollment, None, None, now).await
    }

    /// Recompute with a not-yet-persisted progress record overlaid.
    ///
    /// The heartbeat handler calls this before committing, so the recompute
    /// sees the watch time it is about to write.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if loading state fails.
    pub async fn update_scores_with_progress(
        &self,
        enrollment: &mut Enrollment,
        pending: &LessonProgress,
        now: DateTime<Utc>,
    ) -> Result<ScoreChange, StorageError> {
        self.recompute(enrollment, Some(pending), None, now).await
    }

    /// Recompute with a not-yet-persisted attempt overlaid.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if loading state fails.
    pub async fn update_scores_with_attempt(
        &self,
        enrollment: &mut Enrollment,
        pending: &McqAttempt,
        now: DateTime<Utc>,
    ) -> Result<ScoreChange, StorageError> {
        self.recompute(enrollment, None, Some(pending), now).await
    }

    async fn recompute(
        &self,
        enrollment: &mut Enrollment,
        pending_progress: Option<&LessonProgress>,
        pending_attempt: Option<&McqAttempt>,
        now: DateTime<Utc>,
    ) -> Result<ScoreChange, StorageError> {
        let lessons = self.courses.lessons_for_course(enrollment.course_id()).await?;
        let records = self.progress.progress_for_enrollment(enrollment.id()).await?;

        let mut watch_by_lesson: HashMap<LessonId, u32> = records
            .iter()
            .map(|p| (p.lesson_id(), p.watch_time_secs()))
            .collect();
        if let Some(pending) = pending_progress {
            watch_by_lesson.insert(pending.lesson_id(), pending.watch_time_secs());
        }

        // Every lesson of the course contributes its duration, started or not.
        let unit_progress = progress::unit_progress(lessons.iter().map(|lesson| {
            (
                watch_by_lesson.get(&lesson.id()).copied().unwrap_or(0),
                lesson.duration_secs(),
            )
        }));

        let mut attempts = self.attempts.attempts_for_enrollment(enrollment.id()).await?;
        if let Some(pending) = pending_attempt {
            attempts.retain(|a| a.question_id() != pending.question_id());
            attempts.push(pending.clone());
        }
        let quiz_score = scoring::quiz_score_from_attempts(attempts.iter());

        Ok(enrollment.apply_scores(unit_progress, quiz_score, now))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use setu_core::model::{
        Course, CourseId, CourseLevel, EnrollmentId, LearnerId, Lesson, McqOption, McqQuestion,
        QuestionId,
    };
    use setu_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, QuestionRepository};

    async fn seed_course(repo: &InMemoryRepository, lesson_durations: &[u32]) {
        let course = Course::new(
            CourseId::new(1),
            "rust-basics",
            "Rust Basics",
            None,
            CourseLevel::Beginner,
            None,
            fixed_now(),
        )
        .unwrap();
        repo.upsert_course(&course).await.unwrap();

        for (i, duration) in lesson_durations.iter().enumerate() {
            let lesson = Lesson::new(
                LessonId::new(i as u64 + 1),
                course.id(),
                format!("Lesson {i}"),
                None,
                u32::try_from(i).unwrap(),
                *duration,
                None,
                false,
                fixed_now(),
            )
            .unwrap();
            repo.upsert_lesson(&lesson).await.unwrap();
        }
    }

    fn service(repo: &InMemoryRepository) -> MasteryService {
        MasteryService::new(
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    fn enrollment() -> Enrollment {
        Enrollment::new(
            EnrollmentId::new(1),
            LearnerId::new(1),
            CourseId::new(1),
            fixed_now(),
        )
    }

    #[tokio::test]
    async fn update_scores_on_empty_state_is_zero() {
        let repo = InMemoryRepository::new();
        seed_course(&repo, &[600]).await;
        let mut e = enrollment();

        let change = service(&repo).update_scores(&mut e, fixed_now()).await.unwrap();
        assert_eq!(change.mastery_score, 0);
        assert_eq!(e.unit_progress(), 0);
        assert_eq!(e.quiz_score(), 0);
    }

    #[tokio::test]
    async fn zero_duration_course_reports_zero_progress() {
        let repo = InMemoryRepository::new();
        seed_course(&repo, &[0, 0]).await;
        let mut e = enrollment();

        service(&repo).update_scores(&mut e, fixed_now()).await.unwrap();
        assert_eq!(e.unit_progress(), 0);
    }

    #[tokio::test]
    async fn pending_progress_overlay_is_visible_to_recompute() {
        let repo = InMemoryRepository::new();
        seed_course(&repo, &[600]).await;
        let mut e = enrollment();

        let mut pending = LessonProgress::start(e.id(), LessonId::new(1), fixed_now());
        pending.record_heartbeat(300, None, 600, fixed_now());

        let change = service(&repo)
            .update_scores_with_progress(&mut e, &pending, fixed_now())
            .await
            .unwrap();
        assert_eq!(e.unit_progress(), 50);
        assert_eq!(change.mastery_score, 30);
    }

    #[tokio::test]
    async fn pending_attempt_replaces_stored_attempt_for_same_question() {
        let repo = InMemoryRepository::new();
        seed_course(&repo, &[600]).await;
        let question = McqQuestion::new(
            QuestionId::new(1),
            LessonId::new(1),
            "Q",
            ["a".into(), "b".into(), "c".into(), "d".into()],
            McqOption::A,
            "",
            0,
            fixed_now(),
        )
        .unwrap();
        repo.upsert_question(&question).await.unwrap();

        let mut e = enrollment();

        // Stored wrong answer.
        let wrong = McqAttempt::grade(e.id(), &question, McqOption::B, fixed_now());
        repo.upsert_attempt(&wrong).await.unwrap();
        service(&repo).update_scores(&mut e, fixed_now()).await.unwrap();
        assert_eq!(e.quiz_score(), 0);

        // Pending corrected answer replaces it rather than adding a second
        // attempt for the same question.
        let corrected = McqAttempt::grade(e.id(), &question, McqOption::A, fixed_now());
        service(&repo)
            .update_scores_with_attempt(&mut e, &corrected, fixed_now())
            .await
            .unwrap();
        assert_eq!(e.quiz_score(), 100);
    }
}
