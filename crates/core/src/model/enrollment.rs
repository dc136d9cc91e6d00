use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::mastery;
use crate::model::ids::{CourseId, EnrollmentId, LearnerId};
use crate::progress::PROGRESS_STEP;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EnrollmentError {
    #[error("{field} must be within 0..=100, got {value}")]
    PercentOutOfRange { field: &'static str, value: u8 },

    #[error("unit progress must be a multiple of {PROGRESS_STEP}, got {0}")]
    UnquantizedProgress(u8),
}

//
// ─── SCORE CHANGE ──────────────────────────────────────────────────────────────
//

/// What a single `apply_scores` call changed.
///
/// The latch flags fire exactly once, on the transition; callers use them
/// for one-shot side effects (logging, notifications) without re-deriving
/// the transition themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreChange {
    pub mastery_score: u8,
    pub newly_unlocked_certificate: bool,
    pub newly_completed_course: bool,
}

//
// ─── ENROLLMENT ────────────────────────────────────────────────────────────────
//

/// One learner's membership in one course, carrying all denormalized
/// progress state.
///
/// `mastery_score` is derived and only ever written through
/// [`Enrollment::apply_scores`]; `certificate_unlocked` and `is_completed`
/// are monotone latches that never revert once set.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrollment {
    id: EnrollmentId,
    learner_id: LearnerId,
    course_id: CourseId,
    enrolled_at: DateTime<Utc>,
    unit_progress: u8,
    quiz_score: u8,
    mastery_score: u8,
    certificate_unlocked: bool,
    is_completed: bool,
    completed_at: Option<DateTime<Utc>>,
}

impl Enrollment {
    /// A fresh enrollment with zeroed scores.
    #[must_use]
    pub fn new(
        id: EnrollmentId,
        learner_id: LearnerId,
        course_id: CourseId,
        enrolled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            learner_id,
            course_id,
            enrolled_at,
            unit_progress: 0,
            quiz_score: 0,
            mastery_score: 0,
            certificate_unlocked: false,
            is_completed: false,
            completed_at: None,
        }
    }

    /// Rebuild an enrollment from storage.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError` if a percentage field is out of range or
    /// the stored unit progress is not on the 5% grid.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: EnrollmentId,
        learner_id: LearnerId,
        course_id: CourseId,
        enrolled_at: DateTime<Utc>,
        unit_progress: u8,
        quiz_score: u8,
        mastery_score: u8,
        certificate_unlocked: bool,
        is_completed: bool,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, EnrollmentError> {
        for (field, value) in [
            ("unit_progress", unit_progress),
            ("quiz_score", quiz_score),
            ("mastery_score", mastery_score),
        ] {
            if value > 100 {
                return Err(EnrollmentError::PercentOutOfRange { field, value });
            }
        }
        if unit_progress % PROGRESS_STEP != 0 {
            return Err(EnrollmentError::UnquantizedProgress(unit_progress));
        }

        Ok(Self {
            id,
            learner_id,
            course_id,
            enrolled_at,
            unit_progress,
            quiz_score,
            mastery_score,
            certificate_unlocked,
            is_completed,
            completed_at,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> EnrollmentId {
        self.id
    }

    #[must_use]
    pub fn learner_id(&self) -> LearnerId {
        self.learner_id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn enrolled_at(&self) -> DateTime<Utc> {
        self.enrolled_at
    }

    #[must_use]
    pub fn unit_progress(&self) -> u8 {
        self.unit_progress
    }

    #[must_use]
    pub fn quiz_score(&self) -> u8 {
        self.quiz_score
    }

    #[must_use]
    pub fn mastery_score(&self) -> u8 {
        self.mastery_score
    }

    #[must_use]
    pub fn certificate_unlocked(&self) -> bool {
        self.certificate_unlocked
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Apply freshly computed aggregates.
    ///
    /// The single mutation path for score state: recomputes the mastery
    /// score from the aggregates, latches the certificate at
    /// [`mastery::CERTIFICATE_THRESHOLD`], and latches course completion
    /// (stamping `completed_at`) per the completion rule. Latches never
    /// revert, even when the new aggregates compute below the thresholds.
    pub fn apply_scores(
        &mut self,
        unit_progress: u8,
        quiz_score: u8,
        now: DateTime<Utc>,
    ) -> ScoreChange {
        self.unit_progress = unit_progress;
        self.quiz_score = quiz_score;
        self.mastery_score = mastery::mastery_score(unit_progress, quiz_score);

        let newly_unlocked_certificate =
            !self.certificate_unlocked && mastery::unlocks_certificate(self.mastery_score);
        self.certificate_unlocked |= newly_unlocked_certificate;

        let newly_completed_course = !self.is_completed
            && mastery::completes_course(self.unit_progress, self.quiz_score, self.mastery_score);
        if newly_completed_course {
            self.is_completed = true;
            self.completed_at = Some(now);
        }

        ScoreChange {
            mastery_score: self.mastery_score,
            newly_unlocked_certificate,
            newly_completed_course,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn build() -> Enrollment {
        Enrollment::new(
            EnrollmentId::new(1),
            LearnerId::new(10),
            CourseId::new(100),
            fixed_now(),
        )
    }

    #[test]
    fn new_enrollment_starts_at_zero() {
        let e = build();
        assert_eq!(e.unit_progress(), 0);
        assert_eq!(e.quiz_score(), 0);
        assert_eq!(e.mastery_score(), 0);
        assert!(!e.certificate_unlocked());
        assert!(!e.is_completed());
    }

    #[test]
    fn apply_scores_recomputes_mastery() {
        let mut e = build();
        let change = e.apply_scores(100, 75, fixed_now());
        assert_eq!(change.mastery_score, 90);
        assert_eq!(e.mastery_score(), 90);
        assert!(change.newly_unlocked_certificate);
        assert!(e.certificate_unlocked());
    }

    #[test]
    fn certificate_latch_never_reverts() {
        let mut e = build();
        e.apply_scores(100, 75, fixed_now());
        assert!(e.certificate_unlocked());

        // Aggregates dropping below the threshold leave the latch set.
        let change = e.apply_scores(50, 0, fixed_now());
        assert_eq!(e.mastery_score(), 30);
        assert!(e.certificate_unlocked());
        assert!(!change.newly_unlocked_certificate);
    }

    #[test]
    fn completion_requires_full_progress_and_passing_quiz() {
        let mut e = build();
        let change = e.apply_scores(100, 59, fixed_now());
        assert!(!change.newly_completed_course);
        assert!(!e.is_completed());

        let change = e.apply_scores(100, 60, fixed_now());
        assert!(change.newly_completed_course);
        assert!(e.is_completed());
        assert_eq!(e.completed_at(), Some(fixed_now()));

        // Re-applying does not re-fire the latch.
        let change = e.apply_scores(100, 60, fixed_now());
        assert!(!change.newly_completed_course);
    }

    #[test]
    fn from_persisted_validates_ranges() {
        let err = Enrollment::from_persisted(
            EnrollmentId::new(1),
            LearnerId::new(1),
            CourseId::new(1),
            fixed_now(),
            105,
            0,
            0,
            false,
            false,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, EnrollmentError::PercentOutOfRange { .. }));

        let err = Enrollment::from_persisted(
            EnrollmentId::new(1),
            LearnerId::new(1),
            CourseId::new(1),
            fixed_now(),
            52,
            0,
            0,
            false,
            false,
            None,
        )
        .unwrap_err();
        assert_eq!(err, EnrollmentError::UnquantizedProgress(52));
    }
}
