use chrono::{DateTime, Utc};

use crate::model::ids::{EnrollmentId, QuestionId};
use crate::model::question::{McqOption, McqQuestion};

/// One learner's answer to one question.
///
/// Unique per (enrollment, question); re-answering overwrites the previous
/// attempt, so the latest answer is the only one that ever counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McqAttempt {
    enrollment_id: EnrollmentId,
    question_id: QuestionId,
    selected: McqOption,
    is_correct: bool,
    attempted_at: DateTime<Utc>,
}

impl McqAttempt {
    /// Grade a submitted option against the question it answers.
    ///
    /// Correctness is decided here, at write time, the only place that sees
    /// both the submission and the stored correct option.
    #[must_use]
    pub fn grade(
        enrollment_id: EnrollmentId,
        question: &McqQuestion,
        selected: McqOption,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            enrollment_id,
            question_id: question.id(),
            selected,
            is_correct: question.is_correct(selected),
            attempted_at: now,
        }
    }

    /// Rebuild an attempt from storage.
    #[must_use]
    pub fn from_persisted(
        enrollment_id: EnrollmentId,
        question_id: QuestionId,
        selected: McqOption,
        is_correct: bool,
        attempted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            enrollment_id,
            question_id,
            selected,
            is_correct,
            attempted_at,
        }
    }

    // Accessors
    #[must_use]
    pub fn enrollment_id(&self) -> EnrollmentId {
        self.enrollment_id
    }

    #[must_use]
    pub fn question_id(&self) -> QuestionId {
        self.question_id
    }

    #[must_use]
    pub fn selected(&self) -> McqOption {
        self.selected
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.is_correct
    }

    #[must_use]
    pub fn attempted_at(&self) -> DateTime<Utc> {
        self.attempted_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::LessonId;
    use crate::time::fixed_now;

    fn question() -> McqQuestion {
        McqQuestion::new(
            QuestionId::new(1),
            LessonId::new(1),
            "2 + 2?",
            ["3".into(), "4".into(), "5".into(), "22".into()],
            McqOption::B,
            "Basic addition.",
            0,
            fixed_now(),
        )
        .unwrap()
    }

    #[test]
    fn grade_marks_correct_answer() {
        let attempt = McqAttempt::grade(EnrollmentId::new(1), &question(), McqOption::B, fixed_now());
        assert!(attempt.is_correct());
        assert_eq!(attempt.selected(), McqOption::B);
        assert_eq!(attempt.question_id(), QuestionId::new(1));
    }

    #[test]
    fn grade_marks_wrong_answer() {
        let attempt = McqAttempt::grade(EnrollmentId::new(1), &question(), McqOption::D, fixed_now());
        assert!(!attempt.is_correct());
    }
}
