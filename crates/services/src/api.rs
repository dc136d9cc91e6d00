//! Wire-shaped response envelopes for the two handler endpoints.
//!
//! The embedding web layer maps results through these types: a successful
//! outcome or a business-rule refusal both serialize to an HTTP 200 body
//! (`success` distinguishes them); validation and storage errors stay `Err`
//! for the web layer to turn into 4xx / 5xx. Score fields are zeroed on
//! failure envelopes since no state was mutated.

use serde::Serialize;

use setu_core::model::McqOption;

use crate::error::{LessonWatchError, QuizAnswerError};
use crate::quiz_service::AnswerOutcome;
use crate::watch_service::HeartbeatOutcome;

//
// ─── HEARTBEAT ENVELOPE ────────────────────────────────────────────────────────
//

/// Body of `POST /courses/{slug}/lesson/{id}/complete/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeartbeatResponse {
    pub success: bool,
    pub lesson_completed: bool,
    pub newly_completed: bool,
    pub unit_progress: u8,
    pub mastery_score: u8,
    pub certificate_unlocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HeartbeatResponse {
    /// Fold a handler result into the envelope.
    ///
    /// Domain refusals become `success: false` bodies; validation and
    /// storage errors pass through for the web layer's status mapping.
    ///
    /// # Errors
    ///
    /// Re-raises `Validation` and `Storage` errors unchanged.
    pub fn from_result(
        result: Result<HeartbeatOutcome, LessonWatchError>,
    ) -> Result<Self, LessonWatchError> {
        match result {
            Ok(outcome) => Ok(Self {
                success: true,
                lesson_completed: outcome.lesson_completed,
                newly_completed: outcome.newly_completed,
                unit_progress: outcome.snapshot.unit_progress,
                mastery_score: outcome.snapshot.mastery_score,
                certificate_unlocked: outcome.snapshot.certificate_unlocked,
                error: None,
            }),
            Err(LessonWatchError::Domain(err)) => Ok(Self::failure(err.to_string())),
            Err(err) => Err(err),
        }
    }

    /// A `success: false` body with the given error message, also usable as
    /// the body of a 4xx response.
    #[must_use]
    pub fn failure(error: String) -> Self {
        Self {
            success: false,
            lesson_completed: false,
            newly_completed: false,
            unit_progress: 0,
            mastery_score: 0,
            certificate_unlocked: false,
            error: Some(error),
        }
    }
}

//
// ─── MCQ ANSWER ENVELOPE ───────────────────────────────────────────────────────
//

/// Body of `POST /courses/{slug}/submit-mcq/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct McqAnswerResponse {
    pub success: bool,
    pub is_correct: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_option: Option<McqOption>,
    pub explanation: String,
    pub unit_progress: u8,
    pub quiz_score: u8,
    pub mastery_score: u8,
    pub certificate_unlocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl McqAnswerResponse {
    /// Fold a handler result into the envelope.
    ///
    /// # Errors
    ///
    /// Re-raises `Validation` and `Storage` errors unchanged.
    pub fn from_result(
        result: Result<AnswerOutcome, QuizAnswerError>,
    ) -> Result<Self, QuizAnswerError> {
        match result {
            Ok(outcome) => Ok(Self {
                success: true,
                is_correct: outcome.is_correct,
                correct_option: Some(outcome.correct_option),
                explanation: outcome.explanation,
                unit_progress: outcome.snapshot.unit_progress,
                quiz_score: outcome.snapshot.quiz_score,
                mastery_score: outcome.snapshot.mastery_score,
                certificate_unlocked: outcome.snapshot.certificate_unlocked,
                error: None,
            }),
            Err(QuizAnswerError::Domain(err)) => Ok(Self::failure(err.to_string())),
            Err(err) => Err(err),
        }
    }

    /// A `success: false` body with the given error message, also usable as
    /// the body of a 4xx response. The correct option is never leaked on
    /// failure.
    #[must_use]
    pub fn failure(error: String) -> Self {
        Self {
            success: false,
            is_correct: false,
            correct_option: None,
            explanation: String::new(),
            unit_progress: 0,
            quiz_score: 0,
            mastery_score: 0,
            certificate_unlocked: false,
            error: Some(error),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainError, ValidationError};
    use crate::view::MasterySnapshot;
    use setu_core::model::LessonId;

    fn outcome() -> HeartbeatOutcome {
        HeartbeatOutcome {
            applied_secs: 30,
            lesson_completed: false,
            newly_completed: false,
            snapshot: MasterySnapshot {
                unit_progress: 5,
                quiz_score: 0,
                mastery_score: 3,
                certificate_unlocked: false,
                is_completed: false,
            },
        }
    }

    #[test]
    fn heartbeat_success_wire_shape() {
        let response = HeartbeatResponse::from_result(Ok(outcome())).unwrap();
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["lesson_completed"], false);
        assert_eq!(json["newly_completed"], false);
        assert_eq!(json["unit_progress"], 5);
        assert_eq!(json["mastery_score"], 3);
        assert_eq!(json["certificate_unlocked"], false);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn heartbeat_domain_error_folds_to_success_false() {
        let result = Err(DomainError::LessonWithoutDuration(LessonId::new(3)).into());
        let response = HeartbeatResponse::from_result(result).unwrap();

        assert!(!response.success);
        assert_eq!(response.unit_progress, 0);
        assert_eq!(response.error.as_deref(), Some("lesson 3 has no duration set"));
    }

    #[test]
    fn heartbeat_validation_error_passes_through() {
        let result = Err(ValidationError::CourseNotFound("nope".into()).into());
        let err = HeartbeatResponse::from_result(result).unwrap_err();
        assert!(matches!(err, LessonWatchError::Validation(_)));
    }

    #[test]
    fn mcq_success_wire_shape() {
        let result = Ok(AnswerOutcome {
            is_correct: true,
            correct_option: McqOption::B,
            explanation: "Basic addition.".into(),
            snapshot: MasterySnapshot {
                unit_progress: 100,
                quiz_score: 75,
                mastery_score: 90,
                certificate_unlocked: true,
                is_completed: false,
            },
        });
        let response = McqAnswerResponse::from_result(result).unwrap();
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["is_correct"], true);
        assert_eq!(json["correct_option"], "B");
        assert_eq!(json["explanation"], "Basic addition.");
        assert_eq!(json["quiz_score"], 75);
        assert_eq!(json["mastery_score"], 90);
        assert_eq!(json["certificate_unlocked"], true);
    }

    #[test]
    fn mcq_failure_never_leaks_correct_option() {
        let response = McqAnswerResponse::failure("invalid option: E".into());
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["success"], false);
        assert!(json.get("correct_option").is_none());
        assert_eq!(json["error"], "invalid option: E");
    }
}
