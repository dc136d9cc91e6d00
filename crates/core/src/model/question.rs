use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{LessonId, QuestionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("option {0} cannot be empty")]
    EmptyOption(McqOption),

    #[error("invalid option: {0}")]
    InvalidOption(String),
}

//
// ─── MCQ OPTION ────────────────────────────────────────────────────────────────
//

/// One of the four fixed answer slots of an MCQ question.
///
/// Serializes as the bare letter (`"A"`..`"D"`), which is also the wire and
/// storage encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum McqOption {
    A,
    B,
    C,
    D,
}

impl McqOption {
    /// All options in display order.
    pub const ALL: [McqOption; 4] = [McqOption::A, McqOption::B, McqOption::C, McqOption::D];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            McqOption::A => "A",
            McqOption::B => "B",
            McqOption::C => "C",
            McqOption::D => "D",
        }
    }

    /// Parses a submitted option letter, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::InvalidOption` for anything outside A–D.
    pub fn parse(value: &str) -> Result<Self, QuestionError> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(McqOption::A),
            "B" => Ok(McqOption::B),
            "C" => Ok(McqOption::C),
            "D" => Ok(McqOption::D),
            _ => Err(QuestionError::InvalidOption(value.to_string())),
        }
    }
}

impl std::fmt::Display for McqOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── MCQ QUESTION ──────────────────────────────────────────────────────────────
//

/// A four-option multiple-choice question attached to a lesson.
///
/// The correct option and the explanation are only ever revealed after the
/// learner has answered; views must not leak them beforehand.
#[derive(Debug, Clone, PartialEq)]
pub struct McqQuestion {
    id: QuestionId,
    lesson_id: LessonId,
    text: String,
    option_a: String,
    option_b: String,
    option_c: String,
    option_d: String,
    correct_option: McqOption,
    explanation: String,
    position: u32,
    created_at: DateTime<Utc>,
}

impl McqQuestion {
    /// Creates a new question.
    ///
    /// The explanation may be empty; it is still always returned with a
    /// graded answer.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the question text or any option text is
    /// blank.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: QuestionId,
        lesson_id: LessonId,
        text: impl Into<String>,
        options: [String; 4],
        correct_option: McqOption,
        explanation: impl Into<String>,
        position: u32,
        created_at: DateTime<Utc>,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }

        let [option_a, option_b, option_c, option_d] = options;
        for (slot, text) in McqOption::ALL
            .iter()
            .zip([&option_a, &option_b, &option_c, &option_d])
        {
            if text.trim().is_empty() {
                return Err(QuestionError::EmptyOption(*slot));
            }
        }

        Ok(Self {
            id,
            lesson_id,
            text: text.trim().to_owned(),
            option_a: option_a.trim().to_owned(),
            option_b: option_b.trim().to_owned(),
            option_c: option_c.trim().to_owned(),
            option_d: option_d.trim().to_owned(),
            correct_option,
            explanation: explanation.into().trim().to_owned(),
            position,
            created_at,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text of the given answer slot.
    #[must_use]
    pub fn option_text(&self, option: McqOption) -> &str {
        match option {
            McqOption::A => &self.option_a,
            McqOption::B => &self.option_b,
            McqOption::C => &self.option_c,
            McqOption::D => &self.option_d,
        }
    }

    /// All `(slot, text)` pairs in display order.
    #[must_use]
    pub fn options(&self) -> [(McqOption, &str); 4] {
        McqOption::ALL.map(|o| (o, self.option_text(o)))
    }

    #[must_use]
    pub fn correct_option(&self) -> McqOption {
        self.correct_option
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    #[must_use]
    pub fn position(&self) -> u32 {
        self.position
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether the submitted option matches the stored correct option.
    #[must_use]
    pub fn is_correct(&self, selected: McqOption) -> bool {
        selected == self.correct_option
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
