//! Serializable read models for the presentation layer.
//!
//! `CourseState` is the one structured payload a client fetches on page
//! load; it replaces server-rendered values spliced into client script, so
//! a templating hiccup can never corrupt executable logic.

use serde::Serialize;

use setu_core::model::{
    Enrollment, Lesson, LessonId, LessonProgress, LessonResource, LessonState, McqAttempt,
    McqOption, McqQuestion, QuestionId, ResourceId, VideoId,
};

/// Denormalized score fields of an enrollment, as returned with every
/// handler outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MasterySnapshot {
    pub unit_progress: u8,
    pub quiz_score: u8,
    pub mastery_score: u8,
    pub certificate_unlocked: bool,
    pub is_completed: bool,
}

impl MasterySnapshot {
    #[must_use]
    pub fn of(enrollment: &Enrollment) -> Self {
        Self {
            unit_progress: enrollment.unit_progress(),
            quiz_score: enrollment.quiz_score(),
            mastery_score: enrollment.mastery_score(),
            certificate_unlocked: enrollment.certificate_unlocked(),
            is_completed: enrollment.is_completed(),
        }
    }
}

/// One lesson resource, ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceView {
    pub resource_id: ResourceId,
    pub title: String,
    pub kind: String,
    pub url: String,
}

impl ResourceView {
    #[must_use]
    pub fn of(resource: &LessonResource) -> Self {
        Self {
            resource_id: resource.id(),
            title: resource.title().to_owned(),
            kind: resource.kind().as_str().to_owned(),
            url: resource.url().as_str().to_owned(),
        }
    }
}

/// One answer slot with its text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionView {
    pub option: McqOption,
    pub text: String,
}

/// The graded part of a question state.
///
/// Present only for questions the learner has answered; the correct option
/// and explanation are never included for unanswered questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnsweredQuestion {
    pub selected: McqOption,
    pub is_correct: bool,
    pub correct_option: McqOption,
    pub explanation: String,
}

/// One question as the client sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionState {
    pub question_id: QuestionId,
    pub text: String,
    pub options: Vec<OptionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answered: Option<AnsweredQuestion>,
}

impl QuestionState {
    /// Build the client view of a question, grafting on the learner's
    /// attempt when one exists.
    #[must_use]
    pub fn of(question: &McqQuestion, attempt: Option<&McqAttempt>) -> Self {
        let answered = attempt.map(|a| AnsweredQuestion {
            selected: a.selected(),
            is_correct: a.is_correct(),
            correct_option: question.correct_option(),
            explanation: question.explanation().to_owned(),
        });

        Self {
            question_id: question.id(),
            text: question.text().to_owned(),
            options: question
                .options()
                .into_iter()
                .map(|(option, text)| OptionView {
                    option,
                    text: text.to_owned(),
                })
                .collect(),
            answered,
        }
    }
}

/// One lesson with the learner's watch state and its quiz.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LessonStateView {
    pub lesson_id: LessonId,
    pub title: String,
    pub position: u32,
    pub duration_secs: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed_url: Option<String>,
    pub is_preview: bool,
    pub state: LessonState,
    pub watch_time_secs: u32,
    pub last_position_secs: u32,
    pub resources: Vec<ResourceView>,
    pub questions: Vec<QuestionState>,
}

impl LessonStateView {
    #[must_use]
    pub fn of(
        lesson: &Lesson,
        progress: Option<&LessonProgress>,
        resources: Vec<ResourceView>,
        questions: Vec<QuestionState>,
    ) -> Self {
        Self {
            lesson_id: lesson.id(),
            title: lesson.title().to_owned(),
            position: lesson.position(),
            duration_secs: lesson.duration_secs(),
            embed_url: lesson.video_id().map(VideoId::embed_url),
            is_preview: lesson.is_preview(),
            state: progress.map_or(LessonState::NotStarted, LessonProgress::state),
            watch_time_secs: progress.map_or(0, LessonProgress::watch_time_secs),
            last_position_secs: progress.map_or(0, LessonProgress::last_position_secs),
            resources,
            questions,
        }
    }
}

/// The initial-state payload for one enrolled course.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseState {
    pub course_slug: String,
    pub course_title: String,
    pub level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub lessons: Vec<LessonStateView>,
    pub snapshot: MasterySnapshot,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
