mod attempt;
mod certificate;
mod course;
mod enrollment;
mod ids;
mod lesson;
mod lesson_progress;
mod question;
mod resource;

pub use ids::{
    CourseId, EnrollmentId, LearnerId, LessonId, ParseIdError, QuestionId, ResourceId,
};

pub use attempt::McqAttempt;
pub use certificate::{Certificate, CertificateError};
pub use course::{Course, CourseError, CourseLevel};
pub use enrollment::{Enrollment, EnrollmentError, ScoreChange};
pub use lesson::{Lesson, LessonError, VideoId};
pub use lesson_progress::{
    HeartbeatApplied, LessonProgress, LessonProgressError, LessonState,
};
pub use question::{McqOption, McqQuestion, QuestionError};
pub use resource::{LessonResource, ResourceError, ResourceKind};
