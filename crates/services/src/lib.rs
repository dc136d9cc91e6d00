#![forbid(unsafe_code)]

pub mod api;
pub mod app_services;
pub mod certificate_service;
pub mod enrollment_service;
pub mod error;
pub mod mastery_service;
pub mod quiz_service;
pub mod view;
pub mod watch_service;

pub use setu_core::Clock;

pub use api::{HeartbeatResponse, McqAnswerResponse};
pub use app_services::AppServices;
pub use certificate_service::CertificateService;
pub use enrollment_service::EnrollmentService;
pub use error::{
    AppServicesError, CertificateServiceError, DomainError, EnrollError, LessonWatchError,
    QuizAnswerError, ValidationError,
};
pub use mastery_service::MasteryService;
pub use quiz_service::{AnswerOutcome, QuizAnswerService};
pub use view::{
    AnsweredQuestion, CourseState, LessonStateView, MasterySnapshot, OptionView, QuestionState,
    ResourceView,
};
pub use watch_service::{Heartbeat, HeartbeatOutcome, LessonWatchService};
