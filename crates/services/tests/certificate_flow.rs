use chrono::{DateTime, Utc};

use services::{
    CertificateService, CertificateServiceError, Clock, DomainError, EnrollmentService, Heartbeat,
    LessonWatchService, MasteryService, QuizAnswerService,
};
use setu_core::model::{
    Course, CourseId, CourseLevel, LearnerId, Lesson, LessonId, LessonState, McqOption,
    McqQuestion, QuestionId,
};
use setu_core::time::fixed_now;
use storage::repository::Storage;

fn learner() -> LearnerId {
    LearnerId::new(7)
}

async fn seed_catalog(storage: &Storage) {
    let course = Course::new(
        CourseId::new(1),
        "rust-basics",
        "Rust Basics",
        Some("ownership and borrowing".into()),
        CourseLevel::Beginner,
        None,
        fixed_now(),
    )
    .unwrap();
    storage.courses.upsert_course(&course).await.unwrap();

    let lesson = Lesson::new(
        LessonId::new(1),
        course.id(),
        "Ownership",
        None,
        0,
        600,
        Some("dQw4w9WgXcQ"),
        false,
        fixed_now(),
    )
    .unwrap();
    storage.courses.upsert_lesson(&lesson).await.unwrap();

    let question = McqQuestion::new(
        QuestionId::new(1),
        LessonId::new(1),
        "What does & create?",
        ["move".into(), "copy".into(), "borrow".into(), "drop".into()],
        McqOption::C,
        "A shared reference borrows the value.",
        0,
        fixed_now(),
    )
    .unwrap();
    storage.questions.upsert_question(&question).await.unwrap();
}

fn mastery(storage: &Storage) -> MasteryService {
    MasteryService::new(
        storage.courses.clone(),
        storage.progress.clone(),
        storage.attempts.clone(),
    )
}

fn enrollment_service(storage: &Storage) -> EnrollmentService {
    EnrollmentService::new(
        Clock::fixed(fixed_now()),
        storage.courses.clone(),
        storage.questions.clone(),
        storage.enrollments.clone(),
        storage.progress.clone(),
        storage.attempts.clone(),
    )
}

fn certificate_service(storage: &Storage) -> CertificateService {
    CertificateService::new(
        Clock::fixed(fixed_now()),
        storage.courses.clone(),
        storage.enrollments.clone(),
        storage.certificates.clone(),
    )
}

fn watch_at(storage: &Storage, now: DateTime<Utc>) -> LessonWatchService {
    LessonWatchService::new(
        Clock::fixed(now),
        storage.courses.clone(),
        storage.enrollments.clone(),
        storage.progress.clone(),
        storage.enrollment_writes.clone(),
        mastery(storage),
    )
}

fn quiz_at(storage: &Storage, now: DateTime<Utc>) -> QuizAnswerService {
    QuizAnswerService::new(
        Clock::fixed(now),
        storage.courses.clone(),
        storage.questions.clone(),
        storage.enrollments.clone(),
        storage.enrollment_writes.clone(),
        mastery(storage),
    )
}

/// Watch the whole lesson and answer the quiz correctly.
async fn earn_certificate(storage: &Storage) {
    watch_at(storage, fixed_now())
        .record_heartbeat(
            learner(),
            "rust-basics",
            LessonId::new(1),
            Heartbeat::watched(600),
        )
        .await
        .unwrap();

    quiz_at(storage, fixed_now())
        .submit_answer(
            learner(),
            "rust-basics",
            LessonId::new(1),
            QuestionId::new(1),
            "C",
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn enrolling_twice_is_refused() {
    let storage = Storage::in_memory();
    seed_catalog(&storage).await;
    let service = enrollment_service(&storage);

    let enrollment = service.enroll(learner(), "rust-basics").await.unwrap();
    assert_eq!(enrollment.unit_progress(), 0);

    let err = service.enroll(learner(), "rust-basics").await.unwrap_err();
    assert!(matches!(
        err,
        services::EnrollError::Domain(DomainError::AlreadyEnrolled(_))
    ));
}

#[tokio::test]
async fn course_state_reflects_progress_and_hides_unanswered_grading() {
    let storage = Storage::in_memory();
    seed_catalog(&storage).await;
    let service = enrollment_service(&storage);
    service.enroll(learner(), "rust-basics").await.unwrap();

    let state = service.course_state(learner(), "rust-basics").await.unwrap();
    assert_eq!(state.course_slug, "rust-basics");
    assert_eq!(state.lessons.len(), 1);
    assert_eq!(state.lessons[0].state, LessonState::NotStarted);
    assert!(state.lessons[0].questions[0].answered.is_none());
    assert_eq!(state.snapshot.unit_progress, 0);

    // The serialized payload must not leak grading for unanswered questions.
    let json = serde_json::to_string(&state).unwrap();
    assert!(!json.contains("correct_option"));
    assert!(!json.contains("shared reference"));

    earn_certificate(&storage).await;

    let state = service.course_state(learner(), "rust-basics").await.unwrap();
    assert_eq!(state.lessons[0].state, LessonState::Completed);
    assert_eq!(state.lessons[0].watch_time_secs, 600);
    let answered = state.lessons[0].questions[0].answered.as_ref().unwrap();
    assert!(answered.is_correct);
    assert_eq!(answered.correct_option, McqOption::C);
    assert_eq!(state.snapshot.mastery_score, 100);
    assert!(state.snapshot.certificate_unlocked);
}

#[tokio::test]
async fn certificate_refused_until_earned_then_issued_once() {
    let storage = Storage::in_memory();
    seed_catalog(&storage).await;
    enrollment_service(&storage)
        .enroll(learner(), "rust-basics")
        .await
        .unwrap();
    let service = certificate_service(&storage);

    let err = service
        .issue(learner(), "rust-basics", "Asha Gurung")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CertificateServiceError::Domain(DomainError::CertificateNotEarned(_))
    ));

    earn_certificate(&storage).await;

    let issued = service
        .issue(learner(), "rust-basics", "Asha Gurung")
        .await
        .unwrap();
    assert_eq!(issued.student_name(), "Asha Gurung");
    assert_eq!(issued.course_title(), "Rust Basics");
    assert_eq!(issued.final_score(), 100);
    assert!(issued.certificate_id().starts_with("SS-"));
    assert!(issued.certificate_id().ends_with("-1"));

    // Issuing again returns the same certificate, not a second one.
    let again = service
        .issue(learner(), "rust-basics", "Asha Gurung")
        .await
        .unwrap();
    assert_eq!(again.certificate_id(), issued.certificate_id());
}

#[tokio::test]
async fn verify_resolves_issued_certificates_only() {
    let storage = Storage::in_memory();
    seed_catalog(&storage).await;
    enrollment_service(&storage)
        .enroll(learner(), "rust-basics")
        .await
        .unwrap();
    earn_certificate(&storage).await;

    let service = certificate_service(&storage);
    let issued = service
        .issue(learner(), "rust-basics", "Asha Gurung")
        .await
        .unwrap();

    let found = service.verify(issued.certificate_id()).await.unwrap();
    assert_eq!(found.as_ref().map(|c| c.final_score()), Some(100));

    let missing = service.verify("SS-00000000-9").await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn certificate_survives_scores_dropping_below_threshold() {
    let storage = Storage::in_memory();
    seed_catalog(&storage).await;
    enrollment_service(&storage)
        .enroll(learner(), "rust-basics")
        .await
        .unwrap();
    earn_certificate(&storage).await;

    // A wrong re-answer drags mastery below 80; the latch must hold.
    quiz_at(&storage, fixed_now())
        .submit_answer(
            learner(),
            "rust-basics",
            LessonId::new(1),
            QuestionId::new(1),
            "A",
        )
        .await
        .unwrap();

    let enrollment = storage
        .enrollments
        .get_enrollment(learner(), CourseId::new(1))
        .await
        .unwrap();
    assert_eq!(enrollment.quiz_score(), 0);
    assert_eq!(enrollment.mastery_score(), 60);
    assert!(enrollment.certificate_unlocked());

    let issued = certificate_service(&storage)
        .issue(learner(), "rust-basics", "Asha Gurung")
        .await
        .unwrap();
    assert_eq!(issued.final_score(), 60);
}

#[tokio::test]
async fn app_services_wire_the_same_flow() {
    let storage = Storage::in_memory();
    seed_catalog(&storage).await;

    let app = services::AppServices::with_storage(&storage, Clock::fixed(fixed_now()));
    app.enrollment()
        .enroll(learner(), "rust-basics")
        .await
        .unwrap();

    let outcome = app
        .watch()
        .record_heartbeat(
            learner(),
            "rust-basics",
            LessonId::new(1),
            Heartbeat::watched(600),
        )
        .await
        .unwrap();
    assert_eq!(outcome.snapshot.unit_progress, 100);

    let outcome = app
        .quiz()
        .submit_answer(
            learner(),
            "rust-basics",
            LessonId::new(1),
            QuestionId::new(1),
            "c",
        )
        .await
        .unwrap();
    assert!(outcome.is_correct);
    assert!(outcome.snapshot.certificate_unlocked);

    let cert = app
        .certificates()
        .issue(learner(), "rust-basics", "Asha Gurung")
        .await
        .unwrap();
    assert!(app.certificates().verify(cert.certificate_id()).await.unwrap().is_some());
}
