use chrono::{DateTime, Duration, Utc};

use services::{
    Clock, DomainError, Heartbeat, LessonWatchError, LessonWatchService, MasteryService,
    ValidationError,
};
use setu_core::model::{
    Course, CourseId, CourseLevel, LearnerId, Lesson, LessonId,
};
use setu_core::time::fixed_now;
use storage::repository::{NewEnrollmentRecord, Storage};

fn learner() -> LearnerId {
    LearnerId::new(7)
}

async fn seed(storage: &Storage) {
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
    storage.courses.upsert_course(&course).await.unwrap();

    // One 600s lesson plus an unfilled one (no duration yet).
    let lesson = Lesson::new(
        LessonId::new(1),
        course.id(),
        "Ownership",
        None,
        0,
        600,
        None,
        false,
        fixed_now(),
    )
    .unwrap();
    storage.courses.upsert_lesson(&lesson).await.unwrap();

    let draft = Lesson::new(
        LessonId::new(2),
        course.id(),
        "Borrowing",
        None,
        1,
        0,
        None,
        false,
        fixed_now(),
    )
    .unwrap();
    storage.courses.upsert_lesson(&draft).await.unwrap();

    storage
        .enrollments
        .insert_enrollment(NewEnrollmentRecord {
            learner_id: learner(),
            course_id: course.id(),
            enrolled_at: fixed_now(),
        })
        .await
        .unwrap();
}

fn watch_at(storage: &Storage, now: DateTime<Utc>) -> LessonWatchService {
    let mastery = MasteryService::new(
        storage.courses.clone(),
        storage.progress.clone(),
        storage.attempts.clone(),
    );
    LessonWatchService::new(
        Clock::fixed(now),
        storage.courses.clone(),
        storage.enrollments.clone(),
        storage.progress.clone(),
        storage.enrollment_writes.clone(),
        mastery,
    )
}

#[tokio::test]
async fn heartbeat_sequence_steps_through_five_percent_grid() {
    let storage = Storage::in_memory();
    seed(&storage).await;
    let t0 = fixed_now();

    // Only lesson 1 (600s) has a duration, so it alone is the denominator.
    let outcome = watch_at(&storage, t0)
        .record_heartbeat(learner(), "rust-basics", LessonId::new(1), Heartbeat::watched(30))
        .await
        .unwrap();
    assert_eq!(outcome.applied_secs, 30);
    assert_eq!(outcome.snapshot.unit_progress, 5);
    assert!(!outcome.lesson_completed);

    let outcome = watch_at(&storage, t0 + Duration::seconds(300))
        .record_heartbeat(learner(), "rust-basics", LessonId::new(1), Heartbeat::watched(270))
        .await
        .unwrap();
    assert_eq!(outcome.snapshot.unit_progress, 50);

    let outcome = watch_at(&storage, t0 + Duration::seconds(600))
        .record_heartbeat(learner(), "rust-basics", LessonId::new(1), Heartbeat::watched(300))
        .await
        .unwrap();
    assert_eq!(outcome.snapshot.unit_progress, 100);
    assert!(outcome.lesson_completed);
    assert!(outcome.newly_completed);

    // Watch-only mastery: 0.6 * 100 + 0.4 * 0.
    assert_eq!(outcome.snapshot.mastery_score, 60);
    assert!(!outcome.snapshot.certificate_unlocked);
}

#[tokio::test]
async fn duplicate_heartbeat_does_not_double_count() {
    let storage = Storage::in_memory();
    seed(&storage).await;
    let t0 = fixed_now();

    let service = watch_at(&storage, t0);
    let first = service
        .record_heartbeat(learner(), "rust-basics", LessonId::new(1), Heartbeat::watched(30))
        .await
        .unwrap();
    assert_eq!(first.snapshot.unit_progress, 5);

    // Retried delivery of the same heartbeat: zero elapsed wall clock.
    let retry = service
        .record_heartbeat(learner(), "rust-basics", LessonId::new(1), Heartbeat::watched(30))
        .await
        .unwrap();
    assert_eq!(retry.applied_secs, 0);
    assert_eq!(retry.snapshot.unit_progress, 5);
}

#[tokio::test]
async fn unit_progress_never_decreases() {
    let storage = Storage::in_memory();
    seed(&storage).await;
    let t0 = fixed_now();

    let mut last = 0;
    // Over-reported and under-reported deltas mixed in.
    for (offset, reported) in [(0, 45), (10, 120), (20, 3), (300, 600), (310, 1)] {
        let outcome = watch_at(&storage, t0 + Duration::seconds(offset))
            .record_heartbeat(
                learner(),
                "rust-basics",
                LessonId::new(1),
                Heartbeat::watched(reported),
            )
            .await
            .unwrap();
        assert!(outcome.snapshot.unit_progress >= last);
        assert_eq!(outcome.snapshot.unit_progress % 5, 0);
        assert!(outcome.snapshot.unit_progress <= 100);
        last = outcome.snapshot.unit_progress;
    }
}

#[tokio::test]
async fn completion_fires_exactly_once() {
    let storage = Storage::in_memory();
    seed(&storage).await;
    let t0 = fixed_now();

    let outcome = watch_at(&storage, t0)
        .record_heartbeat(learner(), "rust-basics", LessonId::new(1), Heartbeat::watched(600))
        .await
        .unwrap();
    assert!(outcome.newly_completed);

    let outcome = watch_at(&storage, t0 + Duration::seconds(60))
        .record_heartbeat(learner(), "rust-basics", LessonId::new(1), Heartbeat::watched(60))
        .await
        .unwrap();
    assert!(outcome.lesson_completed);
    assert!(!outcome.newly_completed);
}

#[tokio::test]
async fn validation_failures_mutate_nothing() {
    let storage = Storage::in_memory();
    seed(&storage).await;
    let service = watch_at(&storage, fixed_now());

    let err = service
        .record_heartbeat(learner(), "no-such-course", LessonId::new(1), Heartbeat::watched(30))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LessonWatchError::Validation(ValidationError::CourseNotFound(_))
    ));

    let err = service
        .record_heartbeat(learner(), "rust-basics", LessonId::new(99), Heartbeat::watched(30))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LessonWatchError::Validation(ValidationError::LessonNotFound { .. })
    ));

    let err = service
        .record_heartbeat(
            LearnerId::new(999),
            "rust-basics",
            LessonId::new(1),
            Heartbeat::watched(30),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LessonWatchError::Validation(ValidationError::NotEnrolled { .. })
    ));

    let enrollment = storage
        .enrollments
        .get_enrollment(learner(), CourseId::new(1))
        .await
        .unwrap();
    assert_eq!(enrollment.unit_progress(), 0);
    assert_eq!(enrollment.mastery_score(), 0);
}

#[tokio::test]
async fn zero_duration_lesson_is_a_domain_error() {
    let storage = Storage::in_memory();
    seed(&storage).await;

    let err = watch_at(&storage, fixed_now())
        .record_heartbeat(learner(), "rust-basics", LessonId::new(2), Heartbeat::watched(30))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LessonWatchError::Domain(DomainError::LessonWithoutDuration(_))
    ));

    let enrollment = storage
        .enrollments
        .get_enrollment(learner(), CourseId::new(1))
        .await
        .unwrap();
    assert_eq!(enrollment.unit_progress(), 0);
}
