use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{EnrollmentId, LessonId};
use crate::progress::{clamp_heartbeat_delta, is_watch_complete};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonProgressError {
    #[error("completed progress record is missing its completion timestamp")]
    MissingCompletedAt,
}

//
// ─── LESSON STATE ──────────────────────────────────────────────────────────────
//

/// Per-lesson watch state machine.
///
/// `NotStarted` is represented by the absence of a progress record; an
/// existing record is `InProgress` until the completion latch fires, which
/// is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonState {
    NotStarted,
    InProgress,
    Completed,
}

//
// ─── HEARTBEAT RESULT ──────────────────────────────────────────────────────────
//

/// Effect of one heartbeat on a progress record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatApplied {
    /// Seconds actually credited after the clamp.
    pub applied_secs: u32,
    /// True only on the call that fired the completion transition.
    pub newly_completed: bool,
}

//
// ─── LESSON PROGRESS ───────────────────────────────────────────────────────────
//

/// Watch-time record for one enrollment × lesson pair.
///
/// Watch time is monotone non-decreasing; `last_heartbeat_at` is the clamp
/// baseline for the next heartbeat's delta.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonProgress {
    enrollment_id: EnrollmentId,
    lesson_id: LessonId,
    watch_time_secs: u32,
    last_position_secs: u32,
    is_completed: bool,
    started_at: DateTime<Utc>,
    last_heartbeat_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl LessonProgress {
    /// Fresh record, created lazily on the first heartbeat for a lesson.
    #[must_use]
    pub fn start(enrollment_id: EnrollmentId, lesson_id: LessonId, now: DateTime<Utc>) -> Self {
        Self {
            enrollment_id,
            lesson_id,
            watch_time_secs: 0,
            last_position_secs: 0,
            is_completed: false,
            started_at: now,
            last_heartbeat_at: None,
            completed_at: None,
        }
    }

    /// Rebuild a record from storage.
    ///
    /// # Errors
    ///
    /// Returns `LessonProgressError` if the completion flag and timestamp
    /// disagree.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        enrollment_id: EnrollmentId,
        lesson_id: LessonId,
        watch_time_secs: u32,
        last_position_secs: u32,
        is_completed: bool,
        started_at: DateTime<Utc>,
        last_heartbeat_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, LessonProgressError> {
        if is_completed && completed_at.is_none() {
            return Err(LessonProgressError::MissingCompletedAt);
        }

        Ok(Self {
            enrollment_id,
            lesson_id,
            watch_time_secs,
            last_position_secs,
            is_completed,
            started_at,
            last_heartbeat_at,
            completed_at,
        })
    }

    // Accessors
    #[must_use]
    pub fn enrollment_id(&self) -> EnrollmentId {
        self.enrollment_id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn watch_time_secs(&self) -> u32 {
        self.watch_time_secs
    }

    #[must_use]
    pub fn last_position_secs(&self) -> u32 {
        self.last_position_secs
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn last_heartbeat_at(&self) -> Option<DateTime<Utc>> {
        self.last_heartbeat_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// State of an existing record; `NotStarted` only exists as the absence
    /// of a record.
    #[must_use]
    pub fn state(&self) -> LessonState {
        if self.is_completed {
            LessonState::Completed
        } else {
            LessonState::InProgress
        }
    }

    /// Apply one heartbeat.
    ///
    /// Credits the clamped delta, moves the resume position when the player
    /// reported one, advances the clamp baseline, and fires the completion
    /// transition at 95% watched. Completion is terminal: later heartbeats
    /// keep crediting watch time but `newly_completed` stays false.
    pub fn record_heartbeat(
        &mut self,
        reported_secs: u32,
        position_secs: Option<u32>,
        lesson_duration_secs: u32,
        now: DateTime<Utc>,
    ) -> HeartbeatApplied {
        let elapsed = self
            .last_heartbeat_at
            .map(|prev| now.signed_duration_since(prev));

        let applied_secs = clamp_heartbeat_delta(
            reported_secs,
            elapsed,
            self.watch_time_secs,
            lesson_duration_secs,
        );

        self.watch_time_secs += applied_secs;
        self.last_heartbeat_at = Some(now);

        if let Some(position) = position_secs {
            self.last_position_secs = position.min(lesson_duration_secs);
        }

        let newly_completed = !self.is_completed
            && is_watch_complete(self.watch_time_secs, lesson_duration_secs);
        if newly_completed {
            self.is_completed = true;
            self.completed_at = Some(now);
        }

        HeartbeatApplied {
            applied_secs,
            newly_completed,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
