use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{CourseId, LessonId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonError {
    #[error("lesson title cannot be empty")]
    EmptyTitle,

    #[error("unrecognized video id or URL: {0}")]
    InvalidVideoId(String),
}

//
// ─── VIDEO ID ──────────────────────────────────────────────────────────────────
//

/// Normalized YouTube video id (11 characters of `[A-Za-z0-9_-]`).
///
/// Instructors paste full watch/share/embed URLs as often as bare ids, so
/// parsing accepts any of those forms and extracts the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoId(String);

impl VideoId {
    /// Extract a video id from a bare id or any common YouTube URL form
    /// (`watch?v=`, `youtu.be/`, `/embed/`, nocookie host, trailing query).
    ///
    /// # Errors
    ///
    /// Returns `LessonError::InvalidVideoId` when no 11-character id run is
    /// present in the input.
    pub fn parse(raw: &str) -> Result<Self, LessonError> {
        let trimmed = raw.trim();
        extract_id_run(trimmed)
            .map(Self)
            .ok_or_else(|| LessonError::InvalidVideoId(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Embeddable player URL for this video.
    #[must_use]
    pub fn embed_url(&self) -> String {
        format!(
            "https://www.youtube.com/embed/{}?rel=0&modestbranding=1",
            self.0
        )
    }
}

/// Find a maximal run of id characters of exactly 11 chars.
///
/// URL punctuation (`/ ? = & .`) never appears in ids, so runs bounded by it
/// isolate the id in every supported URL shape.
fn extract_id_run(raw: &str) -> Option<String> {
    fn is_id_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '_' || c == '-'
    }

    let chars: Vec<char> = raw.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if is_id_char(chars[i]) {
            let start = i;
            while i < chars.len() && is_id_char(chars[i]) {
                i += 1;
            }
            if i - start == 11 {
                return Some(chars[start..i].iter().collect());
            }
        } else {
            i += 1;
        }
    }
    None
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// One video lesson within a course.
#[derive(Debug, Clone, PartialEq)]
pub struct Lesson {
    id: LessonId,
    course_id: CourseId,
    title: String,
    description: Option<String>,
    position: u32,
    duration_secs: u32,
    video_id: Option<VideoId>,
    is_preview: bool,
    created_at: DateTime<Utc>,
}

impl Lesson {
    /// Creates a new Lesson.
    ///
    /// A zero duration is legal at authoring time (the instructor has not
    /// filled it in yet); heartbeats against such a lesson are rejected at
    /// the handler level instead.
    ///
    /// # Errors
    ///
    /// Returns `LessonError` if the title is blank or the video reference
    /// cannot be normalized.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: LessonId,
        course_id: CourseId,
        title: impl Into<String>,
        description: Option<String>,
        position: u32,
        duration_secs: u32,
        video: Option<&str>,
        is_preview: bool,
        created_at: DateTime<Utc>,
    ) -> Result<Self, LessonError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(LessonError::EmptyTitle);
        }

        let description = description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        let video_id = video.map(VideoId::parse).transpose()?;

        Ok(Self {
            id,
            course_id,
            title: title.trim().to_owned(),
            description,
            position,
            duration_secs,
            video_id,
            is_preview,
            created_at,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> LessonId {
        self.id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn position(&self) -> u32 {
        self.position
    }

    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    #[must_use]
    pub fn video_id(&self) -> Option<&VideoId> {
        self.video_id.as_ref()
    }

    #[must_use]
    pub fn is_preview(&self) -> bool {
        self.is_preview
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn video_id_accepts_common_url_forms() {
        let cases = [
            "dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube-nocookie.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&feature=embed",
            "dQw4w9WgXcQ?rel=0",
        ];
        for case in cases {
            assert_eq!(VideoId::parse(case).unwrap().as_str(), "dQw4w9WgXcQ", "{case}");
        }
    }

    #[test]
    fn video_id_rejects_garbage() {
        assert!(VideoId::parse("").is_err());
        assert!(VideoId::parse("too-short").is_err());
        assert!(VideoId::parse("https://example.com/video").is_err());
    }

    #[test]
    fn embed_url_carries_player_flags() {
        let id = VideoId::parse("dQw4w9WgXcQ").unwrap();
        assert_eq!(
            id.embed_url(),
            "https://www.youtube.com/embed/dQw4w9WgXcQ?rel=0&modestbranding=1"
        );
    }

    #[test]
    fn lesson_new_rejects_empty_title() {
        let err = Lesson::new(
            LessonId::new(1),
            CourseId::new(1),
            "  ",
            None,
            0,
            600,
            None,
            false,
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, LessonError::EmptyTitle);
    }

    #[test]
    fn lesson_allows_zero_duration() {
        let lesson = Lesson::new(
            LessonId::new(1),
            CourseId::new(1),
            "Intro",
            None,
            0,
            0,
            None,
            true,
            fixed_now(),
        )
        .unwrap();
        assert_eq!(lesson.duration_secs(), 0);
        assert!(lesson.is_preview());
    }

    #[test]
    fn lesson_normalizes_pasted_video_url() {
        let lesson = Lesson::new(
            LessonId::new(2),
            CourseId::new(1),
            "Ownership",
            Some("moves and borrows".into()),
            1,
            900,
            Some("https://youtu.be/dQw4w9WgXcQ"),
            false,
            fixed_now(),
        )
        .unwrap();
        assert_eq!(lesson.video_id().unwrap().as_str(), "dQw4w9WgXcQ");
    }
}
