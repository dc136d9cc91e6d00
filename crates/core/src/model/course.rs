use chrono::{DateTime, Utc};
use thiserror::Error;
use url::Url;

use crate::model::ids::CourseId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("course slug cannot be empty")]
    EmptySlug,

    #[error("invalid course slug: {0}")]
    InvalidSlug(String),

    #[error("invalid thumbnail URL: {0}")]
    InvalidThumbnailUrl(String),

    #[error("unknown course level: {0}")]
    UnknownLevel(String),
}

//
// ─── COURSE LEVEL ──────────────────────────────────────────────────────────────
//

/// Difficulty tier a course is marketed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseLevel {
    Beginner,
    Intermediate,
    Advanced,
    AllLevels,
}

impl CourseLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CourseLevel::Beginner => "beginner",
            CourseLevel::Intermediate => "intermediate",
            CourseLevel::Advanced => "advanced",
            CourseLevel::AllLevels => "all",
        }
    }

    /// Parses a stored level string.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::UnknownLevel` for anything else.
    pub fn parse(value: &str) -> Result<Self, CourseError> {
        match value {
            "beginner" => Ok(CourseLevel::Beginner),
            "intermediate" => Ok(CourseLevel::Intermediate),
            "advanced" => Ok(CourseLevel::Advanced),
            "all" => Ok(CourseLevel::AllLevels),
            other => Err(CourseError::UnknownLevel(other.to_string())),
        }
    }
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// A published course: the unit lessons and quizzes hang off.
///
/// Only the fields the progress computation and the initial-state payload
/// need survive here; instructor/pricing/catalog concerns live outside this
/// crate.
#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    id: CourseId,
    slug: String,
    title: String,
    description: Option<String>,
    level: CourseLevel,
    thumbnail_url: Option<Url>,
    created_at: DateTime<Utc>,
}

impl Course {
    /// Creates a new Course.
    ///
    /// # Errors
    ///
    /// Returns `CourseError` if the title is blank, the slug is blank or
    /// contains characters outside `[a-z0-9-]`, or the thumbnail URL fails
    /// to parse.
    pub fn new(
        id: CourseId,
        slug: impl Into<String>,
        title: impl Into<String>,
        description: Option<String>,
        level: CourseLevel,
        thumbnail_url: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CourseError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CourseError::EmptyTitle);
        }

        let slug = validate_slug(slug.into())?;

        let description = description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        let thumbnail_url = thumbnail_url
            .map(|raw| {
                Url::parse(raw.trim())
                    .map_err(|_| CourseError::InvalidThumbnailUrl(raw.to_string()))
            })
            .transpose()?;

        Ok(Self {
            id,
            slug,
            title: title.trim().to_owned(),
            description,
            level,
            thumbnail_url,
            created_at,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> CourseId {
        self.id
    }

    #[must_use]
    pub fn slug(&self) -> &str {
        &self.slug
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
    pub fn level(&self) -> CourseLevel {
        self.level
    }

    #[must_use]
    pub fn thumbnail_url(&self) -> Option<&Url> {
        self.thumbnail_url.as_ref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

fn validate_slug(raw: String) -> Result<String, CourseError> {
    let slug = raw.trim().to_owned();
    if slug.is_empty() {
        return Err(CourseError::EmptySlug);
    }
    let valid = slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !valid || slug.starts_with('-') || slug.ends_with('-') {
        return Err(CourseError::InvalidSlug(slug));
    }
    Ok(slug)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
