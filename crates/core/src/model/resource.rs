use chrono::{DateTime, Utc};
use thiserror::Error;
use url::Url;

use crate::model::ids::{LessonId, ResourceId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResourceError {
    #[error("resource title cannot be empty")]
    EmptyTitle,

    #[error("invalid resource URL: {0}")]
    InvalidUrl(String),

    #[error("unknown resource kind: {0}")]
    UnknownKind(String),
}

/// Kind of supplementary material attached to a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Pdf,
    Doc,
    Link,
    Other,
}

impl ResourceKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Pdf => "pdf",
            ResourceKind::Doc => "doc",
            ResourceKind::Link => "link",
            ResourceKind::Other => "other",
        }
    }

    /// Parses a stored kind string.
    ///
    /// # Errors
    ///
    /// Returns `ResourceError::UnknownKind` for anything else.
    pub fn parse(value: &str) -> Result<Self, ResourceError> {
        match value {
            "pdf" => Ok(ResourceKind::Pdf),
            "doc" => Ok(ResourceKind::Doc),
            "link" => Ok(ResourceKind::Link),
            "other" => Ok(ResourceKind::Other),
            other => Err(ResourceError::UnknownKind(other.to_string())),
        }
    }
}

/// Downloadable or linked material attached to a lesson, surfaced in the
/// initial-state payload alongside the lesson itself.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonResource {
    id: ResourceId,
    lesson_id: LessonId,
    title: String,
    kind: ResourceKind,
    url: Url,
    created_at: DateTime<Utc>,
}

impl LessonResource {
    /// Creates a new LessonResource.
    ///
    /// # Errors
    ///
    /// Returns `ResourceError` if the title is blank or the URL fails to
    /// parse.
    pub fn new(
        id: ResourceId,
        lesson_id: LessonId,
        title: impl Into<String>,
        kind: ResourceKind,
        url: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ResourceError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ResourceError::EmptyTitle);
        }

        let url =
            Url::parse(url.trim()).map_err(|_| ResourceError::InvalidUrl(url.to_string()))?;

        Ok(Self {
            id,
            lesson_id,
            title: title.trim().to_owned(),
            kind,
            url,
            created_at,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn resource_requires_valid_url() {
        let err = LessonResource::new(
            ResourceId::new(1),
            LessonId::new(1),
            "Slides",
            ResourceKind::Pdf,
            "not a url",
            fixed_now(),
        )
        .unwrap_err();
        assert!(matches!(err, ResourceError::InvalidUrl(_)));
    }

    #[test]
    fn resource_happy_path() {
        let res = LessonResource::new(
            ResourceId::new(1),
            LessonId::new(2),
            "  Slides  ",
            ResourceKind::Pdf,
            "https://files.example.com/slides.pdf",
            fixed_now(),
        )
        .unwrap();
        assert_eq!(res.title(), "Slides");
        assert_eq!(res.kind().as_str(), "pdf");
        assert_eq!(res.url().as_str(), "https://files.example.com/slides.pdf");
    }

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [
            ResourceKind::Pdf,
            ResourceKind::Doc,
            ResourceKind::Link,
            ResourceKind::Other,
        ] {
            assert_eq!(ResourceKind::parse(kind.as_str()).unwrap(), kind);
        }
        assert!(ResourceKind::parse("video").is_err());
    }
}
