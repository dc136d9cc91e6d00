use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::model::course::Course;
use crate::model::enrollment::Enrollment;
use crate::model::ids::EnrollmentId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CertificateError {
    #[error("certificate is not unlocked for this enrollment")]
    NotEarned,

    #[error("student name cannot be empty")]
    EmptyStudentName,
}

//
// ─── CERTIFICATE ───────────────────────────────────────────────────────────────
//

/// Issued course certificate, verifiable by its public id.
///
/// The public id has the form `SS-XXXXXXXX-<course id>` where the middle
/// section is eight uppercase hex characters drawn from a v4 UUID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    certificate_id: String,
    enrollment_id: EnrollmentId,
    student_name: String,
    course_title: String,
    final_score: u8,
    issued_at: DateTime<Utc>,
}

impl Certificate {
    /// Issue a certificate for an enrollment that has unlocked one.
    ///
    /// The mastery score at issue time is frozen as `final_score`.
    ///
    /// # Errors
    ///
    /// Returns `CertificateError::NotEarned` while the enrollment's
    /// certificate latch is unset, or `EmptyStudentName` for a blank name.
    pub fn issue(
        enrollment: &Enrollment,
        course: &Course,
        student_name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, CertificateError> {
        if !enrollment.certificate_unlocked() {
            return Err(CertificateError::NotEarned);
        }

        let student_name = student_name.into();
        if student_name.trim().is_empty() {
            return Err(CertificateError::EmptyStudentName);
        }

        let serial = Uuid::new_v4().simple().to_string()[..8].to_ascii_uppercase();

        Ok(Self {
            certificate_id: format!("SS-{serial}-{}", course.id()),
            enrollment_id: enrollment.id(),
            student_name: student_name.trim().to_owned(),
            course_title: course.title().to_owned(),
            final_score: enrollment.mastery_score(),
            issued_at: now,
        })
    }

    /// Rebuild a certificate from storage.
    #[must_use]
    pub fn from_persisted(
        certificate_id: String,
        enrollment_id: EnrollmentId,
        student_name: String,
        course_title: String,
        final_score: u8,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            certificate_id,
            enrollment_id,
            student_name,
            course_title,
            final_score,
            issued_at,
        }
    }

    // Accessors
    #[must_use]
    pub fn certificate_id(&self) -> &str {
        &self.certificate_id
    }

    #[must_use]
    pub fn enrollment_id(&self) -> EnrollmentId {
        self.enrollment_id
    }

    #[must_use]
    pub fn student_name(&self) -> &str {
        &self.student_name
    }

    #[must_use]
    pub fn course_title(&self) -> &str {
        &self.course_title
    }

    #[must_use]
    pub fn final_score(&self) -> u8 {
        self.final_score
    }

    #[must_use]
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
