use std::sync::Arc;

use tracing::info;

use setu_core::Clock;
use setu_core::model::{Certificate, LearnerId};
use storage::repository::{
    CertificateRepository, CourseRepository, EnrollmentRepository, StorageError,
};

use crate::error::{CertificateServiceError, DomainError, ValidationError};

/// Issues and verifies course certificates.
pub struct CertificateService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    certificates: Arc<dyn CertificateRepository>,
}

impl CertificateService {
    #[must_use]
    pub fn new(
        clock: Clock,
        courses: Arc<dyn CourseRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        certificates: Arc<dyn CertificateRepository>,
    ) -> Self {
        Self {
            clock,
            courses,
            enrollments,
            certificates,
        }
    }

    /// Issue the certificate for an enrollment whose latch is set.
    ///
    /// Idempotent: an already-issued certificate is returned as-is, and a
    /// concurrent issue that loses the insert race resolves to the stored
    /// record. The mastery score at issue time is frozen on the certificate.
    ///
    /// # Errors
    ///
    /// `ValidationError` for an unknown course or unenrolled learner,
    /// `DomainError::CertificateNotEarned` while the latch is unset.
    pub async fn issue(
        &self,
        learner_id: LearnerId,
        course_slug: &str,
        student_name: &str,
    ) -> Result<Certificate, CertificateServiceError> {
        let course = match self.courses.get_course_by_slug(course_slug).await {
            Ok(course) => course,
            Err(StorageError::NotFound) => {
                return Err(ValidationError::CourseNotFound(course_slug.to_owned()).into());
            }
            Err(err) => return Err(err.into()),
        };

        let enrollment = match self.enrollments.get_enrollment(learner_id, course.id()).await {
            Ok(enrollment) => enrollment,
            Err(StorageError::NotFound) => {
                return Err(ValidationError::NotEnrolled {
                    learner_id,
                    course_slug: course_slug.to_owned(),
                }
                .into());
            }
            Err(err) => return Err(err.into()),
        };

        if let Some(existing) = self
            .certificates
            .certificate_for_enrollment(enrollment.id())
            .await?
        {
            return Ok(existing);
        }

        if !enrollment.certificate_unlocked() {
            return Err(DomainError::CertificateNotEarned(course_slug.to_owned()).into());
        }

        let certificate = Certificate::issue(&enrollment, &course, student_name, self.clock.now())?;

        match self.certificates.insert_certificate(&certificate).await {
            Ok(()) => {
                info!(
                    enrollment = %enrollment.id(),
                    certificate = certificate.certificate_id(),
                    "certificate issued"
                );
                Ok(certificate)
            }
            // Lost an insert race: another request issued it first.
            Err(StorageError::Conflict) => self
                .certificates
                .certificate_for_enrollment(enrollment.id())
                .await?
                .ok_or_else(|| StorageError::Conflict.into()),
            Err(err) => Err(err.into()),
        }
    }

    /// Public verification lookup by certificate id.
    ///
    /// # Errors
    ///
    /// `StorageError` on lookup failure; an unknown id is `Ok(None)`, not an
    /// error.
    pub async fn verify(
        &self,
        certificate_id: &str,
    ) -> Result<Option<Certificate>, CertificateServiceError> {
        Ok(self.certificates.find_by_public_id(certificate_id).await?)
    }
}
