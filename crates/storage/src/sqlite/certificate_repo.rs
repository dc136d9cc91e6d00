use setu_core::model::{Certificate, EnrollmentId};

use super::{
    SqliteRepository,
    mapping::{id_i64, map_certificate_row},
};
use crate::repository::{CertificateRepository, StorageError};

fn conn_err(e: sqlx::Error) -> StorageError {
    match e.as_database_error() {
        Some(db) if db.is_unique_violation() => StorageError::Conflict,
        _ => StorageError::Connection(e.to_string()),
    }
}

#[async_trait::async_trait]
impl CertificateRepository for SqliteRepository {
    async fn insert_certificate(&self, certificate: &Certificate) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO certificates (
                certificate_id, enrollment_id, student_name, course_title,
                final_score, issued_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(certificate.certificate_id())
        .bind(id_i64("enrollment_id", certificate.enrollment_id().value())?)
        .bind(certificate.student_name())
        .bind(certificate.course_title())
        .bind(i64::from(certificate.final_score()))
        .bind(certificate.issued_at())
        .execute(&self.pool)
        .await
        .map_err(conn_err)?;

        Ok(())
    }

    async fn certificate_for_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Option<Certificate>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT certificate_id, enrollment_id, student_name, course_title,
                   final_score, issued_at
            FROM certificates
            WHERE enrollment_id = ?1
            ",
        )
        .bind(id_i64("enrollment_id", enrollment_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn_err)?;

        row.map(|r| map_certificate_row(&r)).transpose()
    }

    async fn find_by_public_id(
        &self,
        certificate_id: &str,
    ) -> Result<Option<Certificate>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT certificate_id, enrollment_id, student_name, course_title,
                   final_score, issued_at
            FROM certificates
            WHERE certificate_id = ?1
            ",
        )
        .bind(certificate_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn_err)?;

        row.map(|r| map_certificate_row(&r)).transpose()
    }
}
