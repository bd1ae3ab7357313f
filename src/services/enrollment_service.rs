use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};

use crate::db::repository;
use crate::engine::admission::{self, AdmissionPolicy};
use crate::engine::lifecycle;
use crate::error::{AdmissionError, AppError};
use crate::models::{
    CompleteEnrollmentRequest, Enrollment, EnrollmentStatus, NewEnrollmentRequest, normalize_email,
};

/// Admission and lifecycle transitions over the enrollment table.
#[derive(Clone)]
pub struct EnrollmentService {
    db: SqlitePool,
    policy: AdmissionPolicy,
}

impl EnrollmentService {
    pub fn new(db: SqlitePool, policy: AdmissionPolicy) -> Self {
        Self { db, policy }
    }

    /// Runs the admission decision and the insert under one write lock.
    ///
    /// `BEGIN IMMEDIATE` takes SQLite's reserved lock before the roster and
    /// term-load counts are read, so two admissions can never both see the
    /// last free seat. Dropping the transaction uncommitted rolls it back,
    /// including when the request future is cancelled.
    pub async fn enroll(&self, req: NewEnrollmentRequest) -> Result<Enrollment, AppError> {
        let student_email = normalize_email(&req.student_email).map_err(AppError::BadRequest)?;

        let mut tx = self.db.begin_with("BEGIN IMMEDIATE").await?;

        let outcome = self.admit(&mut tx, &student_email, &req.course_id).await;
        match outcome {
            Ok(_) => tx.commit().await?,
            Err(_) => tx.rollback().await?,
        }

        match &outcome {
            Ok(enrollment) => info!(
                "admitted {} to course {} (enrollment {})",
                enrollment.student_email, enrollment.course_id, enrollment.id
            ),
            Err(AppError::Admission(reason)) => warn!(
                "admission rejected for {} in course {}: {}",
                student_email, req.course_id, reason
            ),
            Err(_) => {}
        }
        outcome
    }

    async fn admit(
        &self,
        conn: &mut SqliteConnection,
        student_email: &str,
        course_id: &str,
    ) -> Result<Enrollment, AppError> {
        let course = repository::find_course_by_id(&mut *conn, course_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let roster = repository::count_active_roster(&mut *conn, &course.id).await?;
        let term_load = repository::fetch_active_term_load(&mut *conn, student_email).await?;

        let enrollment = admission::try_enroll(
            student_email,
            &course,
            &term_load,
            usize::try_from(roster).unwrap_or(usize::MAX),
            &self.policy,
        )?;

        repository::insert_enrollment(&mut *conn, &enrollment)
            .await
            .map_err(|err| match err {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    AppError::Admission(AdmissionError::AlreadyEnrolled)
                }
                other => other.into(),
            })?;

        Ok(enrollment)
    }

    pub async fn drop_enrollment(&self, id: &str) -> Result<Enrollment, AppError> {
        let current = self.find(id).await?;
        let next = lifecycle::drop_enrollment(&current)
            .inspect_err(|e| warn!("drop refused for enrollment {}: {}", id, e))?;
        let dropped = self.persist_transition(&current, next).await?;
        info!("dropped enrollment {} ({})", dropped.id, dropped.student_email);
        Ok(dropped)
    }

    pub async fn complete_enrollment(
        &self,
        id: &str,
        req: CompleteEnrollmentRequest,
    ) -> Result<Enrollment, AppError> {
        let current = self.find(id).await?;
        let next = lifecycle::complete_enrollment(&current, req.grade, req.percentage)
            .inspect_err(|e| warn!("completion refused for enrollment {}: {}", id, e))?;
        let completed = self.persist_transition(&current, next).await?;
        info!(
            "completed enrollment {} with grade {}",
            completed.id,
            completed.grade.map(|g| g.as_str()).unwrap_or("-")
        );
        Ok(completed)
    }

    /// Hard-deletes an ungraded record. Completed history is permanent.
    pub async fn delete_enrollment(&self, id: &str) -> Result<(), AppError> {
        let current = self.find(id).await?;
        if current.grade.is_some() || current.status == EnrollmentStatus::Completed {
            return Err(AppError::Conflict(format!(
                "enrollment {} is graded history and cannot be deleted",
                id
            )));
        }
        if !repository::delete_ungraded_enrollment(&self.db, id).await? {
            return Err(AppError::Conflict(format!(
                "enrollment {} changed while being deleted",
                id
            )));
        }
        info!("deleted ungraded enrollment {}", id);
        Ok(())
    }

    pub async fn list(
        &self,
        student_email: Option<&str>,
        course_id: Option<&str>,
        status: Option<EnrollmentStatus>,
    ) -> Result<Vec<Enrollment>, AppError> {
        let student_email = student_email
            .map(normalize_email)
            .transpose()
            .map_err(AppError::BadRequest)?;
        let enrollments =
            repository::fetch_enrollments(&self.db, student_email.as_deref(), course_id, status).await?;
        Ok(enrollments)
    }

    /// Active enrollments of one course.
    pub async fn roster(&self, course_id: &str) -> Result<Vec<Enrollment>, AppError> {
        repository::find_course_by_id(&self.db, course_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let roster = repository::list_active_enrollments(&self.db, None, Some(course_id)).await?;
        Ok(roster)
    }

    async fn find(&self, id: &str) -> Result<Enrollment, AppError> {
        repository::find_enrollment_by_id(&self.db, id)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn persist_transition(
        &self,
        current: &Enrollment,
        next: Enrollment,
    ) -> Result<Enrollment, AppError> {
        if !repository::update_enrollment_status(&self.db, &next, current.status).await? {
            return Err(AppError::Conflict(format!(
                "enrollment {} changed while being updated",
                next.id
            )));
        }
        Ok(next)
    }
}
