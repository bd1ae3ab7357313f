use std::collections::HashMap;

use sqlx::SqlitePool;
use tracing::info;

use crate::db::repository;
use crate::engine::transcript;
use crate::error::AppError;
use crate::models::{
    EnrollmentStatus, GenerateTranscriptRequest, Transcript, TranscriptStatus, normalize_email,
};

#[derive(Clone)]
pub struct TranscriptService {
    db: SqlitePool,
}

impl TranscriptService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Assembles and stores a new transcript snapshot. Earlier snapshots for
    /// the same term are left untouched.
    pub async fn generate(&self, req: GenerateTranscriptRequest) -> Result<Transcript, AppError> {
        let student_email = normalize_email(&req.student_email).map_err(AppError::BadRequest)?;
        let semester = req.semester.trim();
        if semester.is_empty() {
            return Err(AppError::BadRequest("semester must not be empty".to_string()));
        }

        let mut tx = self.db.begin().await?;

        let courses: HashMap<_, _> = repository::list_courses_by_semester(&mut *tx, semester)
            .await?
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();
        let completed = repository::fetch_enrollments(
            &mut *tx,
            Some(&student_email),
            None,
            Some(EnrollmentStatus::Completed),
        )
        .await?;

        let mut transcript =
            transcript::assemble_transcript(&student_email, semester, &completed, &courses)?;
        if repository::count_active_in_semester(&mut *tx, &student_email, semester).await? > 0 {
            transcript.status = TranscriptStatus::InProgress;
        }

        repository::insert_transcript(&mut tx, &transcript).await?;
        tx.commit().await?;

        info!(
            "generated transcript {} for {} / {}: {} credits, gpa {:.2}",
            transcript.id, transcript.student_email, transcript.semester, transcript.total_credits, transcript.gpa
        );
        Ok(transcript)
    }

    pub async fn list(&self, student_email: &str) -> Result<Vec<Transcript>, AppError> {
        let student_email = normalize_email(student_email).map_err(AppError::BadRequest)?;
        let mut conn = self.db.acquire().await?;
        let transcripts = repository::fetch_transcripts(&mut conn, &student_email).await?;
        Ok(transcripts)
    }
}
