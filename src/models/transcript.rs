use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::engine::grade_scale::Grade;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum TranscriptStatus {
    #[serde(rename = "completed")]
    #[sqlx(rename = "completed")]
    Completed,
    #[serde(rename = "in-progress")]
    #[sqlx(rename = "in-progress")]
    InProgress,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TranscriptLine {
    pub course_code: String,
    pub course_title: String,
    pub credits: i32,
    pub grade: Grade,
    pub grade_points: f64,
}

/// A generated transcript snapshot. Rows are insert-only; regenerating a term
/// produces a new record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Transcript {
    pub id: String,
    pub student_email: String,
    pub semester: String,
    #[sqlx(skip)]
    pub lines: Vec<TranscriptLine>,
    pub total_credits: i32,
    pub gpa: f64,
    /// Equal to `gpa`: prior terms are not folded in.
    pub cumulative_gpa: f64,
    pub status: TranscriptStatus,
    pub generated_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateTranscriptRequest {
    pub student_email: String,
    pub semester: String,
}
