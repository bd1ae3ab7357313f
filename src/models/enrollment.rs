use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::engine::grade_scale::Grade;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Active,
    Completed,
    Dropped,
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EnrollmentStatus::Active => "active",
            EnrollmentStatus::Completed => "completed",
            EnrollmentStatus::Dropped => "dropped",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Enrollment {
    pub id: String,
    pub course_id: String,
    pub student_email: String,
    pub status: EnrollmentStatus,
    pub grade: Option<Grade>,
    pub percentage: Option<f64>,
    pub enrolled_at: String,
    pub updated_at: String,
}

/// An enrollment joined with the semester label of its course, which is what
/// the per-term load check counts against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct EnrolledCourse {
    pub enrollment_id: String,
    pub course_id: String,
    pub semester: String,
    pub status: EnrollmentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEnrollmentRequest {
    pub course_id: String,
    pub student_email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompleteEnrollmentRequest {
    pub grade: Option<Grade>,
    pub percentage: Option<f64>,
}
