use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::require_text;

/// Upper bound on credits for a single course.
pub const MAX_COURSE_CREDITS: i32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Program {
    Associate,
    Bachelor,
    Master,
    Doctorate,
    PhD,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum CourseStatus {
    Draft,
    Published,
    Archived,
}

/// Read-only input to the record engine; owned by course administration.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: String,
    pub code: String,
    pub title: String,
    pub program: Program,
    pub credits: i32,
    pub semester: String,
    pub enrollment_limit: Option<i32>,
    pub status: CourseStatus,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourseRequest {
    pub code: String,
    pub title: String,
    pub program: Program,
    pub credits: i32,
    pub semester: String,
    pub enrollment_limit: Option<i32>,
    pub status: Option<CourseStatus>,
}

impl NewCourseRequest {
    pub fn validate(&self) -> Result<(), String> {
        require_text("code", &self.code)?;
        require_text("title", &self.title)?;
        require_text("semester", &self.semester)?;
        if !(1..=MAX_COURSE_CREDITS).contains(&self.credits) {
            return Err(format!("credits must be between 1 and {}", MAX_COURSE_CREDITS));
        }
        if matches!(self.enrollment_limit, Some(limit) if limit < 1) {
            return Err("enrollment_limit must be a positive integer".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCourseStatusRequest {
    pub status: CourseStatus,
}
