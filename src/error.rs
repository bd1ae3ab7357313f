use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Rejections produced by the admission controller. The variant order mirrors
/// the order in which the checks run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("student already holds an active enrollment in this course")]
    AlreadyEnrolled,

    #[error("course is full (limit {limit})")]
    CourseFull { limit: i32 },

    #[error("term load exceeded: already enrolled in {max} courses for {semester}")]
    TermLoadExceeded { semester: String, max: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot move from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("a completed enrollment requires a grade or a percentage")]
    MissingGrade,

    #[error("percentage must be between 0 and 100")]
    InvalidPercentage,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscriptError {
    #[error("no graded completions for {semester}")]
    EmptyTerm { semester: String },

    #[error("course {course_code} has no credits")]
    InvalidCredits { course_code: String },
}

/// Wrong secret on a certificate unlock. Carries nothing about the degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("access denied")]
pub struct AccessDenied;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Admission(#[from] AdmissionError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Transcript(#[from] TranscriptError),

    #[error(transparent)]
    AccessDenied(#[from] AccessDenied),

    #[error("Not found")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl AppError {
    /// Stable machine-readable code for the JSON body.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Database(_) | AppError::Migration(_) => "database",
            AppError::Admission(AdmissionError::AlreadyEnrolled) => "already_enrolled",
            AppError::Admission(AdmissionError::CourseFull { .. }) => "course_full",
            AppError::Admission(AdmissionError::TermLoadExceeded { .. }) => "term_load_exceeded",
            AppError::Transition(TransitionError::InvalidTransition { .. }) => "invalid_transition",
            AppError::Transition(TransitionError::MissingGrade) => "missing_grade",
            AppError::Transition(TransitionError::InvalidPercentage) => "invalid_percentage",
            AppError::Transcript(TranscriptError::EmptyTerm { .. }) => "empty_term",
            AppError::Transcript(TranscriptError::InvalidCredits { .. }) => "invalid_credits",
            AppError::AccessDenied(_) => "access_denied",
            AppError::NotFound => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::Conflict(_) => "conflict",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub kind: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind().to_string();
        let (status, error_message) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not Found".to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Admission(e) => (StatusCode::CONFLICT, e.to_string()),
            AppError::Transition(e @ TransitionError::InvalidTransition { .. }) => {
                (StatusCode::CONFLICT, e.to_string())
            }
            AppError::Transition(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            AppError::Transcript(e @ TranscriptError::EmptyTerm { .. }) => {
                (StatusCode::NOT_FOUND, e.to_string())
            }
            AppError::Transcript(e) => {
                error!("transcript invariant violated: {}", e);
                (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
            }
            AppError::AccessDenied(e) => (StatusCode::FORBIDDEN, e.to_string()),
            AppError::Database(e) => {
                error!("database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                )
            }
            AppError::Migration(e) => {
                error!("migration error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: status.to_string(),
            message: error_message,
            kind,
        });

        (status, body).into_response()
    }
}
