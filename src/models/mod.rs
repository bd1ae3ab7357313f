pub mod course;
pub mod degree;
pub mod enrollment;
pub mod transcript;

pub use course::{
    Course, CourseStatus, MAX_COURSE_CREDITS, NewCourseRequest, Program, UpdateCourseStatusRequest,
};
pub use degree::{
    Certificate, CreatedDegree, Degree, DegreeStatus, NewDegreeRequest, ResetPasswordRequest,
    UnlockRequest, UpdateDegreeStatusRequest,
};
pub use enrollment::{
    CompleteEnrollmentRequest, EnrolledCourse, Enrollment, EnrollmentStatus, NewEnrollmentRequest,
};
pub use transcript::{GenerateTranscriptRequest, Transcript, TranscriptLine, TranscriptStatus};

pub use crate::engine::grade_scale::Grade;

/// Trims and lowercases a student email, rejecting values that cannot be one.
pub fn normalize_email(raw: &str) -> Result<String, String> {
    let email = raw.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(format!("invalid student email: {:?}", raw)),
    }
}

pub(crate) fn require_text(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} must not be empty", field))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ada@Uni.EDU ").unwrap(), "ada@uni.edu");
        assert!(normalize_email("nobody").is_err());
        assert!(normalize_email("@uni.edu").is_err());
        assert!(normalize_email("ada@").is_err());
    }
}
