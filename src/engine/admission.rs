use chrono::Utc;
use uuid::Uuid;

use crate::error::AdmissionError;
use crate::models::{Course, EnrolledCourse, Enrollment, EnrollmentStatus};

pub const DEFAULT_MAX_COURSES_PER_SEMESTER: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionPolicy {
    pub max_courses_per_semester: usize,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self {
            max_courses_per_semester: DEFAULT_MAX_COURSES_PER_SEMESTER,
        }
    }
}

/// Decides whether `student_email` may be admitted to `course`.
///
/// Checks run in a fixed order and the first failure wins: duplicate guard,
/// course capacity, then the per-semester load cap. `student_enrollments` is
/// the student's enrollments joined with their course semesters; only the
/// active ones are counted. On success a fresh active enrollment is returned
/// for the caller to persist.
pub fn try_enroll(
    student_email: &str,
    course: &Course,
    student_enrollments: &[EnrolledCourse],
    active_roster_count: usize,
    policy: &AdmissionPolicy,
) -> Result<Enrollment, AdmissionError> {
    let active = || {
        student_enrollments
            .iter()
            .filter(|e| e.status == EnrollmentStatus::Active)
    };

    if active().any(|e| e.course_id == course.id) {
        return Err(AdmissionError::AlreadyEnrolled);
    }

    if let Some(limit) = course.enrollment_limit {
        if active_roster_count >= usize::try_from(limit).unwrap_or(0) {
            return Err(AdmissionError::CourseFull { limit });
        }
    }

    let term_load = active().filter(|e| e.semester == course.semester).count();
    if term_load >= policy.max_courses_per_semester {
        return Err(AdmissionError::TermLoadExceeded {
            semester: course.semester.clone(),
            max: policy.max_courses_per_semester,
        });
    }

    let now = Utc::now().to_rfc3339();
    Ok(Enrollment {
        id: Uuid::new_v4().to_string(),
        course_id: course.id.clone(),
        student_email: student_email.to_string(),
        status: EnrollmentStatus::Active,
        grade: None,
        percentage: None,
        enrolled_at: now.clone(),
        updated_at: now,
    })
}
