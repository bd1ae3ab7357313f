use chrono::Utc;

use crate::engine::grade_scale::{Grade, percentage_to_grade};
use crate::error::TransitionError;
use crate::models::{Enrollment, EnrollmentStatus};

impl EnrollmentStatus {
    /// `active` is the only state with outgoing edges.
    pub fn can_transition_to(self, next: EnrollmentStatus) -> bool {
        matches!(
            (self, next),
            (EnrollmentStatus::Active, EnrollmentStatus::Dropped)
                | (EnrollmentStatus::Active, EnrollmentStatus::Completed)
        )
    }
}

fn ensure_transition(
    enrollment: &Enrollment,
    next: EnrollmentStatus,
) -> Result<(), TransitionError> {
    if enrollment.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(TransitionError::InvalidTransition {
            from: enrollment.status.to_string(),
            to: next.to_string(),
        })
    }
}

/// `active -> dropped`. Unconditional for active records.
pub fn drop_enrollment(enrollment: &Enrollment) -> Result<Enrollment, TransitionError> {
    ensure_transition(enrollment, EnrollmentStatus::Dropped)?;
    Ok(Enrollment {
        status: EnrollmentStatus::Dropped,
        updated_at: Utc::now().to_rfc3339(),
        ..enrollment.clone()
    })
}

/// `active -> completed`, with the grade set in the same step.
///
/// A letter grade wins when given; otherwise it is derived from `percentage`.
/// With neither, the transition is refused rather than producing a completed
/// record without a grade.
pub fn complete_enrollment(
    enrollment: &Enrollment,
    grade: Option<Grade>,
    percentage: Option<f64>,
) -> Result<Enrollment, TransitionError> {
    ensure_transition(enrollment, EnrollmentStatus::Completed)?;

    if let Some(score) = percentage {
        if !(0.0..=100.0).contains(&score) {
            return Err(TransitionError::InvalidPercentage);
        }
    }

    let grade = grade
        .or_else(|| percentage.map(percentage_to_grade))
        .ok_or(TransitionError::MissingGrade)?;

    Ok(Enrollment {
        status: EnrollmentStatus::Completed,
        grade: Some(grade),
        percentage,
        updated_at: Utc::now().to_rfc3339(),
        ..enrollment.clone()
    })
}
