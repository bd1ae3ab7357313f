use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::engine::grade_scale::{Grade, grade_points};
use crate::error::TranscriptError;
use crate::models::{
    Course, Enrollment, EnrollmentStatus, MAX_COURSE_CREDITS, Transcript, TranscriptLine, TranscriptStatus,
};

impl TranscriptLine {
    /// Refuses a line for a course whose credits are outside `1..=MAX_COURSE_CREDITS`.
    pub fn new(course: &Course, grade: Grade) -> Result<Self, TranscriptError> {
        if !(1..=MAX_COURSE_CREDITS).contains(&course.credits) {
            return Err(TranscriptError::InvalidCredits {
                course_code: course.code.clone(),
            });
        }
        Ok(Self {
            course_code: course.code.clone(),
            course_title: course.title.clone(),
            credits: course.credits,
            grade,
            grade_points: f64::from(course.credits) * grade_points(Some(grade)),
        })
    }
}

fn round_two(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Builds a transcript snapshot for one student and semester.
///
/// Only completed, graded enrollments whose course resolves through `courses`
/// and belongs to `semester` contribute a line. Lines are ordered by course
/// code. The GPA is credit-weighted and rounded to two decimals, and the
/// cumulative GPA is the term GPA. The result starts out `completed`; the
/// caller downgrades it to `in-progress` when the term still has open work.
pub fn assemble_transcript(
    student_email: &str,
    semester: &str,
    completed_enrollments: &[Enrollment],
    courses: &HashMap<String, Course>,
) -> Result<Transcript, TranscriptError> {
    let mut lines = Vec::new();
    for enrollment in completed_enrollments {
        if enrollment.status != EnrollmentStatus::Completed
            || enrollment.student_email != student_email
        {
            continue;
        }
        let (Some(grade), Some(course)) = (enrollment.grade, courses.get(&enrollment.course_id)) else {
            continue;
        };
        if course.semester != semester {
            continue;
        }
        lines.push(TranscriptLine::new(course, grade)?);
    }

    if lines.is_empty() {
        return Err(TranscriptError::EmptyTerm {
            semester: semester.to_string(),
        });
    }
    lines.sort_by(|a, b| a.course_code.cmp(&b.course_code));

    let total_credits = lines.iter().try_fold(0i32, |total, line| {
        total
            .checked_add(line.credits)
            .ok_or_else(|| TranscriptError::InvalidCredits {
                course_code: line.course_code.clone(),
            })
    })?;
    let total_points: f64 = lines.iter().map(|l| l.grade_points).sum();
    let gpa = if total_credits > 0 {
        round_two(total_points / f64::from(total_credits))
    } else {
        0.0
    };

    Ok(Transcript {
        id: Uuid::new_v4().to_string(),
        student_email: student_email.to_string(),
        semester: semester.to_string(),
        lines,
        total_credits,
        gpa,
        cumulative_gpa: gpa,
        status: TranscriptStatus::Completed,
        generated_date: Utc::now().to_rfc3339(),
    })
}
