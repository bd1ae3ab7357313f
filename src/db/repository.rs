use chrono::Utc;
use sqlx::{Executor, Sqlite, SqliteConnection};
use uuid::Uuid;

use crate::models::{
    Course, CourseStatus, Degree, DegreeStatus, EnrolledCourse, Enrollment, EnrollmentStatus,
    NewCourseRequest, Transcript, TranscriptLine,
};

pub async fn insert_course<'e, E>(db: E, req: NewCourseRequest) -> Result<Course, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now().to_rfc3339();
    let course = Course {
        id: Uuid::new_v4().to_string(),
        code: req.code.trim().to_string(),
        title: req.title.trim().to_string(),
        program: req.program,
        credits: req.credits,
        semester: req.semester.trim().to_string(),
        enrollment_limit: req.enrollment_limit,
        status: req.status.unwrap_or(CourseStatus::Draft),
        created_at: now.clone(),
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO courses
            (id, code, title, program, credits, semester, enrollment_limit,
            status, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&course.id)
    .bind(&course.code)
    .bind(&course.title)
    .bind(course.program)
    .bind(course.credits)
    .bind(&course.semester)
    .bind(course.enrollment_limit)
    .bind(course.status)
    .bind(&course.created_at)
    .bind(&course.updated_at)
    .execute(db)
    .await?;

    Ok(course)
}

/// All courses, or only those of one semester.
pub async fn fetch_courses<'e, E>(db: E, semester: Option<&str>) -> Result<Vec<Course>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Course>(
        r#"
        SELECT id, code, title, program, credits, semester, enrollment_limit,
            status, created_at, updated_at
        FROM courses
        WHERE (?1 IS NULL OR semester = ?1)
        ORDER BY semester, code
        "#,
    )
    .bind(semester)
    .fetch_all(db)
    .await
}

pub async fn list_courses_by_semester<'e, E>(db: E, semester: &str) -> Result<Vec<Course>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    fetch_courses(db, Some(semester)).await
}

pub async fn find_course_by_id<'e, E>(db: E, id: &str) -> Result<Option<Course>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Course>(
        "SELECT id, code, title, program, credits, semester, enrollment_limit, status, created_at, updated_at FROM courses WHERE id = ?"
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn update_course_status<'e, E>(
    db: E,
    id: &str,
    status: CourseStatus,
) -> Result<Option<Course>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now().to_rfc3339();
    sqlx::query_as::<_, Course>(
        r#"
        UPDATE courses
        SET status = ?1,
            updated_at = ?2
        WHERE id = ?3
        RETURNING id, code, title, program, credits, semester, enrollment_limit,
            status, created_at, updated_at
        "#,
    )
    .bind(status)
    .bind(now)
    .bind(id)
    .fetch_optional(db)
    .await
}

/// Deletes a course nothing refers to. Returns false when the course is
/// missing or still has enrollments.
pub async fn delete_unreferenced_course<'e, E>(db: E, id: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        DELETE FROM courses
        WHERE id = ?1
            AND NOT EXISTS (SELECT 1 FROM enrollments WHERE course_id = ?1)
        "#,
    )
    .bind(id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

pub async fn insert_enrollment<'e, E>(db: E, enrollment: &Enrollment) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO enrollments
            (id, course_id, student_email, status, grade, percentage,
            enrolled_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&enrollment.id)
    .bind(&enrollment.course_id)
    .bind(&enrollment.student_email)
    .bind(enrollment.status)
    .bind(enrollment.grade)
    .bind(enrollment.percentage)
    .bind(&enrollment.enrolled_at)
    .bind(&enrollment.updated_at)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn find_enrollment_by_id<'e, E>(db: E, id: &str) -> Result<Option<Enrollment>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Enrollment>(
        "SELECT id, course_id, student_email, status, grade, percentage, enrolled_at, updated_at FROM enrollments WHERE id = ?"
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

/// Enrollments narrowed by any combination of student, course and status.
pub async fn fetch_enrollments<'e, E>(
    db: E,
    student_email: Option<&str>,
    course_id: Option<&str>,
    status: Option<EnrollmentStatus>,
) -> Result<Vec<Enrollment>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Enrollment>(
        r#"
        SELECT id, course_id, student_email, status, grade, percentage,
            enrolled_at, updated_at
        FROM enrollments
        WHERE (?1 IS NULL OR student_email = ?1)
            AND (?2 IS NULL OR course_id = ?2)
            AND (?3 IS NULL OR status = ?3)
        ORDER BY enrolled_at, id
        "#,
    )
    .bind(student_email)
    .bind(course_id)
    .bind(status)
    .fetch_all(db)
    .await
}

pub async fn list_active_enrollments<'e, E>(
    db: E,
    student_email: Option<&str>,
    course_id: Option<&str>,
) -> Result<Vec<Enrollment>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    fetch_enrollments(db, student_email, course_id, Some(EnrollmentStatus::Active)).await
}

/// The student's active enrollments with the semester of each course.
pub async fn fetch_active_term_load<'e, E>(
    db: E,
    student_email: &str,
) -> Result<Vec<EnrolledCourse>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, EnrolledCourse>(
        r#"
        SELECT e.id AS enrollment_id,
            e.course_id AS course_id,
            c.semester AS semester,
            e.status AS status
        FROM enrollments e
        JOIN courses c ON c.id = e.course_id
        WHERE e.student_email = ?1
            AND e.status = 'active'
        "#,
    )
    .bind(student_email)
    .fetch_all(db)
    .await
}

pub async fn count_active_roster<'e, E>(db: E, course_id: &str) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM enrollments WHERE course_id = ? AND status = 'active'"
    )
    .bind(course_id)
    .fetch_one(db)
    .await
}

pub async fn count_active_in_semester<'e, E>(
    db: E,
    student_email: &str,
    semester: &str,
) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM enrollments e
        JOIN courses c ON c.id = e.course_id
        WHERE e.student_email = ?1
            AND c.semester = ?2
            AND e.status = 'active'
        "#,
    )
    .bind(student_email)
    .bind(semester)
    .fetch_one(db)
    .await
}

/// Writes the new status, grade and percentage, but only while the stored row
/// is still in `expected`. Returns false when another writer got there first.
pub async fn update_enrollment_status<'e, E>(
    db: E,
    enrollment: &Enrollment,
    expected: EnrollmentStatus,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE enrollments
        SET status = ?1,
            grade = ?2,
            percentage = ?3,
            updated_at = ?4
        WHERE id = ?5
            AND status = ?6
        "#,
    )
    .bind(enrollment.status)
    .bind(enrollment.grade)
    .bind(enrollment.percentage)
    .bind(&enrollment.updated_at)
    .bind(&enrollment.id)
    .bind(expected)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

/// Graded and completed rows are history and are never removed.
pub async fn delete_ungraded_enrollment<'e, E>(db: E, id: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        DELETE FROM enrollments
        WHERE id = ?1
            AND grade IS NULL
            AND status != 'completed'
        "#,
    )
    .bind(id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

/// Inserts the transcript header and its lines. Run it inside a transaction.
pub async fn insert_transcript(
    conn: &mut SqliteConnection,
    transcript: &Transcript,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO transcripts
            (id, student_email, semester, total_credits, gpa, cumulative_gpa,
            status, generated_date)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&transcript.id)
    .bind(&transcript.student_email)
    .bind(&transcript.semester)
    .bind(transcript.total_credits)
    .bind(transcript.gpa)
    .bind(transcript.cumulative_gpa)
    .bind(transcript.status)
    .bind(&transcript.generated_date)
    .execute(&mut *conn)
    .await?;

    for (position, line) in transcript.lines.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO transcript_lines
                (transcript_id, position, course_code, course_title, credits,
                grade, grade_points)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&transcript.id)
        .bind(position as i64)
        .bind(&line.course_code)
        .bind(&line.course_title)
        .bind(line.credits)
        .bind(line.grade)
        .bind(line.grade_points)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Every transcript generated for the student, newest first, lines included.
pub async fn fetch_transcripts(
    conn: &mut SqliteConnection,
    student_email: &str,
) -> Result<Vec<Transcript>, sqlx::Error> {
    let mut transcripts = sqlx::query_as::<_, Transcript>(
        r#"
        SELECT id, student_email, semester, total_credits, gpa, cumulative_gpa,
            status, generated_date
        FROM transcripts
        WHERE student_email = ?1
        ORDER BY generated_date DESC, rowid DESC
        "#,
    )
    .bind(student_email)
    .fetch_all(&mut *conn)
    .await?;

    for transcript in &mut transcripts {
        transcript.lines = sqlx::query_as::<_, TranscriptLine>(
            r#"
            SELECT course_code, course_title, credits, grade, grade_points
            FROM transcript_lines
            WHERE transcript_id = ?1
            ORDER BY position
            "#,
        )
        .bind(&transcript.id)
        .fetch_all(&mut *conn)
        .await?;
    }

    Ok(transcripts)
}

pub async fn insert_degree<'e, E>(db: E, degree: &Degree) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO degrees
            (id, student_email, degree_title, college_name, graduation_date,
            status, access_password, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&degree.id)
    .bind(&degree.student_email)
    .bind(&degree.degree_title)
    .bind(&degree.college_name)
    .bind(&degree.graduation_date)
    .bind(degree.status)
    .bind(&degree.access_password)
    .bind(&degree.created_at)
    .bind(&degree.updated_at)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn find_degree_by_id<'e, E>(db: E, id: &str) -> Result<Option<Degree>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Degree>(
        "SELECT id, student_email, degree_title, college_name, graduation_date, status, access_password, created_at, updated_at FROM degrees WHERE id = ?"
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn fetch_degrees<'e, E>(db: E, student_email: Option<&str>) -> Result<Vec<Degree>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Degree>(
        r#"
        SELECT id, student_email, degree_title, college_name, graduation_date,
            status, access_password, created_at, updated_at
        FROM degrees
        WHERE (?1 IS NULL OR student_email = ?1)
        ORDER BY created_at DESC, id
        "#,
    )
    .bind(student_email)
    .fetch_all(db)
    .await
}

/// Same compare-and-set shape as [`update_enrollment_status`].
pub async fn update_degree_status<'e, E>(
    db: E,
    degree: &Degree,
    expected: DegreeStatus,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE degrees
        SET status = ?1,
            updated_at = ?2
        WHERE id = ?3
            AND status = ?4
        "#,
    )
    .bind(degree.status)
    .bind(&degree.updated_at)
    .bind(&degree.id)
    .bind(expected)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

pub async fn update_degree_password<'e, E>(
    db: E,
    id: &str,
    sealed_password: &str,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"
        UPDATE degrees
        SET access_password = ?1,
            updated_at = ?2
        WHERE id = ?3
        "#,
    )
    .bind(sealed_password)
    .bind(now)
    .bind(id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::grade_scale::Grade;
    use crate::models::{Program, TranscriptStatus};
    use sqlx::SqlitePool;

    async fn setup_test_db() -> SqlitePool {
        crate::db::connect("sqlite::memory:", 1)
            .await
            .expect("Failed to create test db")
    }

    fn course_req(code: &str, semester: &str) -> NewCourseRequest {
        NewCourseRequest {
            code: code.to_string(),
            title: format!("{} title", code),
            program: Program::Bachelor,
            credits: 3,
            semester: semester.to_string(),
            enrollment_limit: Some(30),
            status: Some(CourseStatus::Published),
        }
    }

    fn enrollment(id: &str, course_id: &str, email: &str, status: EnrollmentStatus) -> Enrollment {
        let now = Utc::now().to_rfc3339();
        Enrollment {
            id: id.to_string(),
            course_id: course_id.to_string(),
            student_email: email.to_string(),
            status,
            grade: None,
            percentage: None,
            enrolled_at: now.clone(),
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch_course() {
        let pool = setup_test_db().await;

        let course = insert_course(&pool, course_req("CS101", "Fall 2024"))
            .await
            .expect("Failed to insert course");
        insert_course(&pool, course_req("CS201", "Spring 2025"))
            .await
            .expect("Failed to insert course");

        let found = find_course_by_id(&pool, &course.id)
            .await
            .expect("Failed to fetch course")
            .expect("Course not found");
        assert_eq!(found.code, "CS101");
        assert_eq!(found.program, Program::Bachelor);
        assert_eq!(found.enrollment_limit, Some(30));

        assert_eq!(fetch_courses(&pool, None).await.unwrap().len(), 2);
        let fall = list_courses_by_semester(&pool, "Fall 2024").await.unwrap();
        assert_eq!(fall.len(), 1);
        assert_eq!(fall[0].id, course.id);
    }

    #[tokio::test]
    async fn test_update_course_status() {
        let pool = setup_test_db().await;
        let course = insert_course(&pool, course_req("CS101", "Fall 2024")).await.unwrap();

        let archived = update_course_status(&pool, &course.id, CourseStatus::Archived)
            .await
            .unwrap()
            .expect("Course not found");
        assert_eq!(archived.status, CourseStatus::Archived);
        assert!(update_course_status(&pool, "missing", CourseStatus::Draft).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_referenced_course_is_not_deleted() {
        let pool = setup_test_db().await;
        let used = insert_course(&pool, course_req("CS101", "Fall 2024")).await.unwrap();
        let unused = insert_course(&pool, course_req("CS102", "Fall 2024")).await.unwrap();
        insert_enrollment(&pool, &enrollment("e1", &used.id, "ada@uni.edu", EnrollmentStatus::Active))
            .await
            .unwrap();

        assert!(!delete_unreferenced_course(&pool, &used.id).await.unwrap());
        assert!(delete_unreferenced_course(&pool, &unused.id).await.unwrap());
        assert!(find_course_by_id(&pool, &unused.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_one_active_enrollment_per_student_and_course() {
        let pool = setup_test_db().await;
        let course = insert_course(&pool, course_req("CS101", "Fall 2024")).await.unwrap();

        insert_enrollment(&pool, &enrollment("e1", &course.id, "ada@uni.edu", EnrollmentStatus::Active))
            .await
            .unwrap();
        let err = insert_enrollment(&pool, &enrollment("e2", &course.id, "ada@uni.edu", EnrollmentStatus::Active))
            .await
            .expect_err("second active row must be rejected");
        match err {
            sqlx::Error::Database(db) => assert!(db.is_unique_violation()),
            other => panic!("unexpected error: {:?}", other),
        }

        insert_enrollment(&pool, &enrollment("e3", &course.id, "ada@uni.edu", EnrollmentStatus::Dropped))
            .await
            .expect("dropped rows do not count");
        assert_eq!(count_active_roster(&pool, &course.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_term_load_and_filters() {
        let pool = setup_test_db().await;
        let fall = insert_course(&pool, course_req("CS101", "Fall 2024")).await.unwrap();
        let spring = insert_course(&pool, course_req("CS102", "Spring 2025")).await.unwrap();
        insert_enrollment(&pool, &enrollment("e1", &fall.id, "ada@uni.edu", EnrollmentStatus::Active))
            .await
            .unwrap();
        insert_enrollment(&pool, &enrollment("e2", &spring.id, "ada@uni.edu", EnrollmentStatus::Dropped))
            .await
            .unwrap();

        let load = fetch_active_term_load(&pool, "ada@uni.edu").await.unwrap();
        assert_eq!(load.len(), 1);
        assert_eq!(load[0].semester, "Fall 2024");
        assert_eq!(load[0].enrollment_id, "e1");

        assert_eq!(count_active_in_semester(&pool, "ada@uni.edu", "Fall 2024").await.unwrap(), 1);
        assert_eq!(count_active_in_semester(&pool, "ada@uni.edu", "Spring 2025").await.unwrap(), 0);

        let all = fetch_enrollments(&pool, Some("ada@uni.edu"), None, None).await.unwrap();
        assert_eq!(all.len(), 2);
        let active = list_active_enrollments(&pool, Some("ada@uni.edu"), None).await.unwrap();
        assert_eq!(active.len(), 1);
        let by_course = fetch_enrollments(&pool, None, Some(&spring.id), None).await.unwrap();
        assert_eq!(by_course[0].id, "e2");
    }

    #[tokio::test]
    async fn test_status_update_is_compare_and_set() {
        let pool = setup_test_db().await;
        let course = insert_course(&pool, course_req("CS101", "Fall 2024")).await.unwrap();
        let active = enrollment("e1", &course.id, "ada@uni.edu", EnrollmentStatus::Active);
        insert_enrollment(&pool, &active).await.unwrap();

        let completed = Enrollment {
            status: EnrollmentStatus::Completed,
            grade: Some(Grade::BPlus),
            percentage: Some(88.0),
            ..active.clone()
        };
        assert!(update_enrollment_status(&pool, &completed, EnrollmentStatus::Active).await.unwrap());
        assert!(!update_enrollment_status(&pool, &completed, EnrollmentStatus::Active).await.unwrap());

        let stored = find_enrollment_by_id(&pool, "e1").await.unwrap().unwrap();
        assert_eq!(stored.grade, Some(Grade::BPlus));
        assert_eq!(stored.percentage, Some(88.0));

        assert!(!delete_ungraded_enrollment(&pool, "e1").await.unwrap());
        assert!(find_enrollment_by_id(&pool, "e1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_transcripts_are_appended() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();

        let line = TranscriptLine {
            course_code: "CS101".to_string(),
            course_title: "Intro".to_string(),
            credits: 3,
            grade: Grade::B,
            grade_points: 9.0,
        };
        let first = Transcript {
            id: "t1".to_string(),
            student_email: "ada@uni.edu".to_string(),
            semester: "Fall 2024".to_string(),
            lines: vec![line.clone()],
            total_credits: 3,
            gpa: 3.0,
            cumulative_gpa: 3.0,
            status: TranscriptStatus::Completed,
            generated_date: "2024-12-20T10:00:00+00:00".to_string(),
        };
        let second = Transcript {
            id: "t2".to_string(),
            generated_date: "2024-12-21T10:00:00+00:00".to_string(),
            status: TranscriptStatus::InProgress,
            ..first.clone()
        };
        insert_transcript(&mut conn, &first).await.unwrap();
        insert_transcript(&mut conn, &second).await.unwrap();

        let stored = fetch_transcripts(&mut conn, "ada@uni.edu").await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].id, "t2");
        assert_eq!(stored[0].status, TranscriptStatus::InProgress);
        assert_eq!(stored[1], first);
        assert_eq!(stored[1].lines, vec![line]);
    }
}
