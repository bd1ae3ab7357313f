use axum::Json;
use axum::extract::{Path, Query};
use axum::routing::{patch, post};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::Deserialize;

use crate::db::repository;
use crate::error::AppError;
use crate::models::*;
use crate::state::AppState;

#[derive(Deserialize)]
struct CourseQueryParams {
    semester: Option<String>,
}

#[derive(Deserialize)]
struct EnrollmentQueryParams {
    student_email: Option<String>,
    course_id: Option<String>,
    status: Option<EnrollmentStatus>,
}

#[derive(Deserialize)]
struct StudentQueryParams {
    student_email: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/{id}", get(get_course).delete(delete_course))
        .route("/courses/{id}/status", patch(update_course_status))
        .route("/courses/{id}/roster", get(course_roster))
        .route("/enrollments", get(list_enrollments).post(enroll))
        .route("/enrollments/{id}", axum::routing::delete(delete_enrollment))
        .route("/enrollments/{id}/drop", patch(drop_enrollment))
        .route("/enrollments/{id}/complete", patch(complete_enrollment))
        .route("/transcripts", get(list_transcripts).post(generate_transcript))
        .route("/degrees", get(list_degrees).post(create_degree))
        .route("/degrees/{id}/status", patch(update_degree_status))
        .route("/degrees/{id}/password", patch(reset_degree_password))
        .route("/degrees/{id}/unlock", post(unlock_degree))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn list_courses(
    State(state): State<AppState>,
    Query(params): Query<CourseQueryParams>,
) -> Result<Json<Vec<Course>>, AppError> {
    let courses = repository::fetch_courses(&state.db, params.semester.as_deref()).await?;
    Ok(Json(courses))
}

async fn create_course(
    State(state): State<AppState>,
    Json(req): Json<NewCourseRequest>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    req.validate().map_err(AppError::BadRequest)?;
    let course = repository::insert_course(&state.db, req).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Course>, AppError> {
    let course = repository::find_course_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(course))
}

async fn update_course_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCourseStatusRequest>,
) -> Result<Json<Course>, AppError> {
    let course = repository::update_course_status(&state.db, &id, req.status)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(course))
}

async fn delete_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    repository::find_course_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    if repository::delete_unreferenced_course(&state.db, &id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Conflict(format!(
            "course {} is referenced by enrollments",
            id
        )))
    }
}

async fn course_roster(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Enrollment>>, AppError> {
    let roster = state.enrollments.roster(&id).await?;
    Ok(Json(roster))
}

async fn list_enrollments(
    State(state): State<AppState>,
    Query(params): Query<EnrollmentQueryParams>,
) -> Result<Json<Vec<Enrollment>>, AppError> {
    let enrollments = state
        .enrollments
        .list(
            params.student_email.as_deref(),
            params.course_id.as_deref(),
            params.status,
        )
        .await?;
    Ok(Json(enrollments))
}

async fn enroll(
    State(state): State<AppState>,
    Json(req): Json<NewEnrollmentRequest>,
) -> Result<(StatusCode, Json<Enrollment>), AppError> {
    let enrollment = state.enrollments.enroll(req).await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

async fn drop_enrollment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Enrollment>, AppError> {
    let enrollment = state.enrollments.drop_enrollment(&id).await?;
    Ok(Json(enrollment))
}

async fn complete_enrollment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CompleteEnrollmentRequest>,
) -> Result<Json<Enrollment>, AppError> {
    let enrollment = state.enrollments.complete_enrollment(&id, req).await?;
    Ok(Json(enrollment))
}

async fn delete_enrollment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.enrollments.delete_enrollment(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_transcripts(
    State(state): State<AppState>,
    Query(params): Query<StudentQueryParams>,
) -> Result<Json<Vec<Transcript>>, AppError> {
    let student_email = params
        .student_email
        .ok_or_else(|| AppError::BadRequest("student_email is required".to_string()))?;
    let transcripts = state.transcripts.list(&student_email).await?;
    Ok(Json(transcripts))
}

async fn generate_transcript(
    State(state): State<AppState>,
    Json(req): Json<GenerateTranscriptRequest>,
) -> Result<(StatusCode, Json<Transcript>), AppError> {
    let transcript = state.transcripts.generate(req).await?;
    Ok((StatusCode::CREATED, Json(transcript)))
}

async fn list_degrees(
    State(state): State<AppState>,
    Query(params): Query<StudentQueryParams>,
) -> Result<Json<Vec<Degree>>, AppError> {
    let degrees = state.degrees.list(params.student_email.as_deref()).await?;
    Ok(Json(degrees))
}

async fn create_degree(
    State(state): State<AppState>,
    Json(req): Json<NewDegreeRequest>,
) -> Result<(StatusCode, Json<CreatedDegree>), AppError> {
    let created = state.degrees.create(req).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_degree_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateDegreeStatusRequest>,
) -> Result<Json<Degree>, AppError> {
    let degree = state.degrees.update_status(&id, req.status).await?;
    Ok(Json(degree))
}

async fn reset_degree_password(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<CreatedDegree>, AppError> {
    let updated = state.degrees.reset_password(&id, req.access_password).await?;
    Ok(Json(updated))
}

async fn unlock_degree(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UnlockRequest>,
) -> Result<Json<Certificate>, AppError> {
    let certificate = state.degrees.unlock(&id, &req.access_password).await?;
    Ok(Json(certificate))
}
