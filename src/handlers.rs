// handlers.rs
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::analytics;
use crate::auth::Principal;
use crate::error::{AppError, AppResult};
use crate::models::{
    CourseAttendanceGroup, CourseRecords, CourseSummary, CreatePollRequest, CreatedPoll,
    MarkRequest, PollStatus, SessionAttendance, StudentCourseAttendance, StudentHistory,
    SubmitRequest, SubmitResponse,
};
use crate::poll;
use crate::state::AppState;
use crate::submission;

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

/// Open an attendance poll for a session (instructors only)
pub async fn create_poll(
    principal: Principal,
    State(state): State<AppState>,
    body: Result<Json<CreatePollRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<CreatedPoll>)> {
    let request = json_body(body)?;
    let poll = poll::create_poll(
        &state,
        &principal,
        request.session_id,
        request.duration_minutes.as_ref(),
        Utc::now(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(CreatedPoll::from(&poll))))
}

/// Current code of a session, `null` once every poll has expired
pub async fn code_status(
    principal: Principal,
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<Option<PollStatus>>> {
    let status = poll::poll_status(&state, &principal, session_id, Utc::now()).await?;
    Ok(Json(status))
}

/// Submit a code (students only)
pub async fn submit(
    principal: Principal,
    State(state): State<AppState>,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> AppResult<Json<SubmitResponse>> {
    let request = json_body(body)?;
    let record =
        submission::submit_attendance(&state, &principal, &request.code, Utc::now()).await?;

    Ok(Json(SubmitResponse {
        status: "success",
        session_id: record.session_id,
        marked_at: record.submitted_at,
        already_marked: false,
    }))
}

/// Submit a code for a course the student picked
pub async fn mark(
    principal: Principal,
    State(state): State<AppState>,
    body: Result<Json<MarkRequest>, JsonRejection>,
) -> AppResult<Json<SubmitResponse>> {
    let request = json_body(body)?;
    let marked = submission::submit_for_course(
        &state,
        &principal,
        request.course_id,
        &request.code,
        Utc::now(),
    )
    .await?;

    Ok(Json(SubmitResponse {
        status: "success",
        session_id: marked.record.session_id,
        marked_at: marked.record.submitted_at,
        already_marked: marked.already_marked,
    }))
}

pub async fn session_attendance(
    principal: Principal,
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<SessionAttendance>> {
    let attendance = analytics::session_attendance(&state, &principal, session_id).await?;
    Ok(Json(attendance))
}

pub async fn course_summary(
    principal: Principal,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<CourseSummary>> {
    let summary = analytics::course_summary(&state, &principal, course_id).await?;
    Ok(Json(summary))
}

pub async fn course_records(
    principal: Principal,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<CourseRecords>> {
    let records = analytics::course_records(&state, &principal, course_id).await?;
    Ok(Json(records))
}

pub async fn my_course_attendance(
    principal: Principal,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<StudentCourseAttendance>> {
    let attendance =
        analytics::student_course_attendance(&state, &principal, course_id).await?;
    Ok(Json(attendance))
}

pub async fn my_history(
    principal: Principal,
    State(state): State<AppState>,
) -> AppResult<Json<StudentHistory>> {
    let history = analytics::student_history(&state, &principal, principal.id).await?;
    Ok(Json(history))
}

pub async fn my_history_by_course(
    principal: Principal,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<CourseAttendanceGroup>>> {
    let groups = analytics::student_history_by_course(&state, &principal, principal.id).await?;
    Ok(Json(groups))
}

pub async fn student_history(
    principal: Principal,
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
) -> AppResult<Json<StudentHistory>> {
    let history = analytics::student_history(&state, &principal, student_id).await?;
    Ok(Json(history))
}
