//! Submission gate: turns a typed code into at most one attendance record
//! per student and session.
//!
//! The gate never checks for an existing record before inserting. Two
//! identical submissions racing each other both reach `insert_record`, and
//! the store's unique (student, session) constraint lets exactly one win.

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::Principal;
use crate::code::{normalize_code, normalize_spaced_code};
use crate::error::{AppError, AppResult};
use crate::models::{AttendanceRecord, NewRecord, Poll, Session};
use crate::state::AppState;
use crate::store::StoreError;

/// Outcome of a course-scoped submission.
#[derive(Debug, Clone)]
pub struct Marked {
    pub record: AttendanceRecord,
    pub already_marked: bool,
}

/// Resolves a well-formed code to an open poll and its session.
async fn open_poll(state: &AppState, code: &str, now: DateTime<Utc>) -> AppResult<(Poll, Session)> {
    let poll = state
        .store
        .find_poll_by_code(code)
        .await?
        .ok_or_else(|| AppError::not_found("invalid code"))?;

    if !poll.is_open_at(now) {
        debug!(poll_id = %poll.id, "code submitted after expiry");
        return Err(AppError::Gone("code expired".to_string()));
    }

    let session = state
        .roster
        .session(poll.session_id)
        .await?
        .ok_or_else(|| AppError::not_found("session not found"))?;

    Ok((poll, session))
}

async fn ensure_enrolled(state: &AppState, student_id: Uuid, session: &Session) -> AppResult<()> {
    if state.roster.is_student_of(student_id, session.class_id).await? {
        Ok(())
    } else {
        debug!(student_id = %student_id, class_id = %session.class_id, "submitter not enrolled");
        Err(AppError::forbidden("not enrolled in course"))
    }
}

async fn insert(
    state: &AppState,
    student_id: Uuid,
    poll: &Poll,
    now: DateTime<Utc>,
) -> Result<AttendanceRecord, StoreError> {
    state
        .store
        .insert_record(NewRecord {
            student_id,
            session_id: poll.session_id,
            poll_id: poll.id,
            submitted_at: now,
        })
        .await
}

pub async fn submit_attendance(
    state: &AppState,
    principal: &Principal,
    raw_code: &str,
    now: DateTime<Utc>,
) -> AppResult<AttendanceRecord> {
    let code = normalize_code(raw_code)?;
    let (poll, session) = open_poll(state, &code, now).await?;
    ensure_enrolled(state, principal.id, &session).await?;

    let record = insert(state, principal.id, &poll, now).await.map_err(|err| {
        if matches!(err, StoreError::Duplicate) {
            debug!(student_id = %principal.id, session_id = %session.id, "duplicate submission");
        }
        AppError::from(err)
    })?;

    info!(
        record_id = %record.id,
        student_id = %record.student_id,
        session_id = %record.session_id,
        poll_id = %record.poll_id,
        "attendance recorded"
    );

    Ok(record)
}

/// Like [`submit_attendance`], but the student names the course the code is
/// for, inner whitespace is tolerated, and a repeat submission returns the
/// existing record instead of failing.
pub async fn submit_for_course(
    state: &AppState,
    principal: &Principal,
    course_id: Uuid,
    raw_code: &str,
    now: DateTime<Utc>,
) -> AppResult<Marked> {
    let code = normalize_spaced_code(raw_code)?;
    let (poll, session) = open_poll(state, &code, now).await?;

    if session.class_id != course_id {
        return Err(AppError::not_found(
            "code does not belong to the selected course",
        ));
    }
    ensure_enrolled(state, principal.id, &session).await?;

    match insert(state, principal.id, &poll, now).await {
        Ok(record) => {
            info!(
                record_id = %record.id,
                student_id = %record.student_id,
                session_id = %record.session_id,
                "attendance recorded"
            );
            Ok(Marked {
                record,
                already_marked: false,
            })
        }
        Err(StoreError::Duplicate) => {
            let record = state
                .store
                .record_for(principal.id, session.id)
                .await?
                .ok_or_else(|| AppError::Internal("duplicate record vanished".to_string()))?;
            Ok(Marked {
                record,
                already_marked: true,
            })
        }
        Err(err) => Err(err.into()),
    }
}
