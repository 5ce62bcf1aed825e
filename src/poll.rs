// src/poll.rs
//! Poll lifecycle: opening a poll for a session and reporting whether one
//! is currently accepting codes.
//!
//! A poll is open while `now < expires_at`. Nothing here ever writes that
//! transition back; it is recomputed on every read.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::Principal;
use crate::code::generate_code;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{DurationInput, NewPoll, Poll, PollStatus, Session};
use crate::state::AppState;

/// Resolves the requested duration against the configured default and bound.
pub fn resolve_duration(input: Option<&DurationInput>, config: &Config) -> AppResult<i32> {
    let minutes = match input {
        None => config.default_duration_minutes,
        Some(DurationInput::Text(text)) if text.trim().is_empty() => config.default_duration_minutes,
        Some(DurationInput::Text(text)) => text.trim().parse::<i64>().map_err(|_| {
            AppError::bad_request("durationMinutes must be a whole number of minutes")
        })?,
        Some(DurationInput::Minutes(minutes)) => *minutes,
    };

    if minutes < 1 || minutes > config.max_duration_minutes {
        return Err(AppError::bad_request(format!(
            "durationMinutes must be between 1 and {}",
            config.max_duration_minutes
        )));
    }

    i32::try_from(minutes).map_err(|_| AppError::bad_request("durationMinutes is too large"))
}

/// Loads the session and checks the caller teaches its class.
pub(crate) async fn instructor_session(
    state: &AppState,
    principal: &Principal,
    session_id: Uuid,
) -> AppResult<Session> {
    let session = state
        .roster
        .session(session_id)
        .await?
        .ok_or_else(|| AppError::not_found("session not found"))?;

    if !state
        .roster
        .is_instructor_of(principal.id, session.class_id)
        .await?
    {
        warn!(user_id = %principal.id, session_id = %session_id, "non-instructor touched poll");
        return Err(AppError::forbidden(
            "only instructors of this class can manage attendance polls",
        ));
    }

    Ok(session)
}

async fn allocate_code(state: &AppState, now: DateTime<Utc>) -> AppResult<String> {
    for attempt in 1..=state.config.code_retries {
        let code = generate_code();
        if !state.store.code_in_use(&code, now).await? {
            return Ok(code);
        }
        warn!(attempt, "generated attendance code collides with a live poll");
    }

    Err(AppError::Internal(
        "could not allocate a unique attendance code".to_string(),
    ))
}

pub async fn create_poll(
    state: &AppState,
    principal: &Principal,
    session_id: Uuid,
    duration: Option<&DurationInput>,
    now: DateTime<Utc>,
) -> AppResult<Poll> {
    let duration_minutes = resolve_duration(duration, &state.config)?;
    let session = instructor_session(state, principal, session_id).await?;
    let code = allocate_code(state, now).await?;

    let poll = state
        .store
        .insert_poll(NewPoll {
            session_id: session.id,
            created_by: principal.id,
            code,
            expires_at: now + Duration::minutes(i64::from(duration_minutes)),
            duration_minutes,
            created_at: now,
        })
        .await?;

    info!(
        poll_id = %poll.id,
        session_id = %poll.session_id,
        expires_at = %poll.expires_at,
        "attendance poll opened"
    );

    Ok(poll)
}

/// The newest poll of the session still accepting codes, if any.
pub async fn poll_status(
    state: &AppState,
    principal: &Principal,
    session_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<Option<PollStatus>> {
    let session = instructor_session(state, principal, session_id).await?;

    let poll = state.store.latest_open_poll(session.id, now).await?;

    Ok(poll.map(|poll| PollStatus {
        code: poll.code,
        expires_at: poll.expires_at,
    }))
}
