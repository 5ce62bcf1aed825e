// store.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    AttendanceRecord, ClassRecord, NewPoll, NewRecord, Poll, PollSummary, SessionAttendee,
    StudentAttendance,
};

#[derive(Error, Debug)]
pub enum StoreError {
    /// The (student, session) pair already has a record.
    #[error("attendance already recorded for this student and session")]
    Duplicate,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Durable polls and attendance records.
///
/// `insert_record` is the only place the at-most-once rule is enforced:
/// implementations must reject a second record for the same
/// (student, session) atomically and report it as [`StoreError::Duplicate`].
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// True when a poll that has not yet expired already uses `code`.
    async fn code_in_use(&self, code: &str, now: DateTime<Utc>) -> Result<bool, StoreError>;

    async fn insert_poll(&self, poll: NewPoll) -> Result<Poll, StoreError>;

    /// The poll carrying `code` with the latest expiry, expired or not.
    async fn find_poll_by_code(&self, code: &str) -> Result<Option<Poll>, StoreError>;

    /// Most recently created poll of the session that is still open at `now`.
    async fn latest_open_poll(
        &self,
        session_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Poll>, StoreError>;

    async fn insert_record(&self, record: NewRecord) -> Result<AttendanceRecord, StoreError>;

    async fn record_for(
        &self,
        student_id: Uuid,
        session_id: Uuid,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Polls of the session with their record counts, newest first.
    async fn session_polls(&self, session_id: Uuid) -> Result<Vec<PollSummary>, StoreError>;

    /// Records of the session joined with student identity, oldest first.
    async fn session_attendees(&self, session_id: Uuid)
        -> Result<Vec<SessionAttendee>, StoreError>;

    /// Every record of every session of the class.
    async fn class_records(&self, class_id: Uuid) -> Result<Vec<ClassRecord>, StoreError>;

    /// Sessions of the class for which at least one poll was ever created.
    async fn polled_sessions(&self, class_id: Uuid) -> Result<Vec<Uuid>, StoreError>;

    /// The student's records across all classes, newest first.
    async fn student_records(&self, student_id: Uuid)
        -> Result<Vec<StudentAttendance>, StoreError>;
}
