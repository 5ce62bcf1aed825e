// models.rs
use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role a member holds inside one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassRole {
    Professor,
    Ta,
    Tutor,
    Student,
}

impl ClassRole {
    pub const INSTRUCTOR_ROLES: [ClassRole; 3] = [Self::Professor, Self::Ta, Self::Tutor];

    pub fn is_instructor(self) -> bool {
        Self::INSTRUCTOR_ROLES.contains(&self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Professor => "PROFESSOR",
            Self::Ta => "TA",
            Self::Tutor => "TUTOR",
            Self::Student => "STUDENT",
        }
    }
}

impl std::str::FromStr for ClassRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PROFESSOR" => Ok(Self::Professor),
            "TA" => Ok(Self::Ta),
            "TUTOR" => Ok(Self::Tutor),
            "STUDENT" => Ok(Self::Student),
            other => Err(format!("unknown class role {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Class {
    pub id: Uuid,
    pub name: String,
}

/// One meeting of a class. Owned by course management; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub class_id: Uuid,
    pub name: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: ClassRole,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub id: Uuid,
    pub session_id: Uuid,
    pub created_by: Uuid,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Poll {
    /// Expiry is derived from the clock, never written back.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.active && now < self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct NewPoll {
    pub session_id: Uuid,
    pub created_by: Uuid,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub student_id: Uuid,
    pub session_id: Uuid,
    pub poll_id: Uuid,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRecord {
    pub student_id: Uuid,
    pub session_id: Uuid,
    pub poll_id: Uuid,
    pub submitted_at: DateTime<Utc>,
}

/// A poll together with the number of records submitted through it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PollSummary {
    pub poll_id: Uuid,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub record_count: i64,
}

/// A session record joined with the student's identity and the poll used.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SessionAttendee {
    pub student_id: Uuid,
    pub name: String,
    pub email: String,
    pub marked_at: DateTime<Utc>,
    pub poll_id: Uuid,
    pub poll_code: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClassRecord {
    pub student_id: Uuid,
    pub session_id: Uuid,
    pub marked_at: DateTime<Utc>,
    pub poll_code: String,
}

/// A student's record joined with its session and course.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StudentAttendance {
    pub course_id: Uuid,
    pub course_name: String,
    pub session_id: Uuid,
    pub session_name: String,
    pub date: NaiveDate,
    pub status: String,
    pub marked_at: DateTime<Utc>,
    pub poll_code: String,
}

// Request payloads

/// Accepts both JSON numbers and the strings HTML forms send.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DurationInput {
    Minutes(i64),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    pub session_id: Uuid,
    pub duration_minutes: Option<DurationInput>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkRequest {
    pub course_id: Uuid,
    pub code: String,
}

// Response payloads

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedPoll {
    pub poll_id: Uuid,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub session_id: Uuid,
}

impl From<&Poll> for CreatedPoll {
    fn from(poll: &Poll) -> Self {
        Self {
            poll_id: poll.id,
            code: poll.code.clone(),
            expires_at: poll.expires_at,
            session_id: poll.session_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollStatus {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub status: &'static str,
    pub session_id: Uuid,
    pub marked_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub already_marked: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAttendance {
    pub session_id: Uuid,
    pub polls: Vec<PollSummary>,
    pub attendance: Vec<SessionAttendee>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOverview {
    pub id: Uuid,
    pub name: String,
    pub date: NaiveDate,
    pub attendance_count: usize,
    pub has_poll: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPresence {
    pub present: bool,
    pub marked_at: DateTime<Utc>,
    pub poll_code: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub student_id: Uuid,
    pub name: String,
    pub email: String,
    pub sessions: HashMap<Uuid, SessionPresence>,
    pub total_sessions: usize,
    pub present_count: usize,
    pub attendance_percentage: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    pub course_id: Uuid,
    pub sessions: Vec<SessionOverview>,
    pub students: Vec<StudentSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkedAt {
    pub marked_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecordRow {
    pub student_id: Uuid,
    pub name: String,
    pub email: String,
    pub session_attendance: HashMap<Uuid, Option<MarkedAt>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRecords {
    pub course_id: Uuid,
    pub sessions: Vec<Session>,
    pub students: Vec<StudentRecordRow>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentHistory {
    pub student_id: Uuid,
    pub attendance: Vec<StudentAttendance>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseAttendanceGroup {
    pub course_id: Uuid,
    pub course_name: String,
    pub attendances: Vec<StudentAttendance>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionWithPresence {
    pub id: Uuid,
    pub name: String,
    pub date: NaiveDate,
    pub is_present: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentCourseAttendance {
    pub course_id: Uuid,
    pub sessions: Vec<SessionWithPresence>,
    pub attendance_percentage: u32,
    pub total_sessions: usize,
    pub present_count: usize,
}
