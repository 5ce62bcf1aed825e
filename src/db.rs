// src/db.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::models::{
    AttendanceRecord, Class, ClassRecord, ClassRole, Member, NewPoll, NewRecord, Poll,
    PollSummary, Session, SessionAttendee, StudentAttendance,
};
use crate::services::Roster;
use crate::store::{AttendanceStore, StoreError};

const POLL_COLUMNS: &str =
    "id, session_id, created_by, code, expires_at, duration_minutes, active, created_at";

pub async fn create_pool(config: &Config, database_url: &str) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("database migrations applied");

    Ok(pool)
}

/// Postgres-backed store; the unique constraint on
/// `attendance_records (student_id, session_id)` serializes submissions.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn translate_insert_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate,
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl Roster for PgStore {
    async fn session(&self, session_id: Uuid) -> Result<Option<Session>, StoreError> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT id, class_id, name, date FROM course_sessions WHERE id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn class(&self, class_id: Uuid) -> Result<Option<Class>, StoreError> {
        let class = sqlx::query_as::<_, Class>("SELECT id, name FROM classes WHERE id = $1")
            .bind(class_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(class)
    }

    async fn roles_in(&self, user_id: Uuid, class_id: Uuid) -> Result<Vec<ClassRole>, StoreError> {
        let rows = sqlx::query("SELECT role FROM class_roles WHERE user_id = $1 AND class_id = $2")
            .bind(user_id)
            .bind(class_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                let role: String = row.get("role");
                role.parse().map_err(StoreError::Corrupt)
            })
            .collect()
    }

    async fn sessions_of(&self, class_id: Uuid) -> Result<Vec<Session>, StoreError> {
        let sessions = sqlx::query_as::<_, Session>(
            "SELECT id, class_id, name, date FROM course_sessions WHERE class_id = $1 ORDER BY date ASC, name ASC",
        )
        .bind(class_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    async fn students_of(&self, class_id: Uuid) -> Result<Vec<Member>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT u.id, u.name, u.email
            FROM class_roles cr
            JOIN users u ON u.id = cr.user_id
            WHERE cr.class_id = $1 AND cr.role = 'STUDENT'
            ORDER BY u.name ASC
            "#,
        )
        .bind(class_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Member {
                user_id: row.get("id"),
                name: row.get("name"),
                email: row.get("email"),
                role: ClassRole::Student,
            })
            .collect())
    }
}

#[async_trait]
impl AttendanceStore for PgStore {
    async fn code_in_use(&self, code: &str, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let in_use: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM attendance_polls WHERE code = $1 AND expires_at > $2)",
        )
        .bind(code)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(in_use)
    }

    async fn insert_poll(&self, poll: NewPoll) -> Result<Poll, StoreError> {
        let query = format!(
            r#"
            INSERT INTO attendance_polls (id, session_id, created_by, code, expires_at, duration_minutes, active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7)
            RETURNING {POLL_COLUMNS}
            "#
        );

        let poll = sqlx::query_as::<_, Poll>(&query)
            .bind(Uuid::new_v4())
            .bind(poll.session_id)
            .bind(poll.created_by)
            .bind(&poll.code)
            .bind(poll.expires_at)
            .bind(poll.duration_minutes)
            .bind(poll.created_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(poll)
    }

    async fn find_poll_by_code(&self, code: &str) -> Result<Option<Poll>, StoreError> {
        let query = format!(
            "SELECT {POLL_COLUMNS} FROM attendance_polls WHERE code = $1 ORDER BY active DESC, expires_at DESC LIMIT 1"
        );

        let poll = sqlx::query_as::<_, Poll>(&query)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(poll)
    }

    async fn latest_open_poll(
        &self,
        session_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Poll>, StoreError> {
        let query = format!(
            r#"
            SELECT {POLL_COLUMNS} FROM attendance_polls
            WHERE session_id = $1 AND active AND expires_at > $2
            ORDER BY created_at DESC
            LIMIT 1
            "#
        );

        let poll = sqlx::query_as::<_, Poll>(&query)
            .bind(session_id)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        Ok(poll)
    }

    async fn insert_record(&self, record: NewRecord) -> Result<AttendanceRecord, StoreError> {
        sqlx::query_as::<_, AttendanceRecord>(
            r#"
            INSERT INTO attendance_records (id, student_id, session_id, poll_id, submitted_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, student_id, session_id, poll_id, submitted_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(record.student_id)
        .bind(record.session_id)
        .bind(record.poll_id)
        .bind(record.submitted_at)
        .fetch_one(&self.pool)
        .await
        .map_err(translate_insert_error)
    }

    async fn record_for(
        &self,
        student_id: Uuid,
        session_id: Uuid,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let record = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            SELECT id, student_id, session_id, poll_id, submitted_at
            FROM attendance_records
            WHERE student_id = $1 AND session_id = $2
            "#,
        )
        .bind(student_id)
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn session_polls(&self, session_id: Uuid) -> Result<Vec<PollSummary>, StoreError> {
        let polls = sqlx::query_as::<_, PollSummary>(
            r#"
            SELECT p.id AS poll_id, p.code, p.expires_at, p.created_at, COUNT(r.id) AS record_count
            FROM attendance_polls p
            LEFT JOIN attendance_records r ON r.poll_id = p.id
            WHERE p.session_id = $1
            GROUP BY p.id
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(polls)
    }

    async fn session_attendees(
        &self,
        session_id: Uuid,
    ) -> Result<Vec<SessionAttendee>, StoreError> {
        let attendees = sqlx::query_as::<_, SessionAttendee>(
            r#"
            SELECT u.id AS student_id, u.name, u.email, r.submitted_at AS marked_at,
                   p.id AS poll_id, p.code AS poll_code
            FROM attendance_records r
            JOIN users u ON u.id = r.student_id
            JOIN attendance_polls p ON p.id = r.poll_id
            WHERE r.session_id = $1
            ORDER BY r.submitted_at ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(attendees)
    }

    async fn class_records(&self, class_id: Uuid) -> Result<Vec<ClassRecord>, StoreError> {
        let records = sqlx::query_as::<_, ClassRecord>(
            r#"
            SELECT r.student_id, r.session_id, r.submitted_at AS marked_at, p.code AS poll_code
            FROM attendance_records r
            JOIN course_sessions s ON s.id = r.session_id
            JOIN attendance_polls p ON p.id = r.poll_id
            WHERE s.class_id = $1
            "#,
        )
        .bind(class_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn polled_sessions(&self, class_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let sessions = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT DISTINCT p.session_id
            FROM attendance_polls p
            JOIN course_sessions s ON s.id = p.session_id
            WHERE s.class_id = $1
            "#,
        )
        .bind(class_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    async fn student_records(
        &self,
        student_id: Uuid,
    ) -> Result<Vec<StudentAttendance>, StoreError> {
        let records = sqlx::query_as::<_, StudentAttendance>(
            r#"
            SELECT c.id AS course_id, c.name AS course_name,
                   s.id AS session_id, s.name AS session_name, s.date,
                   'present' AS status,
                   r.submitted_at AS marked_at, p.code AS poll_code
            FROM attendance_records r
            JOIN course_sessions s ON s.id = r.session_id
            JOIN classes c ON c.id = s.class_id
            JOIN attendance_polls p ON p.id = r.poll_id
            WHERE r.student_id = $1
            ORDER BY r.submitted_at DESC
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
