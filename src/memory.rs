//! In-process store used when no database is configured and by the tests.
//!
//! All state sits behind one mutex, so the (student, session) index check
//! and the record insert happen as a single atomic step, mirroring the
//! unique constraint the Postgres schema declares.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::{
    AttendanceRecord, Class, ClassRecord, ClassRole, Member, NewPoll, NewRecord, Poll,
    PollSummary, Session, SessionAttendee, StudentAttendance,
};
use crate::services::Roster;
use crate::store::{AttendanceStore, StoreError};

/// Record of a store operation for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    CodeInUse { code: String },
    InsertPoll { session_id: Uuid },
    FindPollByCode { code: String },
    LatestOpenPoll { session_id: Uuid },
    InsertRecord { student_id: Uuid, session_id: Uuid },
    RecordFor { student_id: Uuid, session_id: Uuid },
    SessionPolls { session_id: Uuid },
    SessionAttendees { session_id: Uuid },
    ClassRecords { class_id: Uuid },
    PolledSessions { class_id: Uuid },
    StudentRecords { student_id: Uuid },
}

#[derive(Debug, Clone)]
struct User {
    name: String,
    email: String,
}

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    classes: HashMap<Uuid, Class>,
    roles: Vec<(Uuid, Uuid, ClassRole)>,
    sessions: HashMap<Uuid, Session>,
    polls: Vec<Poll>,
    records: Vec<AttendanceRecord>,
    attended: HashSet<(Uuid, Uuid)>,
    operations: Vec<StoreOp>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    latency: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every operation sleeps for `latency` before touching state, which
    /// widens the window between a submission's checks and its insert.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    pub fn add_user(&self, name: &str, email: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().users.insert(
            id,
            User {
                name: name.to_string(),
                email: email.to_string(),
            },
        );
        id
    }

    pub fn add_class(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().classes.insert(
            id,
            Class {
                id,
                name: name.to_string(),
            },
        );
        id
    }

    pub fn add_session(&self, class_id: Uuid, name: &str, date: NaiveDate) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().sessions.insert(
            id,
            Session {
                id,
                class_id,
                name: name.to_string(),
                date,
            },
        );
        id
    }

    pub fn enroll(&self, user_id: Uuid, class_id: Uuid, role: ClassRole) {
        self.lock().roles.push((user_id, class_id, role));
    }

    /// Stores a poll exactly as given, bypassing code generation.
    pub fn seed_poll(&self, poll: Poll) {
        self.lock().polls.push(poll);
    }

    pub fn records(&self) -> Vec<AttendanceRecord> {
        self.lock().records.clone()
    }

    pub fn polls(&self) -> Vec<Poll> {
        self.lock().polls.clone()
    }

    pub fn operations(&self) -> Vec<StoreOp> {
        self.lock().operations.clone()
    }

    pub fn clear_operations(&self) {
        self.lock().operations.clear();
    }
}

fn poll_code(inner: &Inner, poll_id: Uuid) -> String {
    inner
        .polls
        .iter()
        .find(|poll| poll.id == poll_id)
        .map(|poll| poll.code.clone())
        .unwrap_or_default()
}

#[async_trait]
impl Roster for MemoryStore {
    async fn session(&self, session_id: Uuid) -> Result<Option<Session>, StoreError> {
        self.pause().await;
        Ok(self.lock().sessions.get(&session_id).cloned())
    }

    async fn class(&self, class_id: Uuid) -> Result<Option<Class>, StoreError> {
        self.pause().await;
        Ok(self.lock().classes.get(&class_id).cloned())
    }

    async fn roles_in(&self, user_id: Uuid, class_id: Uuid) -> Result<Vec<ClassRole>, StoreError> {
        self.pause().await;
        Ok(self
            .lock()
            .roles
            .iter()
            .filter(|(user, class, _)| *user == user_id && *class == class_id)
            .map(|(_, _, role)| *role)
            .collect())
    }

    async fn sessions_of(&self, class_id: Uuid) -> Result<Vec<Session>, StoreError> {
        self.pause().await;
        let mut sessions: Vec<Session> = self
            .lock()
            .sessions
            .values()
            .filter(|session| session.class_id == class_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.name.cmp(&b.name)));
        Ok(sessions)
    }

    async fn students_of(&self, class_id: Uuid) -> Result<Vec<Member>, StoreError> {
        self.pause().await;
        let inner = self.lock();
        let mut students: Vec<Member> = inner
            .roles
            .iter()
            .filter(|(_, class, role)| *class == class_id && *role == ClassRole::Student)
            .filter_map(|(user_id, _, role)| {
                inner.users.get(user_id).map(|user| Member {
                    user_id: *user_id,
                    name: user.name.clone(),
                    email: user.email.clone(),
                    role: *role,
                })
            })
            .collect();
        students.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(students)
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn code_in_use(&self, code: &str, now: DateTime<Utc>) -> Result<bool, StoreError> {
        self.pause().await;
        let mut inner = self.lock();
        inner.operations.push(StoreOp::CodeInUse {
            code: code.to_string(),
        });
        Ok(inner
            .polls
            .iter()
            .any(|poll| poll.code == code && poll.expires_at > now))
    }

    async fn insert_poll(&self, poll: NewPoll) -> Result<Poll, StoreError> {
        self.pause().await;
        let mut inner = self.lock();
        inner.operations.push(StoreOp::InsertPoll {
            session_id: poll.session_id,
        });
        let poll = Poll {
            id: Uuid::new_v4(),
            session_id: poll.session_id,
            created_by: poll.created_by,
            code: poll.code,
            expires_at: poll.expires_at,
            duration_minutes: poll.duration_minutes,
            active: true,
            created_at: poll.created_at,
        };
        inner.polls.push(poll.clone());
        Ok(poll)
    }

    async fn find_poll_by_code(&self, code: &str) -> Result<Option<Poll>, StoreError> {
        self.pause().await;
        let mut inner = self.lock();
        inner.operations.push(StoreOp::FindPollByCode {
            code: code.to_string(),
        });
        Ok(inner
            .polls
            .iter()
            .filter(|poll| poll.code == code)
            .max_by_key(|poll| (poll.active, poll.expires_at))
            .cloned())
    }

    async fn latest_open_poll(
        &self,
        session_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Poll>, StoreError> {
        self.pause().await;
        let mut inner = self.lock();
        inner.operations.push(StoreOp::LatestOpenPoll { session_id });
        Ok(inner
            .polls
            .iter()
            .filter(|poll| poll.session_id == session_id && poll.is_open_at(now))
            .max_by_key(|poll| poll.created_at)
            .cloned())
    }

    async fn insert_record(&self, record: NewRecord) -> Result<AttendanceRecord, StoreError> {
        self.pause().await;
        let mut inner = self.lock();
        inner.operations.push(StoreOp::InsertRecord {
            student_id: record.student_id,
            session_id: record.session_id,
        });
        if !inner.attended.insert((record.student_id, record.session_id)) {
            return Err(StoreError::Duplicate);
        }
        let record = AttendanceRecord {
            id: Uuid::new_v4(),
            student_id: record.student_id,
            session_id: record.session_id,
            poll_id: record.poll_id,
            submitted_at: record.submitted_at,
        };
        inner.records.push(record.clone());
        Ok(record)
    }

    async fn record_for(
        &self,
        student_id: Uuid,
        session_id: Uuid,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        self.pause().await;
        let mut inner = self.lock();
        inner.operations.push(StoreOp::RecordFor {
            student_id,
            session_id,
        });
        Ok(inner
            .records
            .iter()
            .find(|record| record.student_id == student_id && record.session_id == session_id)
            .cloned())
    }

    async fn session_polls(&self, session_id: Uuid) -> Result<Vec<PollSummary>, StoreError> {
        self.pause().await;
        let mut inner = self.lock();
        inner.operations.push(StoreOp::SessionPolls { session_id });
        let mut polls: Vec<PollSummary> = inner
            .polls
            .iter()
            .filter(|poll| poll.session_id == session_id)
            .map(|poll| PollSummary {
                poll_id: poll.id,
                code: poll.code.clone(),
                expires_at: poll.expires_at,
                created_at: poll.created_at,
                record_count: inner
                    .records
                    .iter()
                    .filter(|record| record.poll_id == poll.id)
                    .count() as i64,
            })
            .collect();
        polls.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(polls)
    }

    async fn session_attendees(
        &self,
        session_id: Uuid,
    ) -> Result<Vec<SessionAttendee>, StoreError> {
        self.pause().await;
        let mut inner = self.lock();
        inner.operations.push(StoreOp::SessionAttendees { session_id });
        let mut attendees: Vec<SessionAttendee> = inner
            .records
            .iter()
            .filter(|record| record.session_id == session_id)
            .filter_map(|record| {
                inner.users.get(&record.student_id).map(|user| SessionAttendee {
                    student_id: record.student_id,
                    name: user.name.clone(),
                    email: user.email.clone(),
                    marked_at: record.submitted_at,
                    poll_id: record.poll_id,
                    poll_code: poll_code(&inner, record.poll_id),
                })
            })
            .collect();
        attendees.sort_by(|a, b| a.marked_at.cmp(&b.marked_at));
        Ok(attendees)
    }

    async fn class_records(&self, class_id: Uuid) -> Result<Vec<ClassRecord>, StoreError> {
        self.pause().await;
        let mut inner = self.lock();
        inner.operations.push(StoreOp::ClassRecords { class_id });
        Ok(inner
            .records
            .iter()
            .filter(|record| {
                inner
                    .sessions
                    .get(&record.session_id)
                    .is_some_and(|session| session.class_id == class_id)
            })
            .map(|record| ClassRecord {
                student_id: record.student_id,
                session_id: record.session_id,
                marked_at: record.submitted_at,
                poll_code: poll_code(&inner, record.poll_id),
            })
            .collect())
    }

    async fn polled_sessions(&self, class_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        self.pause().await;
        let mut inner = self.lock();
        inner.operations.push(StoreOp::PolledSessions { class_id });
        let sessions: HashSet<Uuid> = inner
            .polls
            .iter()
            .filter(|poll| {
                inner
                    .sessions
                    .get(&poll.session_id)
                    .is_some_and(|session| session.class_id == class_id)
            })
            .map(|poll| poll.session_id)
            .collect();
        Ok(sessions.into_iter().collect())
    }

    async fn student_records(
        &self,
        student_id: Uuid,
    ) -> Result<Vec<StudentAttendance>, StoreError> {
        self.pause().await;
        let mut inner = self.lock();
        inner.operations.push(StoreOp::StudentRecords { student_id });
        let mut records: Vec<StudentAttendance> = inner
            .records
            .iter()
            .filter(|record| record.student_id == student_id)
            .filter_map(|record| {
                let session = inner.sessions.get(&record.session_id)?;
                let class = inner.classes.get(&session.class_id)?;
                Some(StudentAttendance {
                    course_id: class.id,
                    course_name: class.name.clone(),
                    session_id: session.id,
                    session_name: session.name.clone(),
                    date: session.date,
                    status: "present".to_string(),
                    marked_at: record.submitted_at,
                    poll_code: poll_code(&inner, record.poll_id),
                })
            })
            .collect();
        records.sort_by(|a, b| b.marked_at.cmp(&a.marked_at));
        Ok(records)
    }
}
