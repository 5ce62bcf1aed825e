#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use attendance_poll_backend::auth::{Principal, Role};
use attendance_poll_backend::models::{ClassRole, Poll};
use attendance_poll_backend::{AppState, Config, MemoryStore};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// One class with one session, a professor and an enrolled student.
pub struct Fixture {
    pub store: MemoryStore,
    pub state: AppState,
    pub class_id: Uuid,
    pub session_id: Uuid,
    pub professor: Uuid,
    pub student: Uuid,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self::with_store(MemoryStore::with_latency(latency))
    }

    pub fn with_config(config: Config) -> Self {
        Self::build(MemoryStore::new(), config)
    }

    fn with_store(store: MemoryStore) -> Self {
        Self::build(store, Config::default())
    }

    fn build(store: MemoryStore, config: Config) -> Self {
        let class_id = store.add_class("Systems Programming");
        let session_id = store.add_session(class_id, "Lecture 1", date(2026, 10, 1));
        let professor = store.add_user("Ada Professor", "ada@example.edu");
        let student = store.add_user("Sam Student", "sam@example.edu");
        store.enroll(professor, class_id, ClassRole::Professor);
        store.enroll(student, class_id, ClassRole::Student);

        let state = AppState::new(Arc::new(store.clone()), config);

        Self {
            store,
            state,
            class_id,
            session_id,
            professor,
            student,
        }
    }

    pub fn add_student(&self, name: &str) -> Uuid {
        let id = self
            .store
            .add_user(name, &format!("{}@example.edu", name.to_lowercase().replace(' ', ".")));
        self.store.enroll(id, self.class_id, ClassRole::Student);
        id
    }

    pub fn add_session(&self, name: &str, day: u32) -> Uuid {
        self.store.add_session(self.class_id, name, date(2026, 10, day))
    }

    /// Stores a poll with a known code instead of a generated one.
    pub fn seed_poll(
        &self,
        session_id: Uuid,
        code: &str,
        created_at: DateTime<Utc>,
        duration_minutes: i32,
    ) -> Poll {
        let poll = Poll {
            id: Uuid::new_v4(),
            session_id,
            created_by: self.professor,
            code: code.to_string(),
            expires_at: created_at + chrono::Duration::minutes(i64::from(duration_minutes)),
            duration_minutes,
            active: true,
            created_at,
        };
        self.store.seed_poll(poll.clone());
        poll
    }
}

pub fn user(id: Uuid) -> Principal {
    Principal {
        id,
        role: Role::User,
    }
}

pub fn admin(id: Uuid) -> Principal {
    Principal {
        id,
        role: Role::Admin,
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub fn minutes(n: i64) -> chrono::Duration {
    chrono::Duration::minutes(n)
}

pub fn init_test_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
