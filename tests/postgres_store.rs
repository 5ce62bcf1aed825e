//! Runs against a real Postgres when `TEST_DATABASE_URL` is set and is a
//! no-op otherwise.

mod common;

use std::sync::Arc;

use attendance_poll_backend::db::{create_pool, PgStore};
use attendance_poll_backend::models::{ClassRole, NewRecord};
use attendance_poll_backend::poll::create_poll;
use attendance_poll_backend::services::Roster;
use attendance_poll_backend::store::{AttendanceStore, StoreError};
use attendance_poll_backend::submission::submit_attendance;
use attendance_poll_backend::{AppError, AppState, Config};
use chrono::Utc;
use common::{date, user};
use sqlx::PgPool;
use tokio::task::JoinSet;
use uuid::Uuid;

async fn pool() -> Option<PgPool> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = create_pool(&Config::default(), &url)
        .await
        .expect("connect to test database");
    Some(pool)
}

struct Seeded {
    class_id: Uuid,
    session_id: Uuid,
    professor: Uuid,
    student: Uuid,
}

async fn seed_user(pool: &PgPool, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, name, email) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(name)
        .bind(format!("{id}@example.edu"))
        .execute(pool)
        .await
        .unwrap();
    id
}

async fn seed(pool: &PgPool) -> Seeded {
    let class_id = Uuid::new_v4();
    sqlx::query("INSERT INTO classes (id, name) VALUES ($1, 'Compilers')")
        .bind(class_id)
        .execute(pool)
        .await
        .unwrap();

    let session_id = Uuid::new_v4();
    sqlx::query("INSERT INTO course_sessions (id, class_id, name, date) VALUES ($1, $2, 'Lecture 1', $3)")
        .bind(session_id)
        .bind(class_id)
        .bind(date(2026, 10, 1))
        .execute(pool)
        .await
        .unwrap();

    let professor = seed_user(pool, "Professor").await;
    let student = seed_user(pool, "Student").await;
    for (user_id, role) in [(professor, ClassRole::Professor), (student, ClassRole::Student)] {
        sqlx::query("INSERT INTO class_roles (user_id, class_id, role) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(class_id)
            .bind(role.as_str())
            .execute(pool)
            .await
            .unwrap();
    }

    Seeded {
        class_id,
        session_id,
        professor,
        student,
    }
}

#[tokio::test]
async fn unique_violation_maps_to_duplicate() {
    let Some(pool) = pool().await else {
        return;
    };
    let seeded = seed(&pool).await;
    let store = PgStore::new(pool.clone());
    let state = AppState::new(Arc::new(store.clone()), Config::default());

    let poll = create_poll(&state, &user(seeded.professor), seeded.session_id, None, Utc::now())
        .await
        .unwrap();

    let record = || NewRecord {
        student_id: seeded.student,
        session_id: seeded.session_id,
        poll_id: poll.id,
        submitted_at: Utc::now(),
    };
    store.insert_record(record()).await.unwrap();
    let err = store.insert_record(record()).await.unwrap_err();
    assert!(matches!(err, StoreError::Duplicate), "{err:?}");

    assert!(store.is_student_of(seeded.student, seeded.class_id).await.unwrap());
    assert!(store.is_instructor_of(seeded.professor, seeded.class_id).await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicates_leave_one_row() {
    let Some(pool) = pool().await else {
        return;
    };
    let seeded = seed(&pool).await;
    let state = AppState::new(Arc::new(PgStore::new(pool.clone())), Config::default());

    let poll = create_poll(&state, &user(seeded.professor), seeded.session_id, None, Utc::now())
        .await
        .unwrap();

    let mut tasks = JoinSet::new();
    for _ in 0..16 {
        let state = state.clone();
        let code = poll.code.clone();
        let principal = user(seeded.student);
        tasks.spawn(async move { submit_attendance(&state, &principal, &code, Utc::now()).await });
    }

    let mut successes = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined.unwrap() {
            Ok(_) => successes += 1,
            Err(AppError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }
    assert_eq!(successes, 1);

    let rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM attendance_records WHERE student_id = $1 AND session_id = $2",
    )
    .bind(seeded.student)
    .bind(seeded.session_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(rows, 1);
}
