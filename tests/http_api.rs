//! End-to-end checks of the HTTP surface over the in-memory store.

mod common;

use attendance_poll_backend::auth::{USER_ID_HEADER, USER_ROLE_HEADER};
use attendance_poll_backend::code::is_valid_code;
use attendance_poll_backend::create_routes;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Utc};
use common::{minutes, Fixture};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

async fn call(
    router: &Router,
    method: Method,
    uri: &str,
    user: Option<Uuid>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(USER_ID_HEADER, user.to_string());
    }

    let request = match body {
        Some(payload) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&payload).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn router(fx: &Fixture) -> Router {
    create_routes(fx.state.clone())
}

#[tokio::test]
async fn missing_principal_is_unauthorized() {
    let fx = Fixture::new();
    let app = router(&fx);

    let (status, body) = call(
        &app,
        Method::POST,
        "/attendance/submit",
        None,
        Some(json!({ "code": "12345678" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");
    assert!(fx.store.operations().is_empty());
}

#[tokio::test]
async fn garbage_identity_header_is_unauthorized() {
    let fx = Fixture::new();
    let request = Request::builder()
        .uri("/attendance/student/me")
        .header(USER_ID_HEADER, "not-a-uuid")
        .header(USER_ROLE_HEADER, "admin")
        .body(Body::empty())
        .unwrap();

    let response = router(&fx).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_then_submit_round() {
    let fx = Fixture::new();
    let app = router(&fx);
    let before = Utc::now();

    let (status, created) = call(
        &app,
        Method::POST,
        "/attendance/poll/create",
        Some(fx.professor),
        Some(json!({ "sessionId": fx.session_id, "durationMinutes": 15 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let code = created["code"].as_str().unwrap().to_string();
    assert!(is_valid_code(&code));
    assert_eq!(created["sessionId"], json!(fx.session_id));
    let expires_at: DateTime<Utc> = created["expiresAt"].as_str().unwrap().parse().unwrap();
    assert!(expires_at >= before + minutes(15));
    assert!(expires_at <= Utc::now() + minutes(15));

    let (status, status_body) = call(
        &app,
        Method::GET,
        &format!("/attendance/session/{}/code-status", fx.session_id),
        Some(fx.professor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(status_body["code"], json!(code));

    let (status, submitted) = call(
        &app,
        Method::POST,
        "/attendance/submit",
        Some(fx.student),
        Some(json!({ "code": code })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(submitted["status"], "success");
    assert_eq!(submitted["sessionId"], json!(fx.session_id));

    let (status, body) = call(
        &app,
        Method::POST,
        "/attendance/submit",
        Some(fx.student),
        Some(json!({ "code": code })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CONFLICT");
}

#[tokio::test]
async fn create_poll_error_statuses() {
    let fx = Fixture::new();
    let app = router(&fx);

    let cases = [
        (
            fx.professor,
            json!({ "sessionId": fx.session_id, "durationMinutes": "soon" }),
            StatusCode::BAD_REQUEST,
        ),
        (
            fx.professor,
            json!({ "sessionId": fx.session_id, "durationMinutes": 1.5 }),
            StatusCode::BAD_REQUEST,
        ),
        (
            fx.professor,
            json!({ "durationMinutes": 10 }),
            StatusCode::BAD_REQUEST,
        ),
        (
            fx.student,
            json!({ "sessionId": fx.session_id }),
            StatusCode::FORBIDDEN,
        ),
        (
            fx.professor,
            json!({ "sessionId": Uuid::new_v4() }),
            StatusCode::NOT_FOUND,
        ),
    ];

    for (user, body, expected) in cases {
        let (status, _) = call(
            &app,
            Method::POST,
            "/attendance/poll/create",
            Some(user),
            Some(body.clone()),
        )
        .await;
        assert_eq!(status, expected, "{body}");
    }
    assert!(fx.store.polls().is_empty());
}

#[tokio::test]
async fn submit_error_statuses() {
    let fx = Fixture::new();
    let app = router(&fx);
    let now = Utc::now();
    fx.seed_poll(fx.session_id, "12345678", now - minutes(5), 10);
    fx.seed_poll(fx.session_id, "87654321", now - minutes(30), 10);
    let outsider = fx.store.add_user("Oli Outsider", "oli@example.edu");

    let cases = [
        (fx.student, "123", StatusCode::BAD_REQUEST),
        (fx.student, "12 34 56 78", StatusCode::BAD_REQUEST),
        (fx.student, "00000000", StatusCode::NOT_FOUND),
        (fx.student, "87654321", StatusCode::GONE),
        (outsider, "12345678", StatusCode::FORBIDDEN),
    ];

    for (user, code, expected) in cases {
        let (status, body) = call(
            &app,
            Method::POST,
            "/attendance/submit",
            Some(user),
            Some(json!({ "code": code })),
        )
        .await;
        assert_eq!(status, expected, "{code}");
        assert!(body["message"].is_string());
    }
    assert!(fx.store.records().is_empty());
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let fx = Fixture::new();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/attendance/submit")
        .header(USER_ID_HEADER, fx.student.to_string())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"code\":"))
        .unwrap();

    let response = router(&fx).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn mark_reports_repeat_as_success() {
    let fx = Fixture::new();
    let app = router(&fx);
    fx.seed_poll(fx.session_id, "12345678", Utc::now(), 10);

    for expect_repeat in [false, true] {
        let (status, body) = call(
            &app,
            Method::POST,
            "/attendance/mark",
            Some(fx.student),
            Some(json!({ "courseId": fx.class_id, "code": "1234 5678" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body.get("alreadyMarked").is_some(), expect_repeat);
    }
}

#[tokio::test]
async fn analytics_routes() {
    let fx = Fixture::new();
    let app = router(&fx);
    let now = Utc::now();
    fx.seed_poll(fx.session_id, "12345678", now, 10);
    call(
        &app,
        Method::POST,
        "/attendance/submit",
        Some(fx.student),
        Some(json!({ "code": "12345678" })),
    )
    .await;

    let (status, session) = call(
        &app,
        Method::GET,
        &format!("/attendance/session/{}", fx.session_id),
        Some(fx.professor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["polls"][0]["recordCount"], 1);
    assert_eq!(session["attendance"][0]["studentId"], json!(fx.student));

    let (status, summary) = call(
        &app,
        Method::GET,
        &format!("/attendance/course/{}/summary", fx.class_id),
        Some(fx.professor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["students"][0]["attendancePercentage"], 100);

    let (status, _) = call(
        &app,
        Method::GET,
        &format!("/attendance/course/{}/summary", fx.class_id),
        Some(fx.student),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, records) = call(
        &app,
        Method::GET,
        &format!("/attendance/course/{}/records", fx.class_id),
        Some(fx.professor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(records["students"][0]["sessionAttendance"][fx.session_id.to_string()].is_object());

    let (status, mine) = call(
        &app,
        Method::GET,
        &format!("/attendance/course/{}/student/me", fx.class_id),
        Some(fx.student),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine["presentCount"], 1);

    let (status, history) = call(
        &app,
        Method::GET,
        "/attendance/student/me",
        Some(fx.student),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["attendance"].as_array().unwrap().len(), 1);

    let (status, grouped) = call(
        &app,
        Method::GET,
        "/attendance/student/me/courses",
        Some(fx.student),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(grouped[0]["courseName"], "Systems Programming");

    let (status, _) = call(
        &app,
        Method::GET,
        &format!("/attendance/student/{}", fx.student),
        Some(fx.professor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn code_status_is_null_without_live_poll() {
    let fx = Fixture::new();
    fx.seed_poll(fx.session_id, "12345678", Utc::now() - minutes(60), 10);

    let (status, body) = call(
        &router(&fx),
        Method::GET,
        &format!("/attendance/session/{}/code-status", fx.session_id),
        Some(fx.professor),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.is_null());
}
