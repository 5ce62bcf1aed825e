// routes.rs
use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::auth::identity_from_headers;
use crate::handlers;
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    let attendance = Router::new()
        .route("/poll/create", post(handlers::create_poll))
        .route("/submit", post(handlers::submit))
        .route("/mark", post(handlers::mark))
        .route("/session/{session_id}", get(handlers::session_attendance))
        .route("/session/{session_id}/code-status", get(handlers::code_status))
        .route("/course/{course_id}/summary", get(handlers::course_summary))
        .route("/course/{course_id}/records", get(handlers::course_records))
        .route(
            "/course/{course_id}/student/me",
            get(handlers::my_course_attendance),
        )
        .route("/student/me", get(handlers::my_history))
        .route("/student/me/courses", get(handlers::my_history_by_course))
        .route("/student/{student_id}", get(handlers::student_history));

    Router::new()
        .nest("/attendance", attendance)
        .layer(middleware::from_fn(identity_from_headers))
        .layer(cors(&state.config.cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    match origin.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(err) => {
            warn!(%err, "invalid CORS origin, cross-origin requests disabled");
            layer
        }
    }
}
