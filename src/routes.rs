// src/routes.rs

use axum::{
    Router,
    http::Method,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{attempt, exam, results, student},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (students, exams, attempts).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool + Config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let student_routes = Router::new()
        .route("/", post(student::register_student))
        .route("/{id}", get(student::get_student))
        .route("/{id}/results", get(results::student_results));

    let exam_routes = Router::new()
        .route("/", get(exam::list_exams).post(exam::create_exam))
        .route("/{id}", get(exam::get_exam))
        .route(
            "/{id}/questions",
            get(exam::list_exam_questions).post(exam::create_question),
        )
        .route("/{id}/attempts", post(attempt::start_attempt));

    let attempt_routes = Router::new()
        .route("/{id}", get(attempt::get_attempt))
        .route("/{id}/answers", post(attempt::submit_answer))
        .route("/{id}/submit", post(attempt::close_attempt));

    Router::new()
        .nest("/api/students", student_routes)
        .nest("/api/exams", exam_routes)
        .nest("/api/attempts", attempt_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
