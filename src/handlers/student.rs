// src/handlers/student.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::student::{RegisterStudentRequest, Student},
};

/// Registers a new student.
///
/// Identity only; credential management lives outside this service.
/// Returns 201 Created and the student object.
pub async fn register_student(
    State(pool): State<SqlitePool>,
    Json(payload): Json<RegisterStudentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let student = sqlx::query_as::<_, Student>(
        r#"
        INSERT INTO students (name, email)
        VALUES (?, ?)
        RETURNING id, name, email, created_at
        "#,
    )
    .bind(&payload.name)
    .bind(&payload.email)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            AppError::Conflict(format!("Email '{}' is already registered", payload.email))
        } else {
            tracing::error!("Failed to register student: {:?}", e);
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(student)))
}

/// Retrieves a single student by ID.
pub async fn get_student(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student = sqlx::query_as::<_, Student>(
        "SELECT id, name, email, created_at FROM students WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Student not found".to_string()))?;

    Ok(Json(student))
}
