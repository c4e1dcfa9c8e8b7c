// src/handlers/results.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::attempt::{ResultRow, ResultSummary},
};

/// Lists a student's completed exam results.
///
/// Read-only view over the engine's output: derives `passed` from the
/// persisted marks and the exam's pass mark, never writes anything back.
pub async fn student_results(
    State(pool): State<SqlitePool>,
    Path(student_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student = sqlx::query_scalar::<_, i64>("SELECT id FROM students WHERE id = ?")
        .bind(student_id)
        .fetch_optional(&pool)
        .await?;

    if student.is_none() {
        return Err(AppError::NotFound("Student not found".to_string()));
    }

    let rows = sqlx::query_as::<_, ResultRow>(
        r#"
        SELECT a.id AS attempt_id, e.id AS exam_id, e.title AS exam_title,
               a.obtained_marks, e.total_marks, e.passing_marks, a.status, a.end_time
        FROM attempts a
        JOIN exams e ON e.id = a.exam_id
        WHERE a.student_id = ? AND a.status = 'COMPLETED'
        ORDER BY a.end_time DESC
        "#,
    )
    .bind(student_id)
    .fetch_all(&pool)
    .await?;

    let results: Vec<ResultSummary> = rows.into_iter().map(ResultSummary::from).collect();
    let passed_count = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    Ok(Json(serde_json::json!({
        "results": results,
        "total_results": total,
        "passed_exams": passed_count,
        "failed_exams": total - passed_count,
    })))
}
