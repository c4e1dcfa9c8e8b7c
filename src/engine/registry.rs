// src/engine/registry.rs

use sqlx::SqlitePool;

use crate::{error::AppError, models::attempt::Attempt};

/// Resolves the idempotent-start path: the open attempt for a
/// (student, exam) pair, if any. There is at most one by construction,
/// since `start` never inserts while one is open.
pub async fn find_in_progress(
    pool: &SqlitePool,
    student_id: i64,
    exam_id: i64,
) -> Result<Option<Attempt>, AppError> {
    let attempt = sqlx::query_as::<_, Attempt>(
        r#"
        SELECT id, student_id, exam_id, start_time, end_time, status, obtained_marks
        FROM attempts
        WHERE student_id = ? AND exam_id = ? AND status = 'IN_PROGRESS'
        ORDER BY id DESC
        LIMIT 1
        "#,
    )
    .bind(student_id)
    .bind(exam_id)
    .fetch_optional(pool)
    .await?;

    Ok(attempt)
}

/// Whether the student has any prior attempt (open or terminal) at the exam.
/// Backs the single-attempt retake policy.
pub async fn has_attempted(
    pool: &SqlitePool,
    student_id: i64,
    exam_id: i64,
) -> Result<bool, AppError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM attempts WHERE student_id = ? AND exam_id = ?)",
    )
    .bind(student_id)
    .bind(exam_id)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}
