// src/handlers/attempt.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    engine::lifecycle,
    error::AppError,
    models::{
        answer::SubmitAnswerRequest,
        attempt::StartAttemptRequest,
        question::OptionTag,
    },
    state::AppState,
};

/// Starts an attempt at an exam, or resumes the student's open one.
pub async fn start_attempt(
    State(state): State<AppState>,
    Path(exam_id): Path<i64>,
    Json(payload): Json<StartAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = lifecycle::start(
        &state.pool,
        state.config.retake_policy,
        payload.student_id,
        exam_id,
    )
    .await?;

    Ok(Json(attempt))
}

/// Retrieves an attempt together with its recorded answers.
pub async fn get_attempt(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = lifecycle::get(&pool, id).await?;
    let answers = lifecycle::answers(&pool, id).await?;

    Ok(Json(serde_json::json!({
        "attempt": attempt,
        "answers": answers,
    })))
}

/// Records the answer to one question of an open attempt.
///
/// Upsert semantics: re-answering the same question overwrites the earlier
/// choice. 409 if the attempt is closed or past its deadline.
pub async fn submit_answer(
    State(pool): State<SqlitePool>,
    Path(attempt_id): Path<i64>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let selected = match payload.selected_option.as_deref() {
        None => None,
        Some(letter) => Some(OptionTag::from_letter(letter).ok_or_else(|| {
            AppError::BadRequest(format!(
                "Invalid selected_option '{}': must be A, B, C or D",
                letter
            ))
        })?),
    };

    let record = lifecycle::record_answer(&pool, attempt_id, payload.question_id, selected).await?;

    Ok(Json(record))
}

/// Closes an open attempt and returns it with the final score.
pub async fn close_attempt(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = lifecycle::submit(&pool, id).await?;

    Ok(Json(attempt))
}
