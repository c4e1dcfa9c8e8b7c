// src/handlers/exam.rs

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
    models::{
        exam::{CreateExamRequest, Exam},
        question::{CreateQuestionRequest, OptionTag, PublicQuestion, Question},
    },
};

/// Creates a new exam.
pub async fn create_exam(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if payload.passing_marks > payload.total_marks {
        return Err(AppError::BadRequest(
            "passing_marks cannot exceed total_marks".to_string(),
        ));
    }

    let exam = sqlx::query_as::<_, Exam>(
        r#"
        INSERT INTO exams (title, description, duration_minutes, total_marks, passing_marks)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id, title, description, duration_minutes, total_marks, passing_marks,
                  is_active, created_at
        "#,
    )
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(payload.duration_minutes)
    .bind(payload.total_marks)
    .bind(payload.passing_marks)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(exam)))
}

/// Lists all active exams.
pub async fn list_exams(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let exams = sqlx::query_as::<_, Exam>(
        r#"
        SELECT id, title, description, duration_minutes, total_marks, passing_marks,
               is_active, created_at
        FROM exams
        WHERE is_active = 1
        ORDER BY id
        "#,
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(exams))
}

/// Retrieves a single exam by ID.
pub async fn get_exam(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = sqlx::query_as::<_, Exam>(
        r#"
        SELECT id, title, description, duration_minutes, total_marks, passing_marks,
               is_active, created_at
        FROM exams
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    Ok(Json(exam))
}

/// Adds a question to an exam.
pub async fn create_question(
    State(pool): State<SqlitePool>,
    Path(exam_id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let correct_option = OptionTag::from_letter(&payload.correct_option).ok_or_else(|| {
        AppError::BadRequest(format!(
            "Invalid correct_option '{}': must be A, B, C or D",
            payload.correct_option
        ))
    })?;

    let exam_exists = sqlx::query_scalar::<_, i64>("SELECT id FROM exams WHERE id = ?")
        .bind(exam_id)
        .fetch_optional(&pool)
        .await?;

    if exam_exists.is_none() {
        return Err(AppError::NotFound("Exam not found".to_string()));
    }

    let question = sqlx::query_as::<_, Question>(
        r#"
        INSERT INTO questions (exam_id, question_text, option_a, option_b, option_c,
                               option_d, correct_option, marks)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id, exam_id, question_text, option_a, option_b, option_c, option_d,
                  correct_option, marks
        "#,
    )
    .bind(exam_id)
    .bind(&payload.question_text)
    .bind(&payload.option_a)
    .bind(&payload.option_b)
    .bind(&payload.option_c)
    .bind(&payload.option_d)
    .bind(correct_option)
    .bind(payload.marks)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(question)))
}

/// Lists an exam's questions in stable id order, without the answer key.
pub async fn list_exam_questions(
    State(pool): State<SqlitePool>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam_exists = sqlx::query_scalar::<_, i64>("SELECT id FROM exams WHERE id = ?")
        .bind(exam_id)
        .fetch_optional(&pool)
        .await?;

    if exam_exists.is_none() {
        return Err(AppError::NotFound("Exam not found".to_string()));
    }

    let questions = sqlx::query_as::<_, PublicQuestion>(
        r#"
        SELECT id, exam_id, question_text, option_a, option_b, option_c, option_d, marks
        FROM questions
        WHERE exam_id = ?
        ORDER BY id
        "#,
    )
    .bind(exam_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(questions))
}
