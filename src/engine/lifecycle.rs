// src/engine/lifecycle.rs

use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    config::RetakePolicy,
    engine::{expiry, registry, scoring},
    error::AppError,
    models::{
        answer::AnswerRecord,
        attempt::{Attempt, AttemptStatus},
        exam::Exam,
        question::{OptionTag, Question},
    },
};

/// Starts (or resumes) an attempt for a student on an exam.
///
/// An open attempt for the pair is returned as-is, so repeated starts are
/// idempotent. An open attempt past its deadline is expired first and then
/// treated as history. Whether history blocks a fresh attempt is decided by
/// the retake policy.
pub async fn start(
    pool: &SqlitePool,
    policy: RetakePolicy,
    student_id: i64,
    exam_id: i64,
) -> Result<Attempt, AppError> {
    let student = sqlx::query_scalar::<_, i64>("SELECT id FROM students WHERE id = ?")
        .bind(student_id)
        .fetch_optional(pool)
        .await?;

    if student.is_none() {
        return Err(AppError::NotFound("Student not found".to_string()));
    }

    let exam = fetch_exam(pool, exam_id).await?;
    if !exam.is_active {
        // Inactive exams are invisible to students.
        return Err(AppError::NotFound("Exam not found".to_string()));
    }

    if let Some(open) = registry::find_in_progress(pool, student_id, exam_id).await? {
        if expiry::is_past_deadline(&open, &exam, Utc::now()) {
            expiry::expire(pool, &open, &exam).await?;
        } else {
            return Ok(open);
        }
    }

    if policy == RetakePolicy::Single && registry::has_attempted(pool, student_id, exam_id).await? {
        return Err(AppError::Conflict(
            "Exam already attempted and retakes are disabled".to_string(),
        ));
    }

    let attempt = sqlx::query_as::<_, Attempt>(
        r#"
        INSERT INTO attempts (student_id, exam_id, start_time, status)
        VALUES (?, ?, ?, 'IN_PROGRESS')
        RETURNING id, student_id, exam_id, start_time, end_time, status, obtained_marks
        "#,
    )
    .bind(student_id)
    .bind(exam_id)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    tracing::info!(
        "Started attempt {} (student {}, exam {})",
        attempt.id,
        student_id,
        exam_id
    );

    Ok(attempt)
}

/// Records (or re-records) the answer to one question of an open attempt.
///
/// The write is a single upsert keyed by (attempt_id, question_id):
/// idempotent, last-write-wins, never a duplicate row. Correctness is
/// computed here against the question's answer key; a skipped question
/// (no selection) is recorded as incorrect.
pub async fn record_answer(
    pool: &SqlitePool,
    attempt_id: i64,
    question_id: i64,
    selected: Option<OptionTag>,
) -> Result<AnswerRecord, AppError> {
    let attempt = fetch_attempt(pool, attempt_id).await?;
    let exam = fetch_exam(pool, attempt.exam_id).await?;

    reject_if_closed(pool, &attempt, &exam).await?;

    let question = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, exam_id, question_text, option_a, option_b, option_c, option_d,
               correct_option, marks
        FROM questions
        WHERE id = ? AND exam_id = ?
        "#,
    )
    .bind(question_id)
    .bind(attempt.exam_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound(
        "Question not found for this exam".to_string(),
    ))?;

    let is_correct = selected.is_some_and(|s| s == question.correct_option);

    let record = sqlx::query_as::<_, AnswerRecord>(
        r#"
        INSERT INTO answers (attempt_id, question_id, selected_option, is_correct)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(attempt_id, question_id) DO UPDATE SET
            selected_option = excluded.selected_option,
            is_correct = excluded.is_correct
        RETURNING id, attempt_id, question_id, selected_option, is_correct
        "#,
    )
    .bind(attempt_id)
    .bind(question_id)
    .bind(selected)
    .bind(is_correct)
    .fetch_one(pool)
    .await?;

    Ok(record)
}

/// Closes an open attempt, scores it and persists the obtained marks.
///
/// The IN_PROGRESS -> COMPLETED transition is guarded inside a transaction,
/// so a second submit (or a submit racing the expiry sweep) finds the guard
/// already taken and fails without re-scoring.
pub async fn submit(pool: &SqlitePool, attempt_id: i64) -> Result<Attempt, AppError> {
    let attempt = fetch_attempt(pool, attempt_id).await?;
    let exam = fetch_exam(pool, attempt.exam_id).await?;

    reject_if_closed(pool, &attempt, &exam).await?;

    let closed = finalize(
        pool,
        attempt_id,
        attempt.exam_id,
        AttemptStatus::Completed,
        Utc::now(),
    )
    .await?;

    if !closed {
        return Err(AppError::InvalidState(
            "Attempt is already closed".to_string(),
        ));
    }

    let attempt = fetch_attempt(pool, attempt_id).await?;
    tracing::info!(
        "Attempt {} completed with {} marks",
        attempt.id,
        attempt.obtained_marks.unwrap_or(0)
    );

    Ok(attempt)
}

/// Fetches an attempt, expiring it first if it is open but past its
/// deadline, so readers never observe a stale IN_PROGRESS.
pub async fn get(pool: &SqlitePool, attempt_id: i64) -> Result<Attempt, AppError> {
    let attempt = fetch_attempt(pool, attempt_id).await?;

    if attempt.status == AttemptStatus::InProgress {
        let exam = fetch_exam(pool, attempt.exam_id).await?;
        if expiry::expire_if_overdue(pool, &attempt, &exam).await? {
            return fetch_attempt(pool, attempt_id).await;
        }
    }

    Ok(attempt)
}

/// All answers recorded for an attempt, in stable question order.
pub async fn answers(pool: &SqlitePool, attempt_id: i64) -> Result<Vec<AnswerRecord>, AppError> {
    let records = sqlx::query_as::<_, AnswerRecord>(
        r#"
        SELECT id, attempt_id, question_id, selected_option, is_correct
        FROM answers
        WHERE attempt_id = ?
        ORDER BY question_id
        "#,
    )
    .bind(attempt_id)
    .fetch_all(pool)
    .await?;

    Ok(records)
}

/// Moves an open attempt to a terminal state and persists its score.
///
/// Returns false if the attempt was no longer IN_PROGRESS, in which case
/// nothing is written. The answer set is read inside the same transaction
/// as the status flip, so the score reflects every acknowledged write.
pub(crate) async fn finalize(
    pool: &SqlitePool,
    attempt_id: i64,
    exam_id: i64,
    status: AttemptStatus,
    end_time: chrono::DateTime<chrono::Utc>,
) -> Result<bool, AppError> {
    let mut tx = pool.begin().await?;

    let flipped = sqlx::query(
        "UPDATE attempts SET status = ?, end_time = ? WHERE id = ? AND status = 'IN_PROGRESS'",
    )
    .bind(status)
    .bind(end_time)
    .bind(attempt_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if flipped == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, exam_id, question_text, option_a, option_b, option_c, option_d,
               correct_option, marks
        FROM questions
        WHERE exam_id = ?
        ORDER BY id
        "#,
    )
    .bind(exam_id)
    .fetch_all(&mut *tx)
    .await?;

    let answers = sqlx::query_as::<_, AnswerRecord>(
        "SELECT id, attempt_id, question_id, selected_option, is_correct FROM answers WHERE attempt_id = ?",
    )
    .bind(attempt_id)
    .fetch_all(&mut *tx)
    .await?;

    let obtained = scoring::score(&questions, &answers);

    sqlx::query("UPDATE attempts SET obtained_marks = ? WHERE id = ?")
        .bind(obtained)
        .bind(attempt_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(true)
}

/// Rejects mutation of a closed attempt, expiring overdue ones on the way.
async fn reject_if_closed(
    pool: &SqlitePool,
    attempt: &Attempt,
    exam: &Exam,
) -> Result<(), AppError> {
    if attempt.status == AttemptStatus::InProgress {
        if expiry::expire_if_overdue(pool, attempt, exam).await? {
            return Err(AppError::InvalidState("Attempt has expired".to_string()));
        }
        return Ok(());
    }

    Err(AppError::InvalidState(
        "Attempt is already closed".to_string(),
    ))
}

pub(crate) async fn fetch_attempt(pool: &SqlitePool, attempt_id: i64) -> Result<Attempt, AppError> {
    sqlx::query_as::<_, Attempt>(
        r#"
        SELECT id, student_id, exam_id, start_time, end_time, status, obtained_marks
        FROM attempts
        WHERE id = ?
        "#,
    )
    .bind(attempt_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Attempt not found".to_string()))
}

pub(crate) async fn fetch_exam(pool: &SqlitePool, exam_id: i64) -> Result<Exam, AppError> {
    sqlx::query_as::<_, Exam>(
        r#"
        SELECT id, title, description, duration_minutes, total_marks, passing_marks,
               is_active, created_at
        FROM exams
        WHERE id = ?
        "#,
    )
    .bind(exam_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Exam not found".to_string()))
}
