// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle state of an attempt. Initial state is IN_PROGRESS; the other
/// three are terminal. SUBMITTED exists in the data model but no operation
/// here drives it; COMPLETED is reached via submit, EXPIRED via the deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptStatus {
    InProgress,
    Completed,
    Submitted,
    Expired,
}

impl AttemptStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, AttemptStatus::InProgress)
    }
}

/// Represents the 'attempts' table: one student's run at one exam.
///
/// Invariants: `obtained_marks` is null while IN_PROGRESS and lies within
/// `[0, exam.total_marks]` once set; `end_time` is null iff IN_PROGRESS.
/// Attempts are never deleted by the engine; they remain as history.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub student_id: i64,
    pub exam_id: i64,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
    pub status: AttemptStatus,
    pub obtained_marks: Option<i64>,
}

/// DTO for starting an attempt on an exam.
#[derive(Debug, Deserialize)]
pub struct StartAttemptRequest {
    pub student_id: i64,
}

/// Row shape for the results read side (attempts joined with exams).
#[derive(Debug, FromRow)]
pub struct ResultRow {
    pub attempt_id: i64,
    pub exam_id: i64,
    pub exam_title: String,
    pub obtained_marks: Option<i64>,
    pub total_marks: i64,
    pub passing_marks: i64,
    pub status: AttemptStatus,
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
}

/// One completed attempt as shown to the student, with pass/fail derived.
#[derive(Debug, Serialize)]
pub struct ResultSummary {
    pub attempt_id: i64,
    pub exam_id: i64,
    pub exam_title: String,
    pub obtained_marks: i64,
    pub total_marks: i64,
    pub passing_marks: i64,
    pub status: AttemptStatus,
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
    pub passed: bool,
}

impl From<ResultRow> for ResultSummary {
    fn from(row: ResultRow) -> Self {
        let obtained = row.obtained_marks.unwrap_or(0);
        ResultSummary {
            attempt_id: row.attempt_id,
            exam_id: row.exam_id,
            exam_title: row.exam_title,
            obtained_marks: obtained,
            total_marks: row.total_marks,
            passing_marks: row.passing_marks,
            status: row.status,
            end_time: row.end_time,
            passed: obtained >= row.passing_marks,
        }
    }
}
