// src/models/answer.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::question::OptionTag;

/// Represents the 'answers' table: the recorded choice (or skip) for one
/// question within one attempt. At most one row per (attempt, question);
/// resubmissions overwrite in place.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub id: i64,
    pub attempt_id: i64,
    pub question_id: i64,
    pub selected_option: Option<OptionTag>,
    /// Computed against the question's answer key at write time.
    pub is_correct: bool,
}

/// DTO for submitting (or re-submitting) an answer.
/// `selected_option` absent means the question was skipped.
#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    pub question_id: i64,
    pub selected_option: Option<String>,
}
