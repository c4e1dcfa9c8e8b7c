// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// One of the four fixed option slots of a multiple-choice question.
/// Stored as TEXT ('A'..'D') in both questions and answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "UPPERCASE")]
pub enum OptionTag {
    A,
    B,
    C,
    D,
}

impl OptionTag {
    /// Parses a single option letter. Rejected before any write.
    pub fn from_letter(s: &str) -> Option<Self> {
        match s {
            "A" => Some(OptionTag::A),
            "B" => Some(OptionTag::B),
            "C" => Some(OptionTag::C),
            "D" => Some(OptionTag::D),
            _ => None,
        }
    }
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub exam_id: i64,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_option: OptionTag,
    pub marks: i64,
}

/// DTO for sending a question to a student (excludes the answer key).
#[derive(Debug, Serialize, FromRow)]
pub struct PublicQuestion {
    pub id: i64,
    pub exam_id: i64,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub marks: i64,
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 2000))]
    pub question_text: String,
    #[validate(length(min = 1, max = 500))]
    pub option_a: String,
    #[validate(length(min = 1, max = 500))]
    pub option_b: String,
    #[validate(length(min = 1, max = 500))]
    pub option_c: String,
    #[validate(length(min = 1, max = 500))]
    pub option_d: String,
    /// 'A', 'B', 'C' or 'D'.
    pub correct_option: String,
    #[validate(range(min = 1))]
    pub marks: i64,
}
