// src/engine/scoring.rs

use std::collections::HashMap;

use crate::models::{answer::AnswerRecord, question::Question};

/// Computes the obtained marks for a finished attempt.
///
/// Sums the marks of every question whose recorded answer was correct at
/// write time. Skipped questions and blank answers contribute nothing; an
/// answer referencing a question outside the set is ignored. The result is
/// clamped to `[0, sum of all question marks]` — the (attempt, question)
/// uniqueness of the ledger means the cap never fires in practice.
pub fn score(questions: &[Question], answers: &[AnswerRecord]) -> i64 {
    let marks_by_id: HashMap<i64, i64> = questions.iter().map(|q| (q.id, q.marks)).collect();
    let total: i64 = questions.iter().map(|q| q.marks).sum();

    let obtained: i64 = answers
        .iter()
        .filter(|a| a.is_correct)
        .filter_map(|a| marks_by_id.get(&a.question_id))
        .copied()
        .sum();

    obtained.clamp(0, total)
}
