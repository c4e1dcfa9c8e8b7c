// src/engine/expiry.rs
//
// Time-limit enforcement. Overdue attempts are expired on read and on
// write, and a periodic sweep catches the ones nobody touches.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::{
    engine::lifecycle,
    error::AppError,
    models::{
        attempt::{Attempt, AttemptStatus},
        exam::Exam,
    },
};

/// The wall-clock cutoff of an attempt.
pub fn deadline(start_time: DateTime<Utc>, duration_minutes: i64) -> DateTime<Utc> {
    start_time + chrono::Duration::minutes(duration_minutes)
}

pub fn is_past_deadline(attempt: &Attempt, exam: &Exam, now: DateTime<Utc>) -> bool {
    attempt.status == AttemptStatus::InProgress
        && now > deadline(attempt.start_time, exam.duration_minutes)
}

/// Transitions an open attempt to EXPIRED with `end_time` pinned to the
/// deadline. Answers recorded before the cutoff are scored and kept.
/// Returns false if a racing close already took the attempt.
pub async fn expire(pool: &SqlitePool, attempt: &Attempt, exam: &Exam) -> Result<bool, AppError> {
    let end = deadline(attempt.start_time, exam.duration_minutes);
    let expired =
        lifecycle::finalize(pool, attempt.id, exam.id, AttemptStatus::Expired, end).await?;

    if expired {
        tracing::info!("Attempt {} expired past its deadline", attempt.id);
    }

    Ok(expired)
}

/// Expires the attempt only if it is actually overdue.
pub async fn expire_if_overdue(
    pool: &SqlitePool,
    attempt: &Attempt,
    exam: &Exam,
) -> Result<bool, AppError> {
    if is_past_deadline(attempt, exam, Utc::now()) {
        return expire(pool, attempt, exam).await;
    }
    Ok(false)
}

#[derive(sqlx::FromRow)]
struct OverdueCandidate {
    id: i64,
    exam_id: i64,
    start_time: DateTime<Utc>,
    duration_minutes: i64,
}

/// Expires every open attempt past its deadline. Returns how many were
/// transitioned; attempts closed by a racing submit are skipped by the
/// guarded update inside `finalize`.
pub async fn sweep(pool: &SqlitePool) -> Result<u64, AppError> {
    let candidates = sqlx::query_as::<_, OverdueCandidate>(
        r#"
        SELECT a.id, a.exam_id, a.start_time, e.duration_minutes
        FROM attempts a
        JOIN exams e ON e.id = a.exam_id
        WHERE a.status = 'IN_PROGRESS'
        "#,
    )
    .fetch_all(pool)
    .await?;

    let now = Utc::now();
    let mut expired = 0;

    for candidate in candidates {
        let end = deadline(candidate.start_time, candidate.duration_minutes);
        if now > end
            && lifecycle::finalize(
                pool,
                candidate.id,
                candidate.exam_id,
                AttemptStatus::Expired,
                end,
            )
            .await?
        {
            expired += 1;
        }
    }

    Ok(expired)
}

/// Background loop driving `sweep`. Spawned once at startup.
pub async fn run_sweeper(pool: SqlitePool, interval_secs: u64) {
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs.max(1)));

    loop {
        ticker.tick().await;
        match sweep(&pool).await {
            Ok(0) => {}
            Ok(n) => tracing::info!("Expiry sweep closed {} overdue attempts", n),
            Err(e) => tracing::error!("Expiry sweep failed: {:?}", e),
        }
    }
}
