// tests/attempt_flow_tests.rs

use exam_portal::{
    config::{Config, RetakePolicy},
    db, routes,
    state::AppState,
};
use sqlx::SqlitePool;

/// Helper to spawn the app on a random port against a throwaway database.
/// Returns the base URL and a pool for direct assertions.
async fn spawn_app_with_policy(policy: RetakePolicy) -> (String, SqlitePool) {
    let db_path = std::env::temp_dir().join(format!("exam_portal_{}.db", uuid::Uuid::new_v4()));
    let database_url = format!("sqlite:{}", db_path.display());

    let pool = db::connect(&database_url)
        .await
        .expect("Failed to open test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url,
        rust_log: "error".to_string(),
        retake_policy: policy,
        // Sweeper is exercised directly; keep it out of the way here.
        expiry_sweep_secs: 3600,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, pool)
}

async fn spawn_app() -> (String, SqlitePool) {
    spawn_app_with_policy(RetakePolicy::MultiWithHistory).await
}

async fn register_student(client: &reqwest::Client, address: &str) -> i64 {
    let email = format!(
        "s_{}@example.com",
        &uuid::Uuid::new_v4().to_string()[..8]
    );
    let resp = client
        .post(format!("{}/api/students", address))
        .json(&serde_json::json!({ "name": "Test Student", "email": email }))
        .send()
        .await
        .expect("Failed to register student");
    assert_eq!(resp.status().as_u16(), 201);
    resp.json::<serde_json::Value>().await.unwrap()["id"]
        .as_i64()
        .unwrap()
}

/// Creates the reference exam of the scoring scenario: three questions worth
/// 2, 3 and 2 marks (total 7, passing 4) with answer keys A, B, C.
async fn seed_scenario_exam(client: &reqwest::Client, address: &str) -> (i64, Vec<i64>) {
    let exam_id = create_exam(client, address, 30, 7, 4).await;
    let q1 = add_question(client, address, exam_id, "A", 2).await;
    let q2 = add_question(client, address, exam_id, "B", 3).await;
    let q3 = add_question(client, address, exam_id, "C", 2).await;
    (exam_id, vec![q1, q2, q3])
}

async fn create_exam(
    client: &reqwest::Client,
    address: &str,
    duration_minutes: i64,
    total_marks: i64,
    passing_marks: i64,
) -> i64 {
    let resp = client
        .post(format!("{}/api/exams", address))
        .json(&serde_json::json!({
            "title": "Sample Exam",
            "description": "integration test exam",
            "duration_minutes": duration_minutes,
            "total_marks": total_marks,
            "passing_marks": passing_marks
        }))
        .send()
        .await
        .expect("Failed to create exam");
    assert_eq!(resp.status().as_u16(), 201);
    resp.json::<serde_json::Value>().await.unwrap()["id"]
        .as_i64()
        .unwrap()
}

async fn add_question(
    client: &reqwest::Client,
    address: &str,
    exam_id: i64,
    correct: &str,
    marks: i64,
) -> i64 {
    let resp = client
        .post(format!("{}/api/exams/{}/questions", address, exam_id))
        .json(&serde_json::json!({
            "question_text": "Pick the right option",
            "option_a": "first",
            "option_b": "second",
            "option_c": "third",
            "option_d": "fourth",
            "correct_option": correct,
            "marks": marks
        }))
        .send()
        .await
        .expect("Failed to create question");
    assert_eq!(resp.status().as_u16(), 201);
    resp.json::<serde_json::Value>().await.unwrap()["id"]
        .as_i64()
        .unwrap()
}

async fn start_attempt(
    client: &reqwest::Client,
    address: &str,
    exam_id: i64,
    student_id: i64,
) -> i64 {
    let resp = client
        .post(format!("{}/api/exams/{}/attempts", address, exam_id))
        .json(&serde_json::json!({ "student_id": student_id }))
        .send()
        .await
        .expect("Failed to start attempt");
    assert_eq!(resp.status().as_u16(), 200);
    resp.json::<serde_json::Value>().await.unwrap()["id"]
        .as_i64()
        .unwrap()
}

async fn submit_answer(
    client: &reqwest::Client,
    address: &str,
    attempt_id: i64,
    question_id: i64,
    selected: Option<&str>,
) -> reqwest::Response {
    client
        .post(format!("{}/api/attempts/{}/answers", address, attempt_id))
        .json(&serde_json::json!({
            "question_id": question_id,
            "selected_option": selected
        }))
        .send()
        .await
        .expect("Failed to submit answer")
}

#[tokio::test]
async fn start_fails_for_unknown_student_or_exam() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/exams/9999/attempts", address))
        .json(&serde_json::json!({ "student_id": 9999 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let student_id = register_student(&client, &address).await;
    let resp = client
        .post(format!("{}/api/exams/9999/attempts", address))
        .json(&serde_json::json!({ "student_id": student_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn start_fails_for_inactive_exam() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let student_id = register_student(&client, &address).await;
    let (exam_id, _) = seed_scenario_exam(&client, &address).await;

    sqlx::query("UPDATE exams SET is_active = 0 WHERE id = ?")
        .bind(exam_id)
        .execute(&pool)
        .await
        .unwrap();

    let resp = client
        .post(format!("{}/api/exams/{}/attempts", address, exam_id))
        .json(&serde_json::json!({ "student_id": student_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn start_is_idempotent_while_in_progress() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let student_id = register_student(&client, &address).await;
    let (exam_id, _) = seed_scenario_exam(&client, &address).await;

    let first = start_attempt(&client, &address, exam_id, student_id).await;
    let second = start_attempt(&client, &address, exam_id, student_id).await;

    assert_eq!(first, second, "Repeated start must resume the open attempt");
}

#[tokio::test]
async fn answer_upsert_is_idempotent_and_last_write_wins() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let student_id = register_student(&client, &address).await;
    let (exam_id, questions) = seed_scenario_exam(&client, &address).await;
    let attempt_id = start_attempt(&client, &address, exam_id, student_id).await;

    // Same option twice: still a single row.
    let resp = submit_answer(&client, &address, attempt_id, questions[0], Some("B")).await;
    assert_eq!(resp.status().as_u16(), 200);
    let resp = submit_answer(&client, &address, attempt_id, questions[0], Some("B")).await;
    assert_eq!(resp.status().as_u16(), 200);

    // Overwrite with the correct option; is_correct is recomputed.
    let resp = submit_answer(&client, &address, attempt_id, questions[0], Some("A")).await;
    assert_eq!(resp.status().as_u16(), 200);
    let record: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(record["selected_option"], "A");
    assert_eq!(record["is_correct"], true);

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM answers WHERE attempt_id = ? AND question_id = ?",
    )
    .bind(attempt_id)
    .bind(questions[0])
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn concurrent_answers_for_one_question_leave_one_row() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let student_id = register_student(&client, &address).await;
    let (exam_id, questions) = seed_scenario_exam(&client, &address).await;
    let attempt_id = start_attempt(&client, &address, exam_id, student_id).await;

    let (r1, r2) = tokio::join!(
        submit_answer(&client, &address, attempt_id, questions[0], Some("A")),
        submit_answer(&client, &address, attempt_id, questions[0], Some("C")),
    );
    assert_eq!(r1.status().as_u16(), 200);
    assert_eq!(r2.status().as_u16(), 200);

    let rows: Vec<(Option<String>,)> =
        sqlx::query_as("SELECT selected_option FROM answers WHERE attempt_id = ?")
            .bind(attempt_id)
            .fetch_all(&pool)
            .await
            .unwrap();
    assert_eq!(rows.len(), 1, "Racing upserts must not duplicate the row");
    let selected = rows[0].0.as_deref().unwrap();
    assert!(selected == "A" || selected == "C");
}

#[tokio::test]
async fn answer_rejects_bad_input() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let student_id = register_student(&client, &address).await;
    let (exam_id, questions) = seed_scenario_exam(&client, &address).await;
    let attempt_id = start_attempt(&client, &address, exam_id, student_id).await;

    // Malformed option letter
    let resp = submit_answer(&client, &address, attempt_id, questions[0], Some("E")).await;
    assert_eq!(resp.status().as_u16(), 400);

    // Question belonging to a different exam
    let other_exam = create_exam(&client, &address, 30, 5, 3).await;
    let foreign_question = add_question(&client, &address, other_exam, "A", 5).await;
    let resp = submit_answer(&client, &address, attempt_id, foreign_question, Some("A")).await;
    assert_eq!(resp.status().as_u16(), 404);

    // Unknown attempt
    let resp = submit_answer(&client, &address, 9999, questions[0], Some("A")).await;
    assert_eq!(resp.status().as_u16(), 404);

    // Skipping is allowed and recorded as incorrect
    let resp = submit_answer(&client, &address, attempt_id, questions[1], None).await;
    assert_eq!(resp.status().as_u16(), 200);
    let record: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(record["selected_option"], serde_json::Value::Null);
    assert_eq!(record["is_correct"], false);
}

#[tokio::test]
async fn scoring_scenario_two_of_three_correct_passes() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let student_id = register_student(&client, &address).await;
    let (exam_id, questions) = seed_scenario_exam(&client, &address).await;
    let attempt_id = start_attempt(&client, &address, exam_id, student_id).await;

    // Correct, wrong, correct: 2 + 0 + 2 = 4 of 7, passing at 4.
    submit_answer(&client, &address, attempt_id, questions[0], Some("A")).await;
    submit_answer(&client, &address, attempt_id, questions[1], Some("A")).await;
    submit_answer(&client, &address, attempt_id, questions[2], Some("C")).await;

    let resp = client
        .post(format!("{}/api/attempts/{}/submit", address, attempt_id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let attempt: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(attempt["status"], "COMPLETED");
    assert_eq!(attempt["obtained_marks"], 4);
    assert!(attempt["end_time"].is_string());

    let results: serde_json::Value = client
        .get(format!("{}/api/students/{}/results", address, student_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(results["total_results"], 1);
    assert_eq!(results["passed_exams"], 1);
    assert_eq!(results["results"][0]["passed"], true);
    assert_eq!(results["results"][0]["obtained_marks"], 4);
}

#[tokio::test]
async fn submit_with_no_answers_scores_zero_and_fails() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let student_id = register_student(&client, &address).await;
    let (exam_id, _) = seed_scenario_exam(&client, &address).await;
    let attempt_id = start_attempt(&client, &address, exam_id, student_id).await;

    let attempt: serde_json::Value = client
        .post(format!("{}/api/attempts/{}/submit", address, attempt_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(attempt["obtained_marks"], 0);

    let results: serde_json::Value = client
        .get(format!("{}/api/students/{}/results", address, student_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(results["results"][0]["passed"], false);
}

#[tokio::test]
async fn all_correct_scores_exam_total() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let student_id = register_student(&client, &address).await;
    let (exam_id, questions) = seed_scenario_exam(&client, &address).await;
    let attempt_id = start_attempt(&client, &address, exam_id, student_id).await;

    submit_answer(&client, &address, attempt_id, questions[0], Some("A")).await;
    submit_answer(&client, &address, attempt_id, questions[1], Some("B")).await;
    submit_answer(&client, &address, attempt_id, questions[2], Some("C")).await;

    let attempt: serde_json::Value = client
        .post(format!("{}/api/attempts/{}/submit", address, attempt_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(attempt["obtained_marks"], 7);
}

#[tokio::test]
async fn closed_attempt_rejects_submit_and_answers() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let student_id = register_student(&client, &address).await;
    let (exam_id, questions) = seed_scenario_exam(&client, &address).await;
    let attempt_id = start_attempt(&client, &address, exam_id, student_id).await;

    submit_answer(&client, &address, attempt_id, questions[0], Some("A")).await;

    let resp = client
        .post(format!("{}/api/attempts/{}/submit", address, attempt_id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    // Second submit must not re-score.
    let resp = client
        .post(format!("{}/api/attempts/{}/submit", address, attempt_id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);

    // Late answer against a closed attempt is rejected.
    let resp = submit_answer(&client, &address, attempt_id, questions[1], Some("B")).await;
    assert_eq!(resp.status().as_u16(), 409);

    // Marks unchanged.
    let body: serde_json::Value = client
        .get(format!("{}/api/attempts/{}", address, attempt_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["attempt"]["obtained_marks"], 2);
    assert_eq!(body["attempt"]["status"], "COMPLETED");
}

#[tokio::test]
async fn retakes_allowed_with_history_by_default() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let student_id = register_student(&client, &address).await;
    let (exam_id, _) = seed_scenario_exam(&client, &address).await;

    let first = start_attempt(&client, &address, exam_id, student_id).await;
    client
        .post(format!("{}/api/attempts/{}/submit", address, first))
        .send()
        .await
        .unwrap();

    let second = start_attempt(&client, &address, exam_id, student_id).await;
    assert_ne!(first, second, "Terminal attempt stays as history");
}

#[tokio::test]
async fn single_retake_policy_blocks_second_attempt() {
    let (address, _pool) = spawn_app_with_policy(RetakePolicy::Single).await;
    let client = reqwest::Client::new();

    let student_id = register_student(&client, &address).await;
    let (exam_id, _) = seed_scenario_exam(&client, &address).await;

    let first = start_attempt(&client, &address, exam_id, student_id).await;

    // Resuming the open attempt is still fine under the single policy.
    let resumed = start_attempt(&client, &address, exam_id, student_id).await;
    assert_eq!(first, resumed);

    client
        .post(format!("{}/api/attempts/{}/submit", address, first))
        .send()
        .await
        .unwrap();

    let resp = client
        .post(format!("{}/api/exams/{}/attempts", address, exam_id))
        .json(&serde_json::json!({ "student_id": student_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);
}

#[tokio::test]
async fn overdue_attempt_expires_and_rejects_writes() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let student_id = register_student(&client, &address).await;
    let (exam_id, questions) = seed_scenario_exam(&client, &address).await;
    let attempt_id = start_attempt(&client, &address, exam_id, student_id).await;

    submit_answer(&client, &address, attempt_id, questions[0], Some("A")).await;

    // Backdate the start past the 30 minute limit.
    let backdated = chrono::Utc::now() - chrono::Duration::minutes(45);
    sqlx::query("UPDATE attempts SET start_time = ? WHERE id = ?")
        .bind(backdated)
        .bind(attempt_id)
        .execute(&pool)
        .await
        .unwrap();

    let resp = submit_answer(&client, &address, attempt_id, questions[1], Some("B")).await;
    assert_eq!(resp.status().as_u16(), 409);

    // The expired attempt keeps the marks it earned before the cutoff.
    let body: serde_json::Value = client
        .get(format!("{}/api/attempts/{}", address, attempt_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["attempt"]["status"], "EXPIRED");
    assert_eq!(body["attempt"]["obtained_marks"], 2);
    assert!(body["attempt"]["end_time"].is_string());

    // Submit after expiry is rejected too.
    let resp = client
        .post(format!("{}/api/attempts/{}/submit", address, attempt_id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);
}

#[tokio::test]
async fn sweep_expires_untouched_overdue_attempts() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let student_id = register_student(&client, &address).await;
    let (exam_id, _) = seed_scenario_exam(&client, &address).await;
    let attempt_id = start_attempt(&client, &address, exam_id, student_id).await;

    let backdated = chrono::Utc::now() - chrono::Duration::minutes(45);
    sqlx::query("UPDATE attempts SET start_time = ? WHERE id = ?")
        .bind(backdated)
        .bind(attempt_id)
        .execute(&pool)
        .await
        .unwrap();

    let expired = exam_portal::engine::expiry::sweep(&pool).await.unwrap();
    assert_eq!(expired, 1);

    let status: String = sqlx::query_scalar("SELECT status FROM attempts WHERE id = ?")
        .bind(attempt_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(status, "EXPIRED");

    // Idempotent: nothing left to expire.
    let expired = exam_portal::engine::expiry::sweep(&pool).await.unwrap();
    assert_eq!(expired, 0);
}
