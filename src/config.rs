// src/config.rs

use dotenvy::dotenv;
use std::env;

/// What happens when a student starts an exam they already attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetakePolicy {
    /// Any prior attempt (terminal or not) blocks a new one.
    Single,
    /// Terminal attempts stay as history; a fresh attempt is created.
    MultiWithHistory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub rust_log: String,
    pub retake_policy: RetakePolicy,
    /// Interval of the background task that expires overdue attempts.
    pub expiry_sweep_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:exam_portal.db".to_string());

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let retake_policy = match env::var("RETAKE_POLICY").as_deref() {
            Ok("single") => RetakePolicy::Single,
            Ok("multi") | Err(_) => RetakePolicy::MultiWithHistory,
            Ok(other) => panic!("RETAKE_POLICY must be 'single' or 'multi', got '{}'", other),
        };

        let expiry_sweep_secs = env::var("EXPIRY_SWEEP_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        Self {
            database_url,
            rust_log,
            retake_policy,
            expiry_sweep_secs,
        }
    }
}
