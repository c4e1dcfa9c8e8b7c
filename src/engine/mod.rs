// src/engine/mod.rs
//
// The attempt engine: lifecycle state machine, answer ledger upserts,
// scoring and deadline enforcement for a single student's run at an exam.

pub mod expiry;
pub mod lifecycle;
pub mod registry;
pub mod scoring;
