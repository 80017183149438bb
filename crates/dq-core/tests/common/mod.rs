//! Shared fixtures: stores rooted in a temp dir.

#![allow(dead_code)]

use std::path::Path;

use dq_core::audit::AuditLog;
use dq_core::queue::QueueStore;
use dq_core::retry::RetryLedger;
use dq_core::state::StateStore;

pub fn queue(dir: &Path) -> QueueStore {
    QueueStore::new(dir.join("queue"))
}

pub fn state(dir: &Path) -> StateStore {
    StateStore::new(dir.join("state.json"))
}

pub fn ledger(dir: &Path, max_retries: u32) -> RetryLedger {
    RetryLedger::new(
        state(dir),
        AuditLog::new(dir.join("failed.log")),
        AuditLog::new(dir.join("completed.log")),
        max_retries,
    )
}

/// Lines of a terminal log, empty if the file was never written.
pub fn read_log(dir: &Path, name: &str) -> Vec<String> {
    std::fs::read_to_string(dir.join(name))
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}
