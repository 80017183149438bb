//! Retry accounting and active-job tracking over the state record.
//!
//! A job's failure counter lives in the state record only while it is in
//! `[1, max_retries)`; hitting the ceiling deletes it, appends the key to the
//! failed log, and reports the job permanently abandoned. Success deletes the
//! counter and appends to the completed log.

use crate::audit::AuditLog;
use crate::error::StoreError;
use crate::queue::QueueStore;
use crate::state::{ActiveJob, StateStore};

/// Durable retry counters, terminal logs, and the active-job marker.
pub struct RetryLedger {
    state: StateStore,
    failed_log: AuditLog,
    completed_log: AuditLog,
    max_retries: u32,
}

impl RetryLedger {
    /// `max_retries` is the abandonment threshold: 1 means any single
    /// failure is permanent.
    pub fn new(
        state: StateStore,
        failed_log: AuditLog,
        completed_log: AuditLog,
        max_retries: u32,
    ) -> Self {
        RetryLedger {
            state,
            failed_log,
            completed_log,
            max_retries,
        }
    }

    /// Count one failure for `key`. Returns true when the retry budget is
    /// exhausted and the job has been abandoned for good.
    ///
    /// The audit line is written before the counter deletion commits: a
    /// crash in between re-runs this branch on the next attempt instead of
    /// leaving an abandoned job with no trace. The log lock nests inside the
    /// state lock here; nothing acquires them in the other order.
    pub fn record_failure(&self, key: &str) -> Result<bool, StoreError> {
        let max = self.max_retries;
        self.state.with_state(|rec| {
            let count = rec.tries.entry(key.to_string()).or_insert(0);
            *count += 1;
            if *count < max {
                tracing::info!(key, tries = *count, max, "fetch failed, will retry");
                return Ok(false);
            }
            self.failed_log.append(key)?;
            rec.tries.remove(key);
            tracing::warn!(key, max, "retry budget exhausted, abandoning");
            Ok(true)
        })?
    }

    /// Clear any failure counter for `key` and log the completion. Same
    /// ordering as `record_failure`: the completed line lands before the
    /// counter deletion commits.
    pub fn record_success(&self, key: &str) -> Result<(), StoreError> {
        self.state.with_state(|rec| {
            self.completed_log.append(key)?;
            rec.tries.remove(key);
            Ok(())
        })?
    }

    /// Record or clear the active-job marker.
    pub fn set_active(&self, key: Option<&str>) -> Result<(), StoreError> {
        self.state.with_state(|rec| {
            rec.current = key.map(|k| ActiveJob { key: k.to_string() });
        })
    }

    /// The job to resume after a crash: the recorded marker, but only if that
    /// key is still queued. A marker pointing at a key no longer in the queue
    /// is stale (another invocation resolved it) and is cleared here.
    pub fn get_active(&self, queue: &QueueStore) -> Result<Option<String>, StoreError> {
        let snapshot = queue.list()?;
        self.state.with_state(|rec| match rec.current.take() {
            Some(active) if snapshot.contains(&active.key) => {
                let key = active.key.clone();
                rec.current = Some(active);
                Some(key)
            }
            _ => None,
        })
    }
}
