//! The run loop: one job in flight, crash-recoverable, cancellable.
//!
//! Per iteration: recover a previously recorded active job if one survives in
//! the queue, otherwise poll the queue file until non-empty and take the
//! head; mark it active; fetch; settle the outcome through the retry ledger
//! and the queue's rotation. No lock is held across the fetch, so `list` and
//! `add` stay responsive while a download runs.
//!
//! Fetch failures feed the retry ledger and never stop the loop. Storage
//! failures do stop it: without durable bookkeeping, continuing would lose
//! state silently.

use std::path::Path;
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::StoreError;
use crate::fetch::{FetchOutcome, Fetcher};
use crate::queue::QueueStore;
use crate::retry::RetryLedger;

/// Granularity of cancellation checks inside the wait-for-work sleep.
const POLL_TICK: Duration = Duration::from_millis(200);

pub struct RunLoop {
    queue: QueueStore,
    ledger: RetryLedger,
    poll_interval: Duration,
    on_complete: Option<String>,
    cancel: Arc<AtomicBool>,
}

impl RunLoop {
    pub fn new(
        queue: QueueStore,
        ledger: RetryLedger,
        poll_interval: Duration,
        on_complete: Option<String>,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        RunLoop {
            queue,
            ledger,
            poll_interval,
            on_complete,
            cancel,
        }
    }

    /// Process jobs until cancelled. Returns only on cancellation or a
    /// storage failure.
    pub fn run(&self, fetcher: &dyn Fetcher) -> Result<(), StoreError> {
        // The marker this process recorded in its previous iteration. A
        // recovered marker that doesn't match was left by an interrupted
        // earlier run and is worth announcing; our own is routine.
        let mut own_marker: Option<String> = None;
        while !self.cancelled() {
            let key = match self.ledger.get_active(&self.queue)? {
                Some(key) => {
                    if own_marker.as_deref() == Some(key.as_str()) {
                        tracing::debug!(key = %key, "continuing with recorded job");
                    } else {
                        tracing::info!(key = %key, "resuming interrupted job");
                    }
                    key
                }
                None => match self.wait_for_work()? {
                    Some(key) => key,
                    None => break,
                },
            };

            self.ledger.set_active(Some(&key))?;
            let outcome = fetcher.fetch(&key);

            let resolved = match &outcome {
                FetchOutcome::Success { path } => {
                    tracing::info!(key = %key, path = %path.display(), "download complete");
                    self.ledger.record_success(&key)?;
                    self.run_hook(&key, path);
                    true
                }
                // Transient unless the retry budget just ran out; a
                // permanently abandoned job leaves the queue like a
                // completed one.
                _ => {
                    tracing::warn!(key = %key, outcome = ?outcome, "fetch failed");
                    self.ledger.record_failure(&key)?
                }
            };

            match self.queue.resolve(&key, resolved)? {
                Some(next) => {
                    self.ledger.set_active(Some(&next))?;
                    own_marker = Some(next);
                }
                None => {
                    self.ledger.set_active(None)?;
                    own_marker = None;
                }
            }
        }
        tracing::info!("run loop stopped");
        Ok(())
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Block until the queue is non-empty or cancellation is requested.
    /// Sleeps between polls, waking early when the queue file's mtime
    /// changes (external processes may append to it directly).
    fn wait_for_work(&self) -> Result<Option<String>, StoreError> {
        let mut announced = false;
        loop {
            if self.cancelled() {
                return Ok(None);
            }
            if let Some(head) = self.queue.list()?.into_iter().next() {
                return Ok(Some(head));
            }
            if !announced {
                tracing::info!("queue empty, waiting for work");
                announced = true;
            }

            let seen = self.queue.modified();
            let deadline = Instant::now() + self.poll_interval;
            while Instant::now() < deadline {
                if self.cancelled() {
                    return Ok(None);
                }
                thread::sleep(POLL_TICK);
                if self.queue.modified() != seen {
                    break;
                }
            }
        }
    }

    /// Post-success hook, fire and forget: a hook failure is logged, never
    /// propagated.
    fn run_hook(&self, key: &str, path: &Path) {
        let Some(cmd) = &self.on_complete else {
            return;
        };
        tracing::debug!(key = %key, cmd = %cmd, "running completion hook");
        let status = Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .env("DQ_URL", key)
            .env("DQ_FILE", path)
            .status();
        match status {
            Ok(s) if s.success() => {}
            Ok(s) => tracing::warn!(key = %key, status = %s, "completion hook exited nonzero"),
            Err(e) => tracing::warn!(key = %key, error = %e, "could not run completion hook"),
        }
    }
}
