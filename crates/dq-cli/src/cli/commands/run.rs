//! `dq run` – process the queue until interrupted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dq_core::audit::AuditLog;
use dq_core::config::DqConfig;
use dq_core::fetch::CurlFetcher;
use dq_core::queue::QueueStore;
use dq_core::retry::RetryLedger;
use dq_core::runner::RunLoop;
use dq_core::state::StateStore;

pub async fn run_run(cfg: DqConfig) -> Result<()> {
    cfg.validate()?;

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, stopping after the current step");
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    let queue = QueueStore::new(cfg.queue.clone());
    let ledger = RetryLedger::new(
        StateStore::new(cfg.state.clone()),
        AuditLog::new(cfg.failed_log.clone()),
        AuditLog::new(cfg.completed_log.clone()),
        cfg.max_retries,
    );
    let fetcher = CurlFetcher::new(&cfg);
    let runner = RunLoop::new(
        queue,
        ledger,
        Duration::from_secs(cfg.poll_interval_secs),
        cfg.on_complete.clone(),
        Arc::clone(&cancel),
    );

    // The loop blocks on subprocesses and sleeps; keep it off the async runtime.
    tokio::task::spawn_blocking(move || runner.run(&fetcher))
        .await
        .context("run loop panicked")??;
    Ok(())
}
