//! RunLoop end to end with a scripted fetcher: draining, rotation,
//! abandonment, and crash recovery.

mod common;

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dq_core::fetch::{FetchOutcome, Fetcher};
use dq_core::runner::RunLoop;
use tempfile::tempdir;

/// Replays a fixed list of outcomes and requests cancellation once the
/// script runs out, so `run` returns instead of waiting for work.
struct ScriptedFetcher {
    script: Mutex<VecDeque<FetchOutcome>>,
    calls: Mutex<Vec<String>>,
    cancel: Arc<AtomicBool>,
}

impl ScriptedFetcher {
    fn new(outcomes: Vec<FetchOutcome>, cancel: Arc<AtomicBool>) -> Self {
        ScriptedFetcher {
            script: Mutex::new(outcomes.into()),
            calls: Mutex::new(Vec::new()),
            cancel,
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Fetcher for ScriptedFetcher {
    fn fetch(&self, key: &str) -> FetchOutcome {
        self.calls.lock().unwrap().push(key.to_string());
        let mut script = self.script.lock().unwrap();
        let outcome = script.pop_front().unwrap_or(FetchOutcome::OtherFailure);
        if script.is_empty() {
            self.cancel.store(true, Ordering::Relaxed);
        }
        outcome
    }
}

fn success() -> FetchOutcome {
    FetchOutcome::Success {
        path: PathBuf::from("/dev/null"),
    }
}

/// Run `f` with a thread-local subscriber capturing all log lines.
fn capture_logs(f: impl FnOnce()) -> String {
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Buf(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Buf {
        fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(data);
            Ok(data.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Buf {
        type Writer = Buf;
        fn make_writer(&'a self) -> Buf {
            self.clone()
        }
    }

    let buf = Buf::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(buf.clone())
        .with_ansi(false)
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    let bytes = buf.0.lock().unwrap().clone();
    String::from_utf8(bytes).unwrap()
}

fn run_loop(dir: &Path, max_retries: u32, cancel: Arc<AtomicBool>) -> RunLoop {
    RunLoop::new(
        common::queue(dir),
        common::ledger(dir, max_retries),
        Duration::from_secs(1),
        None,
        cancel,
    )
}

#[test]
fn successes_drain_the_queue_in_order() {
    let dir = tempdir().unwrap();
    let queue = common::queue(dir.path());
    queue.append(["a", "b"]).unwrap();

    let cancel = Arc::new(AtomicBool::new(false));
    let fetcher = ScriptedFetcher::new(vec![success(), success()], Arc::clone(&cancel));
    run_loop(dir.path(), 3, cancel).run(&fetcher).unwrap();

    assert_eq!(fetcher.calls(), vec!["a", "b"]);
    assert!(queue.list().unwrap().is_empty());
    assert_eq!(common::read_log(dir.path(), "completed.log"), vec!["a", "b"]);
    let marker = common::state(dir.path())
        .with_state(|rec| rec.current.clone())
        .unwrap();
    assert_eq!(marker, None);
}

#[test]
fn transient_failure_rotates_to_the_next_job() {
    let dir = tempdir().unwrap();
    let queue = common::queue(dir.path());
    queue.append(["a", "b"]).unwrap();

    let cancel = Arc::new(AtomicBool::new(false));
    let fetcher = ScriptedFetcher::new(
        vec![FetchOutcome::HttpFailure(7), success()],
        Arc::clone(&cancel),
    );
    run_loop(dir.path(), 3, cancel).run(&fetcher).unwrap();

    // a failed once and stays queued; b got its turn and completed.
    assert_eq!(fetcher.calls(), vec!["a", "b"]);
    assert_eq!(queue.list().unwrap(), vec!["a"]);
    assert_eq!(common::read_log(dir.path(), "completed.log"), vec!["b"]);
    let tries = common::state(dir.path())
        .with_state(|rec| rec.tries.get("a").copied())
        .unwrap();
    assert_eq!(tries, Some(1));
}

#[test]
fn exhausted_retry_budget_abandons_the_job() {
    let dir = tempdir().unwrap();
    let queue = common::queue(dir.path());
    queue.append(["a"]).unwrap();

    let cancel = Arc::new(AtomicBool::new(false));
    let fetcher = ScriptedFetcher::new(vec![FetchOutcome::HttpFailure(22)], Arc::clone(&cancel));
    run_loop(dir.path(), 1, cancel).run(&fetcher).unwrap();

    assert!(queue.list().unwrap().is_empty());
    assert_eq!(common::read_log(dir.path(), "failed.log"), vec!["a"]);
    let tries = common::state(dir.path())
        .with_state(|rec| rec.tries.get("a").copied())
        .unwrap();
    assert_eq!(tries, None);
}

#[test]
fn resume_unsupported_counts_as_a_transient_failure() {
    let dir = tempdir().unwrap();
    let queue = common::queue(dir.path());
    queue.append(["a"]).unwrap();

    let cancel = Arc::new(AtomicBool::new(false));
    let fetcher = ScriptedFetcher::new(vec![FetchOutcome::ResumeUnsupported], Arc::clone(&cancel));
    run_loop(dir.path(), 3, cancel).run(&fetcher).unwrap();

    assert_eq!(queue.list().unwrap(), vec!["a"]);
    let tries = common::state(dir.path())
        .with_state(|rec| rec.tries.get("a").copied())
        .unwrap();
    assert_eq!(tries, Some(1));
}

#[test]
fn interrupted_job_is_retried_before_the_head() {
    let dir = tempdir().unwrap();
    let queue = common::queue(dir.path());
    let ledger = common::ledger(dir.path(), 3);
    queue.append(["a", "b", "x"]).unwrap();
    // Simulate a crash mid-fetch of x: the marker survived, x is still queued.
    ledger.set_active(Some("x")).unwrap();

    let cancel = Arc::new(AtomicBool::new(false));
    let fetcher = ScriptedFetcher::new(vec![success()], Arc::clone(&cancel));
    run_loop(dir.path(), 3, cancel).run(&fetcher).unwrap();

    assert_eq!(fetcher.calls(), vec!["x"]);
    assert_eq!(queue.list().unwrap(), vec!["a", "b"]);
    assert_eq!(common::read_log(dir.path(), "completed.log"), vec!["x"]);
}

#[test]
fn normal_progress_is_not_announced_as_recovery() {
    let dir = tempdir().unwrap();
    common::queue(dir.path()).append(["a", "b"]).unwrap();

    let cancel = Arc::new(AtomicBool::new(false));
    let fetcher = ScriptedFetcher::new(vec![success(), success()], Arc::clone(&cancel));
    let runner = run_loop(dir.path(), 3, cancel);
    let logs = capture_logs(|| runner.run(&fetcher).unwrap());

    // b was pre-recorded by this very process after a completed; that is
    // routine progress, not crash recovery.
    assert_eq!(fetcher.calls(), vec!["a", "b"]);
    assert!(
        !logs.contains("resuming interrupted job"),
        "routine iteration announced as recovery:\n{logs}"
    );
}

#[test]
fn recovery_of_a_foreign_marker_is_announced() {
    let dir = tempdir().unwrap();
    common::queue(dir.path()).append(["a", "x"]).unwrap();
    // Marker left behind by an earlier, interrupted process.
    common::ledger(dir.path(), 3).set_active(Some("x")).unwrap();

    let cancel = Arc::new(AtomicBool::new(false));
    let fetcher = ScriptedFetcher::new(vec![success()], Arc::clone(&cancel));
    let runner = run_loop(dir.path(), 3, cancel);
    let logs = capture_logs(|| runner.run(&fetcher).unwrap());

    assert_eq!(fetcher.calls(), vec!["x"]);
    assert_eq!(logs.matches("resuming interrupted job").count(), 1);
}

#[test]
fn cancellation_before_work_returns_immediately() {
    let dir = tempdir().unwrap();
    let cancel = Arc::new(AtomicBool::new(true));
    let fetcher = ScriptedFetcher::new(vec![], Arc::clone(&cancel));
    run_loop(dir.path(), 3, cancel).run(&fetcher).unwrap();
    assert!(fetcher.calls().is_empty());
}
