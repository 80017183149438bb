//! Logging setup: tracing to a file under the XDG state dir, with a stderr
//! fallback when that file cannot be opened.

use anyhow::Result;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,dq=debug"))
}

/// Clones the log file per event; writes to stderr if the clone fails.
struct LogFile(File);

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = Box<dyn Write>;

    fn make_writer(&'a self) -> Self::Writer {
        match self.0.try_clone() {
            Ok(f) => Box::new(f),
            Err(_) => Box::new(io::stderr()),
        }
    }
}

/// Initialize logging to `~/.local/state/dq/dq.log`. Returns Err when the
/// log file cannot be created so the caller can fall back to
/// [`init_logging_stderr`].
pub fn init_logging() -> Result<()> {
    let log_dir = xdg::BaseDirectories::with_prefix("dq")?.get_state_home();
    fs::create_dir_all(&log_dir)?;
    let path: PathBuf = log_dir.join("dq.log");
    let file = File::options().create(true).append(true).open(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(LogFile(file))
        .with_ansi(false)
        .init();

    tracing::debug!("logging to {}", path.display());
    Ok(())
}

/// Stderr-only logging, for when the state dir is unwritable.
pub fn init_logging_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}
