//! Append-only terminal logs for completed and permanently failed jobs.
//!
//! Write-once-per-event audit trail; nothing reads these back for decision
//! making. Appends take the exclusive lock so interleaved invocations cannot
//! shear a line.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::lock::Locked;

/// One newline-delimited log file of job keys.
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: PathBuf) -> Self {
        AuditLog { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `key` as one line, creating the file and parent directory if
    /// absent.
    pub fn append(&self, key: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::unavailable(&self.path, e))?;
        }
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| StoreError::unavailable(&self.path, e))?;
        let mut locked =
            Locked::exclusive(file).map_err(|e| StoreError::unavailable(&self.path, e))?;
        writeln!(&mut *locked, "{}", key).map_err(|e| StoreError::unavailable(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_accumulate_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("completed.log"));
        log.append("a").unwrap();
        log.append("b").unwrap();
        assert_eq!(fs::read_to_string(log.path()).unwrap(), "a\nb\n");
    }
}
