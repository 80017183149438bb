//! Durable state record: retry counters and the active-job marker.
//!
//! The record is one small JSON document. All mutation goes through
//! [`StateStore::with_state`], a read-modify-write transaction under an
//! exclusive lock, so concurrent invocations cannot lose each other's
//! updates. A missing or corrupt record loads as the empty record — forward
//! progress beats strict validation here.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::lock::Locked;

/// The job currently being attempted, recorded for crash recovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveJob {
    pub key: String,
}

/// Persistent bookkeeping shared by every invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateRecord {
    /// Failure count per job key; present only while `1 <= count < max_retries`.
    #[serde(default)]
    pub tries: HashMap<String, u32>,
    /// At most one job recorded as in flight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<ActiveJob>,
}

/// Lockable key-value record backing retry counts and the active-job marker.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: PathBuf) -> Self {
        StateStore { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` against the current record and persist the result, all under
    /// one exclusive lock. The lock is released on every exit path; a panic
    /// inside `f` leaves the old record on disk but never a partial write.
    pub fn with_state<T>(&self, f: impl FnOnce(&mut StateRecord) -> T) -> Result<T, StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::unavailable(&self.path, e))?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| StoreError::unavailable(&self.path, e))?;
        let mut locked =
            Locked::exclusive(file).map_err(|e| StoreError::unavailable(&self.path, e))?;

        let mut raw = String::new();
        (&mut *locked)
            .read_to_string(&mut raw)
            .map_err(|e| StoreError::unavailable(&self.path, e))?;
        let mut record = parse_record(&raw, &self.path);

        let out = f(&mut record);

        let json = serde_json::to_vec(&record)
            .map_err(|e| StoreError::unavailable(&self.path, io::Error::other(e)))?;
        locked
            .seek(SeekFrom::Start(0))
            .and_then(|_| locked.set_len(0))
            .and_then(|_| locked.write_all(&json))
            .map_err(|e| StoreError::unavailable(&self.path, e))?;
        Ok(out)
    }
}

fn parse_record(raw: &str, path: &Path) -> StateRecord {
    if raw.trim().is_empty() {
        return StateRecord::default();
    }
    match serde_json::from_str(raw) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "malformed state record, starting empty");
            StateRecord::default()
        }
    }
}
