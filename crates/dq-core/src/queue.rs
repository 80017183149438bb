//! Durable queue of pending job keys.
//!
//! The queue is a newline-delimited text file: one key per line, blank lines
//! ignored, duplicates allowed. External processes may append to it directly;
//! every access here goes through an advisory lock so that `list` never sees
//! a half-rewritten file and concurrent `add`/`run` invocations cannot lose
//! updates.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::StoreError;
use crate::lock::Locked;
use crate::select;

/// Ordered, duplicate-tolerant list of job keys backed by a locked file.
pub struct QueueStore {
    path: PathBuf,
}

impl QueueStore {
    pub fn new(path: PathBuf) -> Self {
        QueueStore { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the queue in order. A missing file is an empty queue.
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::unavailable(&self.path, e)),
        };
        let locked =
            Locked::shared(file).map_err(|e| StoreError::unavailable(&self.path, e))?;
        read_keys(&locked).map_err(|e| StoreError::unavailable(&self.path, e))
    }

    /// Append keys, one per line, creating the file and its parent directory
    /// if absent.
    pub fn append<I, S>(&self, keys: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.create_parent()?;
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| StoreError::unavailable(&self.path, e))?;
        let mut locked =
            Locked::exclusive(file).map_err(|e| StoreError::unavailable(&self.path, e))?;
        for key in keys {
            writeln!(&mut *locked, "{}", key.as_ref())
                .map_err(|e| StoreError::unavailable(&self.path, e))?;
        }
        Ok(())
    }

    /// Read the queue, find `key`'s first index, and (when `remove_all`)
    /// rewrite the file with every occurrence of `key` dropped — all under
    /// one exclusive lock. Returns the resulting sequence and the index the
    /// key occupied before removal, if it was present.
    pub fn compare_and_remove(
        &self,
        key: &str,
        remove_all: bool,
    ) -> Result<(Vec<String>, Option<usize>), StoreError> {
        let mut locked = self.open_exclusive()?;
        let keys = read_keys(&locked).map_err(|e| StoreError::unavailable(&self.path, e))?;
        let removed_index = keys.iter().position(|k| k == key);
        if remove_all && removed_index.is_some() {
            let remaining: Vec<String> = keys.iter().filter(|k| *k != key).cloned().collect();
            rewrite(&mut locked, &remaining)
                .map_err(|e| StoreError::unavailable(&self.path, e))?;
            Ok((remaining, removed_index))
        } else {
            Ok((keys, removed_index))
        }
    }

    /// Settle a finished attempt: run the rotation rule against the current
    /// file contents and persist any removal, all under one exclusive lock so
    /// selection cannot race another invocation's mutation. `remove` is true
    /// when the job left the queue for good (completed or permanently
    /// abandoned). Returns the key to attempt next, if any.
    pub fn resolve(&self, current: &str, remove: bool) -> Result<Option<String>, StoreError> {
        let mut locked = self.open_exclusive()?;
        let keys = read_keys(&locked).map_err(|e| StoreError::unavailable(&self.path, e))?;
        let (after, next) = select::select_next(&keys, current, remove);
        if after != keys {
            rewrite(&mut locked, &after).map_err(|e| StoreError::unavailable(&self.path, e))?;
        }
        Ok(next)
    }

    /// Last modification time of the backing file, used by the
    /// wait-for-work poll. `None` when the file does not exist yet.
    pub fn modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).ok()?.modified().ok()
    }

    fn open_exclusive(&self) -> Result<Locked, StoreError> {
        self.create_parent()?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| StoreError::unavailable(&self.path, e))?;
        Locked::exclusive(file).map_err(|e| StoreError::unavailable(&self.path, e))
    }

    fn create_parent(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::unavailable(&self.path, e))?;
        }
        Ok(())
    }
}

fn read_keys(file: &File) -> io::Result<Vec<String>> {
    let mut keys = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            keys.push(trimmed.to_string());
        }
    }
    Ok(keys)
}

fn rewrite(file: &mut File, keys: &[String]) -> io::Result<()> {
    file.seek(SeekFrom::Start(0))?;
    file.set_len(0)?;
    for key in keys {
        writeln!(file, "{}", key)?;
    }
    Ok(())
}
