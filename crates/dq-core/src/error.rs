//! Storage error type shared by the queue, state, and audit stores.

use std::io;
use std::path::{Path, PathBuf};

/// The backing queue or state file could not be opened, locked, read, or
/// rewritten. Fatal to the run loop: once durable bookkeeping cannot be
/// guaranteed, continuing would risk silent loss of retry state.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage unavailable: {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    pub(crate) fn unavailable(path: &Path, source: io::Error) -> Self {
        StoreError::Unavailable {
            path: path.to_path_buf(),
            source,
        }
    }
}
