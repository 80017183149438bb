//! Scoped advisory file locking for the queue, state, and audit stores.
//!
//! Readers take a shared lock, writers an exclusive lock; the lock is held
//! exactly as long as the [`Locked`] guard lives and is released on every
//! exit path (drop runs on return, `?`, and panic alike). Closing the
//! descriptor would release an advisory lock anyway; the explicit unlock in
//! `Drop` keeps the scope obvious.

use fs2::FileExt;
use std::fs::File;
use std::io;
use std::ops::{Deref, DerefMut};

/// A file handle holding an advisory lock until dropped.
pub struct Locked(File);

impl Locked {
    /// Acquire a shared (reader) lock, blocking until available.
    pub fn shared(file: File) -> io::Result<Locked> {
        file.lock_shared()?;
        Ok(Locked(file))
    }

    /// Acquire an exclusive (writer) lock, blocking until available.
    pub fn exclusive(file: File) -> io::Result<Locked> {
        file.lock_exclusive()?;
        Ok(Locked(file))
    }
}

impl Deref for Locked {
    type Target = File;

    fn deref(&self) -> &File {
        &self.0
    }
}

impl DerefMut for Locked {
    fn deref_mut(&mut self) -> &mut File {
        &mut self.0
    }
}

impl Drop for Locked {
    fn drop(&mut self) {
        let _ = self.0.unlock();
    }
}
