use crate::error::{LockError, LockResult};
use crate::region::{LockMode, NativeLock, Region, WaitMode};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

/// A scratch directory holding an (initially empty) lock file.
pub(crate) fn scratch_lock_file() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("lock.txt");
    File::create(&path).unwrap();
    (temp_dir, path)
}

/// Open the lock file the way a holder does: readable, writable, appending.
pub(crate) fn open_rw(path: &Path) -> File {
    OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(path)
        .unwrap_or_else(|e| panic!("failed to open {}: {}", path.display(), e))
}

/// One call made against a [`RecordingLock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Call {
    Lock(Region, LockMode),
    Unlock(Region),
}

/// Coalescing backend that records calls instead of touching the kernel.
///
/// `fail_at` makes the n-th call (0-based) fail with `WouldBlock`.
#[derive(Debug, Default)]
pub(crate) struct RecordingLock {
    pub(crate) calls: Mutex<Vec<Call>>,
    pub(crate) fail_at: Option<usize>,
}

impl RecordingLock {
    pub(crate) fn failing_at(call: usize) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_at: Some(call),
        }
    }

    pub(crate) fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    fn record(&self, call: Call) -> LockResult<()> {
        let mut calls = self.calls.lock().unwrap();
        let index = calls.len();
        calls.push(call);
        if self.fail_at == Some(index) {
            Err(LockError::WouldBlock)
        } else {
            Ok(())
        }
    }
}

impl NativeLock for RecordingLock {
    const COALESCES_RANGES: bool = true;

    fn lock(&self, _file: &File, region: Region, mode: LockMode, _wait: WaitMode) -> LockResult<()> {
        self.record(Call::Lock(region, mode))
    }

    fn unlock(&self, _file: &File, region: Region) -> LockResult<()> {
        self.record(Call::Unlock(region))
    }
}
