//! `fcntl(2)` record locks.
//!
//! Linux uses open file description locks (`F_OFD_SETLK`), which belong to
//! the open file rather than the process. Elsewhere the classic process-owned
//! `F_SETLK` locks are used.

use super::NativeLock;
use crate::error::{LockError, LockResult};
use crate::region::{LockMode, Region, WaitMode};
use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;

#[cfg(target_os = "linux")]
const SET_LOCK: libc::c_int = libc::F_OFD_SETLK;
#[cfg(target_os = "linux")]
const SET_LOCK_WAIT: libc::c_int = libc::F_OFD_SETLKW;

#[cfg(not(target_os = "linux"))]
const SET_LOCK: libc::c_int = libc::F_SETLK;
#[cfg(not(target_os = "linux"))]
const SET_LOCK_WAIT: libc::c_int = libc::F_SETLKW;

#[derive(Debug, Clone, Copy, Default)]
pub struct Fcntl;

impl NativeLock for Fcntl {
    const COALESCES_RANGES: bool = true;

    fn lock(&self, file: &File, region: Region, mode: LockMode, wait: WaitMode) -> LockResult<()> {
        let lock_type = match mode {
            LockMode::Shared => libc::F_RDLCK as libc::c_int,
            LockMode::Exclusive => libc::F_WRLCK as libc::c_int,
        };
        let cmd = match wait {
            WaitMode::Block => SET_LOCK_WAIT,
            WaitMode::FailImmediately => SET_LOCK,
        };
        set_lock(file, region, lock_type, cmd).map_err(translate)
    }

    fn unlock(&self, file: &File, region: Region) -> LockResult<()> {
        set_lock(file, region, libc::F_UNLCK as libc::c_int, SET_LOCK).map_err(translate)
    }
}

fn set_lock(file: &File, region: Region, lock_type: libc::c_int, cmd: libc::c_int) -> io::Result<()> {
    // l_pid must be zero for OFD locks; zeroing also covers platform-specific fields.
    let mut flock: libc::flock = unsafe { std::mem::zeroed() };
    flock.l_type = lock_type as _;
    flock.l_whence = libc::SEEK_SET as _;
    flock.l_start = region.offset as libc::off_t;
    flock.l_len = region.length as libc::off_t;

    let rc = unsafe { libc::fcntl(file.as_raw_fd(), cmd, &mut flock) };
    if rc == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

fn translate(err: io::Error) -> LockError {
    match err.raw_os_error() {
        // POSIX allows either errno for a conflicting F_SETLK.
        Some(code) if code == libc::EAGAIN || code == libc::EACCES => LockError::WouldBlock,
        Some(libc::EINTR) => LockError::Cancelled,
        _ => LockError::IoFailure(err),
    }
}
