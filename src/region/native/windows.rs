//! `LockFileEx` / `UnlockFileEx` byte-range locks.
//!
//! Windows keeps every lock taken through a handle as its own entry, so an
//! unlock must name exactly the offset and length that were locked.

use super::NativeLock;
use crate::error::{LockError, LockResult};
use crate::region::{LockMode, Region, WaitMode};
use std::fs::File;
use std::io;
use std::os::windows::io::AsRawHandle;
use windows_sys::Win32::Foundation::{
    ERROR_LOCK_VIOLATION, ERROR_NOT_LOCKED, ERROR_OPERATION_ABORTED, HANDLE,
};
use windows_sys::Win32::Storage::FileSystem::{
    LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, LockFileEx as lock_file_ex, UnlockFileEx,
};
use windows_sys::Win32::System::IO::OVERLAPPED;

#[derive(Debug, Clone, Copy, Default)]
pub struct LockFileEx;

impl NativeLock for LockFileEx {
    const COALESCES_RANGES: bool = false;

    fn lock(&self, file: &File, region: Region, mode: LockMode, wait: WaitMode) -> LockResult<()> {
        let mut flags = 0;
        if mode == LockMode::Exclusive {
            flags |= LOCKFILE_EXCLUSIVE_LOCK;
        }
        if wait == WaitMode::FailImmediately {
            flags |= LOCKFILE_FAIL_IMMEDIATELY;
        }

        let handle = file.as_raw_handle() as HANDLE;
        let mut overlapped = overlapped_at(region.offset);
        let (len_low, len_high) = split(region.length);
        let rc = unsafe { lock_file_ex(handle, flags, 0, len_low, len_high, &mut overlapped) };
        if rc == 0 {
            Err(translate(io::Error::last_os_error()))
        } else {
            Ok(())
        }
    }

    fn unlock(&self, file: &File, region: Region) -> LockResult<()> {
        let handle = file.as_raw_handle() as HANDLE;
        let mut overlapped = overlapped_at(region.offset);
        let (len_low, len_high) = split(region.length);
        let rc = unsafe { UnlockFileEx(handle, 0, len_low, len_high, &mut overlapped) };
        if rc == 0 {
            Err(translate(io::Error::last_os_error()))
        } else {
            Ok(())
        }
    }
}

fn overlapped_at(offset: u64) -> OVERLAPPED {
    let mut overlapped: OVERLAPPED = unsafe { std::mem::zeroed() };
    let (low, high) = split(offset);
    overlapped.Anonymous.Anonymous.Offset = low;
    overlapped.Anonymous.Anonymous.OffsetHigh = high;
    overlapped
}

fn split(value: u64) -> (u32, u32) {
    (value as u32, (value >> 32) as u32)
}

fn translate(err: io::Error) -> LockError {
    match err.raw_os_error().map(|code| code as u32) {
        Some(ERROR_LOCK_VIOLATION) => LockError::WouldBlock,
        Some(ERROR_NOT_LOCKED) => LockError::InvalidGrant,
        Some(ERROR_OPERATION_ABORTED) => LockError::Cancelled,
        _ => LockError::IoFailure(err),
    }
}
