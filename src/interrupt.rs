//! Ctrl-C handling for the hold loop.
//!
//! The handler only records that an interrupt arrived; the holder notices it
//! between sleep slices and releases its lock through the normal path. On
//! Unix the handler is installed without `SA_RESTART`, so a blocking lock
//! wait interrupted by Ctrl-C returns `LockError::Cancelled`.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Route Ctrl-C (and SIGTERM on Unix) to the interrupt flag.
pub fn install() -> io::Result<()> {
    install_handler()
}

pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

#[cfg(test)]
pub(crate) fn set(value: bool) {
    INTERRUPTED.store(value, Ordering::SeqCst);
}

/// Sleep for `total` in `slice`-sized steps.
///
/// Returns `false` as soon as an interrupt is seen, `true` if the full
/// duration elapsed.
pub fn sleep_unless_interrupted(total: Duration, slice: Duration) -> bool {
    let deadline = Instant::now() + total;
    loop {
        if interrupted() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep(slice.min(deadline - now));
    }
}

#[cfg(unix)]
extern "C" fn on_signal(_signal: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

#[cfg(unix)]
fn install_handler() -> io::Result<()> {
    let handler: extern "C" fn(libc::c_int) = on_signal;
    for signal in [libc::SIGINT, libc::SIGTERM] {
        let rc = unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = handler as libc::sighandler_t;
            libc::sigemptyset(&mut action.sa_mask);
            libc::sigaction(signal, &action, std::ptr::null_mut())
        };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(windows)]
unsafe extern "system" fn on_console_ctrl(_ctrl_type: u32) -> windows_sys::Win32::Foundation::BOOL {
    INTERRUPTED.store(true, Ordering::SeqCst);
    1
}

#[cfg(windows)]
fn install_handler() -> io::Result<()> {
    use windows_sys::Win32::System::Console::SetConsoleCtrlHandler;

    let rc = unsafe { SetConsoleCtrlHandler(Some(on_console_ctrl), 1) };
    if rc == 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}
