//! System-wide single-instance lock backed by a named mutex.
use once_cell::sync::Lazy;
use std::ptr;
use std::sync::Mutex;
use widestring::U16CString;
use winapi::shared::winerror::ERROR_ALREADY_EXISTS;
use winapi::um::errhandlingapi::GetLastError;
use winapi::um::handleapi::CloseHandle;
use winapi::um::synchapi::{CreateMutexW, ReleaseMutex};
use winapi::um::winnt::HANDLE;

use crate::error::StartupError;

pub const INSTANCE_MUTEX_NAME: &str = "SpotifyTaskbarFix-{150F0728-6840-4C9D-B2EE-DE289EAFE29F}";

/// Held for the whole process lifetime; releasing it lets another
/// instance start.
#[derive(Debug)]
pub struct InstanceGuard {
    // Raw handle value so the guard can move into the termination handler.
    handle: isize,
}

impl InstanceGuard {
    pub fn acquire(name: &str) -> Result<Self, StartupError> {
        let wide = U16CString::from_str(name).map_err(|e| StartupError::InstanceLock {
            reason: e.to_string(),
        })?;
        let handle = unsafe { CreateMutexW(ptr::null_mut(), 1, wide.as_ptr()) };
        let last_error = unsafe { GetLastError() };
        if handle.is_null() {
            return Err(StartupError::InstanceLock {
                reason: std::io::Error::from_raw_os_error(last_error as i32).to_string(),
            });
        }
        let guard = Self {
            handle: handle as isize,
        };
        if last_error == ERROR_ALREADY_EXISTS {
            return Err(StartupError::AlreadyRunning);
        }
        Ok(guard)
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        let handle = self.handle as HANDLE;
        unsafe {
            ReleaseMutex(handle);
            CloseHandle(handle);
        }
    }
}

static INSTANCE: Lazy<Mutex<Option<InstanceGuard>>> = Lazy::new(|| Mutex::new(None));

/// Park the guard where [`release_instance`] can reach it from any thread.
pub fn hold_instance(guard: InstanceGuard) {
    if let Ok(mut slot) = INSTANCE.lock() {
        *slot = Some(guard);
    }
}

/// Release the parked guard, if any. Safe to call more than once.
pub fn release_instance() {
    let guard = match INSTANCE.try_lock() {
        Ok(mut slot) => slot.take(),
        Err(std::sync::TryLockError::Poisoned(poisoned)) => poisoned.into_inner().take(),
        Err(std::sync::TryLockError::WouldBlock) => None,
    };
    drop(guard);
}
