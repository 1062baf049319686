//! Process-level helpers: image-name matching and the input-idle wait.

/// File-name part of an image path. Handles both NT device paths
/// (`\Device\HarddiskVolume3\...\Spotify.exe`) and plain DOS paths.
pub fn image_file_name(image_path: &str) -> &str {
    image_path
        .rsplit(['\\', '/'])
        .next()
        .unwrap_or(image_path)
        .trim_matches('"')
}

pub fn matches_process_name(image_path: &str, process_name: &str) -> bool {
    image_file_name(image_path).eq_ignore_ascii_case(process_name)
}

#[cfg(windows)]
pub use win32::{ProcessHandle, wait_for_input_idle};

#[cfg(windows)]
mod win32 {
    use std::time::Duration;
    use tracing::trace;
    use winapi::um::handleapi::CloseHandle;
    use winapi::um::processthreadsapi::OpenProcess;
    use winapi::um::winnt::{HANDLE, PROCESS_QUERY_INFORMATION, SYNCHRONIZE};

    use crate::window::{IdleWait, ProcessId};

    unsafe extern "system" {
        fn WaitForInputIdle(hProcess: HANDLE, dwMilliseconds: u32) -> u32;
    }

    const WAIT_TIMEOUT: u32 = 258;

    /// Open process handle, closed on drop.
    pub struct ProcessHandle {
        handle: HANDLE,
    }

    impl ProcessHandle {
        pub fn open(pid: ProcessId) -> Option<Self> {
            let handle = unsafe { OpenProcess(PROCESS_QUERY_INFORMATION | SYNCHRONIZE, 0, pid) };
            if handle.is_null() {
                None
            } else {
                Some(Self { handle })
            }
        }

        pub fn raw(&self) -> HANDLE {
            self.handle
        }
    }

    impl Drop for ProcessHandle {
        fn drop(&mut self) {
            unsafe { CloseHandle(self.handle) };
        }
    }

    /// Block until `pid` is waiting for user input with no input pending,
    /// or `timeout` elapses.
    pub fn wait_for_input_idle(pid: ProcessId, timeout: Duration) -> IdleWait {
        let Some(process) = ProcessHandle::open(pid) else {
            trace!(pid, error = %std::io::Error::last_os_error(), "OpenProcess failed");
            return IdleWait::Unavailable;
        };
        let millis = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX - 1);
        match unsafe { WaitForInputIdle(process.raw(), millis) } {
            0 => IdleWait::Idle,
            WAIT_TIMEOUT => IdleWait::TimedOut,
            _ => IdleWait::Unavailable,
        }
    }
}
