//! Win32 implementation of [`Desktop`].
use std::ffi::OsString;
use std::os::windows::ffi::OsStringExt;
use std::ptr;
use std::time::Duration;
use winapi::shared::minwindef::{BOOL, FALSE, LPARAM, TRUE};
use winapi::shared::windef::{HWND, POINT, RECT};
use winapi::um::errhandlingapi::GetLastError;
use winapi::um::handleapi::{CloseHandle, INVALID_HANDLE_VALUE};
use winapi::um::tlhelp32::{
    CreateToolhelp32Snapshot, TH32CS_SNAPTHREAD, THREADENTRY32, Thread32First, Thread32Next,
};
use winapi::um::winnt::HANDLE;
use winapi::um::winuser::{
    EnumChildWindows, EnumThreadWindows, GWL_EXSTYLE, GWL_STYLE, GetClassNameW, GetParent,
    GetWindowLongW, GetWindowRect, GetWindowTextW, IsWindow, MapWindowPoints, MoveWindow,
};

use crate::error::DesktopError;
use crate::ps;
use crate::window::{
    Desktop, IdleWait, ProcessId, ThreadId, WindowGeometry, WindowHandle, WindowInspector,
    WindowStyleFlags,
};

fn raw(hwnd: WindowHandle) -> HWND {
    hwnd.0 as HWND
}

fn read_wide(buf: &[u16], len: i32) -> String {
    if len <= 0 {
        return String::new();
    }
    let len = (len as usize).min(buf.len());
    OsString::from_wide(&buf[..len])
        .to_string_lossy()
        .to_string()
}

/// Snapshot handle, closed on drop.
struct Snapshot(HANDLE);

impl Drop for Snapshot {
    fn drop(&mut self) {
        unsafe { CloseHandle(self.0) };
    }
}

unsafe extern "system" fn collect_hwnd(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let found = unsafe { &mut *(lparam as *mut Vec<WindowHandle>) };
    found.push(WindowHandle(hwnd as isize));
    TRUE
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Desktop;

impl Win32Desktop {
    pub fn new() -> Self {
        Self
    }
}

impl WindowInspector for Win32Desktop {
    fn title(&self, hwnd: WindowHandle) -> String {
        let mut buf = [0u16; 256];
        let len = unsafe { GetWindowTextW(raw(hwnd), buf.as_mut_ptr(), buf.len() as i32) };
        read_wide(&buf, len)
    }

    fn class_name(&self, hwnd: WindowHandle) -> String {
        let mut buf = [0u16; 256];
        let len = unsafe { GetClassNameW(raw(hwnd), buf.as_mut_ptr(), buf.len() as i32) };
        read_wide(&buf, len)
    }

    fn geometry(&self, hwnd: WindowHandle) -> WindowGeometry {
        let mut rect: RECT = unsafe { std::mem::zeroed() };
        if unsafe { GetWindowRect(raw(hwnd), &mut rect) } == 0 {
            return WindowGeometry::default();
        }
        // Map the top-left corner from screen space into the parent's client
        // space; a null parent means the desktop and leaves it unchanged.
        let mut origin = POINT {
            x: rect.left,
            y: rect.top,
        };
        unsafe {
            let parent = GetParent(raw(hwnd));
            MapWindowPoints(ptr::null_mut(), parent, &mut origin, 1);
        }
        WindowGeometry::from_screen_rect(
            rect.left,
            rect.top,
            rect.right,
            rect.bottom,
            (origin.x, origin.y),
        )
    }

    fn style(&self, hwnd: WindowHandle) -> WindowStyleFlags {
        WindowStyleFlags(unsafe { GetWindowLongW(raw(hwnd), GWL_STYLE) } as u32)
    }

    fn ex_style(&self, hwnd: WindowHandle) -> WindowStyleFlags {
        WindowStyleFlags(unsafe { GetWindowLongW(raw(hwnd), GWL_EXSTYLE) } as u32)
    }
}

impl Desktop for Win32Desktop {
    fn process_threads(&self, pid: ProcessId) -> Result<Vec<ThreadId>, DesktopError> {
        let snapshot = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPTHREAD, 0) };
        if snapshot == INVALID_HANDLE_VALUE || snapshot.is_null() {
            return Err(DesktopError::SnapshotUnavailable {
                code: unsafe { GetLastError() },
            });
        }
        let snapshot = Snapshot(snapshot);

        let mut entry: THREADENTRY32 = unsafe { std::mem::zeroed() };
        entry.dwSize = std::mem::size_of::<THREADENTRY32>() as u32;
        // Entries shorter than this do not carry an owner pid.
        let owner_end = std::mem::offset_of!(THREADENTRY32, th32OwnerProcessID)
            + std::mem::size_of::<u32>();

        let mut threads = Vec::new();
        if unsafe { Thread32First(snapshot.0, &mut entry) } == FALSE {
            return Err(DesktopError::SnapshotUnavailable {
                code: unsafe { GetLastError() },
            });
        }
        loop {
            if entry.dwSize as usize >= owner_end && entry.th32OwnerProcessID == pid {
                threads.push(entry.th32ThreadID);
            }
            entry.dwSize = std::mem::size_of::<THREADENTRY32>() as u32;
            if unsafe { Thread32Next(snapshot.0, &mut entry) } == FALSE {
                break;
            }
        }
        Ok(threads)
    }

    fn thread_windows(&self, thread: ThreadId) -> Vec<WindowHandle> {
        let mut found: Vec<WindowHandle> = Vec::new();
        unsafe {
            EnumThreadWindows(
                thread,
                Some(collect_hwnd),
                &mut found as *mut Vec<WindowHandle> as LPARAM,
            );
        }
        found
    }

    fn descendant_windows(&self, parent: WindowHandle) -> Vec<WindowHandle> {
        let mut found: Vec<WindowHandle> = Vec::new();
        if unsafe { IsWindow(raw(parent)) } == 0 {
            return found;
        }
        unsafe {
            EnumChildWindows(
                raw(parent),
                Some(collect_hwnd),
                &mut found as *mut Vec<WindowHandle> as LPARAM,
            );
        }
        found
    }

    fn move_window(&self, hwnd: WindowHandle, geometry: WindowGeometry) -> bool {
        unsafe {
            MoveWindow(
                raw(hwnd),
                geometry.x,
                geometry.y,
                geometry.width,
                geometry.height,
                TRUE,
            ) != 0
        }
    }

    fn wait_for_input_idle(&self, pid: ProcessId, timeout: Duration) -> IdleWait {
        ps::wait_for_input_idle(pid, timeout)
    }
}
