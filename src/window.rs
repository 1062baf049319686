//! Window-level types and the seams the fixer runs against.
//!
//! Everything here is platform neutral. The Win32 implementation of
//! [`Desktop`] lives in [`crate::hwnd`]; tests use a scripted desktop.

use serde::Serialize;
use std::ops::BitOr;
use std::time::{Duration, Instant};

use crate::error::DesktopError;

pub type ProcessId = u32;
pub type ThreadId = u32;

/// Opaque window identifier. Never owned by us; may go stale at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct WindowHandle(pub isize);

impl std::fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

/// Origin and size of a window in its parent's coordinate space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WindowGeometry {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl WindowGeometry {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from an absolute rectangle and the same rectangle's top-left
    /// corner mapped into the parent's coordinate space.
    pub fn from_screen_rect(
        left: i32,
        top: i32,
        right: i32,
        bottom: i32,
        parent_origin: (i32, i32),
    ) -> Self {
        Self {
            x: parent_origin.0,
            y: parent_origin.1,
            width: right - left,
            height: bottom - top,
        }
    }

    /// Same origin, zero size.
    pub fn collapsed(&self) -> Self {
        Self {
            width: 0,
            height: 0,
            ..*self
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

impl std::fmt::Display for WindowGeometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} at ({}, {})", self.width, self.height, self.x, self.y)
    }
}

/// Raw window style bits as read from the window, uninterpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WindowStyleFlags(pub u32);

impl WindowStyleFlags {
    pub const NONE: Self = Self(0);
    /// `WS_VISIBLE`
    pub const VISIBLE: Self = Self(0x1000_0000);
    /// `WS_SYSMENU`
    pub const SYSMENU: Self = Self(0x0008_0000);
    /// `WS_CAPTION`
    pub const CAPTION: Self = Self(0x00C0_0000);

    pub fn contains(&self, flag: WindowStyleFlags) -> bool {
        has_flag(*self, flag)
    }
}

impl BitOr for WindowStyleFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// True when every bit of `flag` is set in `flags`.
pub fn has_flag(flags: WindowStyleFlags, flag: WindowStyleFlags) -> bool {
    flags.0 & flag.0 == flag.0
}

/// What one pass over a process's thread/window graph found.
///
/// Rebuilt wholesale on every lookup, never patched in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryResult {
    pub outer: Option<WindowHandle>,
    pub inner: Option<WindowHandle>,
    pub is_main_process: bool,
}

impl DiscoveryResult {
    pub fn not_found() -> Self {
        Self::default()
    }

    /// Both the top-level window and its render surface are known.
    pub fn windows(&self) -> Option<(WindowHandle, WindowHandle)> {
        match (self.outer, self.inner) {
            (Some(outer), Some(inner)) => Some((outer, inner)),
            _ => None,
        }
    }
}

/// Pure queries against a single window handle.
///
/// Implementations must never fail hard: a stale handle yields an empty
/// string, a zero geometry or empty flags.
pub trait WindowInspector {
    fn title(&self, hwnd: WindowHandle) -> String;
    fn class_name(&self, hwnd: WindowHandle) -> String;
    fn geometry(&self, hwnd: WindowHandle) -> WindowGeometry;
    fn style(&self, hwnd: WindowHandle) -> WindowStyleFlags;
    fn ex_style(&self, hwnd: WindowHandle) -> WindowStyleFlags;
}

/// Outcome of waiting for a freshly started process to go input-idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IdleWait {
    Idle,
    TimedOut,
    /// The process could not be opened or waited on (already gone, no
    /// access, console process).
    Unavailable,
}

/// Everything the fixer needs from the OS window manager.
pub trait Desktop: WindowInspector {
    /// Threads owned by `pid`, in the order the OS snapshot lists them.
    fn process_threads(&self, pid: ProcessId) -> Result<Vec<ThreadId>, DesktopError>;

    /// Top-level windows created by `thread`, in enumeration order.
    fn thread_windows(&self, thread: ThreadId) -> Vec<WindowHandle>;

    /// All descendants of `parent`, depth first.
    fn descendant_windows(&self, parent: WindowHandle) -> Vec<WindowHandle>;

    /// Move and resize `hwnd`, repainting it. Returns false if the window
    /// manager refused (usually a stale handle).
    fn move_window(&self, hwnd: WindowHandle, geometry: WindowGeometry) -> bool;

    fn wait_for_input_idle(&self, pid: ProcessId, timeout: Duration) -> IdleWait;
}

/// Time source for the polling loops.
pub trait Clock {
    /// Monotonic time since some fixed point.
    fn now(&self) -> Duration;
    fn sleep(&self, duration: Duration);
}

/// Wall-clock implementation that really blocks the calling thread.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_flag_requires_every_bit() {
        let flags = WindowStyleFlags::VISIBLE | WindowStyleFlags::CAPTION;
        assert!(has_flag(flags, WindowStyleFlags::VISIBLE));
        assert!(!has_flag(flags, WindowStyleFlags::SYSMENU));
        assert!(!has_flag(
            flags,
            WindowStyleFlags::VISIBLE | WindowStyleFlags::SYSMENU
        ));
        assert!(flags.contains(WindowStyleFlags::NONE));
    }

    #[test]
    fn geometry_from_screen_rect_keeps_size_and_uses_parent_origin() {
        let g = WindowGeometry::from_screen_rect(100, 50, 900, 650, (20, 10));
        assert_eq!(g, WindowGeometry::new(20, 10, 800, 600));
        assert_eq!(g.collapsed(), WindowGeometry::new(20, 10, 0, 0));
        assert!(g.collapsed().is_empty());
        assert!(!g.is_empty());
    }

    #[test]
    fn discovery_windows_needs_both_handles() {
        let mut result = DiscoveryResult {
            outer: Some(WindowHandle(1)),
            inner: None,
            is_main_process: true,
        };
        assert_eq!(result.windows(), None);
        result.inner = Some(WindowHandle(2));
        assert_eq!(result.windows(), Some((WindowHandle(1), WindowHandle(2))));
        assert_eq!(DiscoveryResult::not_found(), DiscoveryResult::default());
    }

    #[test]
    fn handle_displays_as_hex() {
        assert_eq!(WindowHandle(0x1A2B).to_string(), "0x00001A2B");
    }
}
