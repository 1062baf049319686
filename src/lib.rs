//! Watches for Spotify.exe starts and, once the new main window is fully
//! up, collapses and restores it once so the taskbar thumbnail is rebuilt.
//!
//! The fix sequence ([`fixer`]) and the window lookup ([`locator`]) run
//! against the [`window::Desktop`] trait; `hwnd::Win32Desktop` is the real
//! implementation on Windows.

pub mod bridge;
pub mod cli;
pub mod error;
pub mod fixer;
pub mod locator;
pub mod logging;
pub mod ps;
pub mod window;

#[cfg(windows)]
pub mod console;
#[cfg(windows)]
pub mod etw;
#[cfg(windows)]
pub mod hwnd;
#[cfg(windows)]
pub mod instance;

#[cfg(test)]
mod sim;

pub use bridge::{ProcessStartEvent, ProcessStartSink, ProcessStartSource, sink_channel};
pub use error::{DesktopError, StartupError};
pub use fixer::{FixOutcome, FixReport, FixTimings, TaskbarFixer, run_worker};
pub use locator::{TargetProfile, locate};
pub use window::{
    Clock, Desktop, DiscoveryResult, SystemClock, WindowGeometry, WindowHandle, WindowInspector,
    WindowStyleFlags,
};

/// Exit code used when a termination signal stops the process (SIGINT).
pub const SIGNAL_EXIT_CODE: i32 = 2;
