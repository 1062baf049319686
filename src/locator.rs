//! Finds the main window of a process by walking its threads and their
//! window trees.

use serde::Serialize;
use tracing::{debug, trace};

use crate::window::{Desktop, DiscoveryResult, ProcessId, WindowHandle};

/// Class and title markers identifying the target application's windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetProfile {
    /// Executable name reported by process-start events.
    pub process_name: String,
    /// Class of the top-level UI surface (needs a non-empty title).
    pub root_class: String,
    /// Class of the descendant that hosts rendered content.
    pub render_class: String,
    /// Hidden helper window older builds create only in the main process.
    pub legacy_marker_class: String,
    pub legacy_marker_title: String,
}

impl TargetProfile {
    pub fn spotify() -> Self {
        Self {
            process_name: "Spotify.exe".to_string(),
            root_class: "Chrome_WidgetWin_0".to_string(),
            render_class: "Chrome_RenderWidgetHostHWND".to_string(),
            legacy_marker_class: "GDI+ Hook Window Class".to_string(),
            legacy_marker_title: "G".to_string(),
        }
    }

    pub fn is_root_surface(&self, class_name: &str, title: &str) -> bool {
        class_name.eq_ignore_ascii_case(&self.root_class) && !title.is_empty()
    }

    pub fn is_render_surface(&self, class_name: &str) -> bool {
        class_name.eq_ignore_ascii_case(&self.render_class)
    }

    pub fn is_legacy_marker(&self, class_name: &str, title: &str) -> bool {
        class_name.eq_ignore_ascii_case(&self.legacy_marker_class)
            && title == self.legacy_marker_title
    }
}

impl Default for TargetProfile {
    fn default() -> Self {
        Self::spotify()
    }
}

/// Walk every thread of `pid` looking for the outer window and its render
/// surface.
///
/// The first outer window (in thread enumeration order) that already has
/// a render surface wins and stops the walk. An outer window without one
/// still marks the process as the main process. A failed thread snapshot
/// reads as "nothing found yet".
pub fn locate<D: Desktop + ?Sized>(
    desktop: &D,
    pid: ProcessId,
    profile: &TargetProfile,
) -> DiscoveryResult {
    let threads = match desktop.process_threads(pid) {
        Ok(threads) => threads,
        Err(e) => {
            debug!(pid, error = %e, "thread snapshot failed");
            return DiscoveryResult::not_found();
        }
    };

    let mut result = DiscoveryResult::not_found();
    for thread in threads {
        for hwnd in desktop.thread_windows(thread) {
            let class_name = desktop.class_name(hwnd);
            let title = desktop.title(hwnd);

            if profile.is_root_surface(&class_name, &title) {
                result.is_main_process = true;
                if let Some(inner) = find_render_surface(desktop, hwnd, profile) {
                    trace!(pid, thread, outer = %hwnd, inner = %inner, "render surface attached");
                    return DiscoveryResult {
                        outer: Some(hwnd),
                        inner: Some(inner),
                        is_main_process: true,
                    };
                }
                trace!(pid, thread, outer = %hwnd, "outer window without render surface");
            } else if profile.is_legacy_marker(&class_name, &title) {
                result.is_main_process = true;
            }
        }
    }
    result
}

fn find_render_surface<D: Desktop + ?Sized>(
    desktop: &D,
    outer: WindowHandle,
    profile: &TargetProfile,
) -> Option<WindowHandle> {
    desktop
        .descendant_windows(outer)
        .into_iter()
        .find(|child| profile.is_render_surface(&desktop.class_name(*child)))
}
