//! The per-notification fix sequence.
//!
//! `WaitingForIdle -> SearchingForProcess -> WaitingForWindows ->
//! WaitingForVisibility -> Resizing -> Done`. Any phase that runs out of
//! budget jumps straight to `Done` without touching the window.

use chrono::{DateTime, Local};
use crossbeam_channel::Receiver;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::bridge::ProcessStartEvent;
use crate::locator::{TargetProfile, locate};
use crate::window::{
    Clock, Desktop, DiscoveryResult, IdleWait, ProcessId, WindowGeometry, WindowHandle,
    WindowInspector, WindowStyleFlags, has_flag,
};

/// Waits and polling budgets for one fix attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixTimings {
    /// Upper bound on the input-idle wait.
    pub idle_timeout: Duration,
    /// Minimum time between the notification and the first window lookup.
    pub idle_floor: Duration,
    pub discovery_interval: Duration,
    pub discovery_budget: Duration,
    pub visibility_interval: Duration,
    pub visibility_budget: Duration,
    /// Pause between collapsing the window and restoring it.
    pub settle_delay: Duration,
}

impl Default for FixTimings {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_millis(5000),
            idle_floor: Duration::from_millis(500),
            discovery_interval: Duration::from_millis(250),
            discovery_budget: Duration::from_millis(5000),
            visibility_interval: Duration::from_millis(100),
            visibility_budget: Duration::from_millis(10000),
            settle_delay: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FixPhase {
    WaitingForIdle,
    SearchingForProcess,
    WaitingForWindows,
    WaitingForVisibility,
    Resizing,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FixOutcome {
    Resized {
        outer: WindowHandle,
        geometry: WindowGeometry,
    },
    /// Launcher stubs, crash reporters and renderer children land here.
    NotMainProcess,
    WindowsTimedOut,
    VisibilityTimedOut,
    /// The window vanished or refused the move.
    ResizeRejected { outer: WindowHandle },
}

impl FixOutcome {
    pub fn is_resized(&self) -> bool {
        matches!(self, FixOutcome::Resized { .. })
    }
}

/// State carried through one notification. Never shared across attempts.
#[derive(Debug, Clone)]
pub struct FixAttempt {
    pub pid: ProcessId,
    pub started_at: Duration,
    pub started_wall: DateTime<Local>,
    pub phase: FixPhase,
    pub idle: Option<IdleWait>,
    pub discovery: DiscoveryResult,
    pub discovery_retries: u32,
    pub visibility_polls: u32,
    pub captured: Option<WindowGeometry>,
}

/// Summary of a finished attempt, logged as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixReport {
    pub pid: ProcessId,
    pub outcome: FixOutcome,
    pub started_at: String,
    pub elapsed_ms: u64,
    pub idle: Option<IdleWait>,
    pub discovery_retries: u32,
    pub visibility_polls: u32,
}

/// Both windows are fully initialized: the render surface is visible and
/// the outer window is visible with its system menu attached.
pub fn visibility_ready<I: WindowInspector + ?Sized>(
    inspector: &I,
    outer: WindowHandle,
    inner: WindowHandle,
) -> bool {
    let inner_style = inspector.style(inner);
    let outer_style = inspector.style(outer);
    has_flag(inner_style, WindowStyleFlags::VISIBLE)
        && has_flag(
            outer_style,
            WindowStyleFlags::VISIBLE | WindowStyleFlags::SYSMENU,
        )
}

pub struct TaskbarFixer<D, C> {
    desktop: D,
    clock: C,
    profile: TargetProfile,
    timings: FixTimings,
}

impl<D: Desktop, C: Clock> TaskbarFixer<D, C> {
    pub fn new(desktop: D, clock: C, profile: TargetProfile, timings: FixTimings) -> Self {
        Self {
            desktop,
            clock,
            profile,
            timings,
        }
    }

    pub fn desktop(&self) -> &D {
        &self.desktop
    }

    pub fn profile(&self) -> &TargetProfile {
        &self.profile
    }

    /// Run one full fix attempt for a freshly started process. Blocks the
    /// calling thread through every wait.
    pub fn handle(&self, pid: ProcessId) -> FixReport {
        let mut attempt = FixAttempt {
            pid,
            started_at: self.clock.now(),
            started_wall: Local::now(),
            phase: FixPhase::WaitingForIdle,
            idle: None,
            discovery: DiscoveryResult::not_found(),
            discovery_retries: 0,
            visibility_polls: 0,
            captured: None,
        };

        let outcome = self.run(&mut attempt);
        self.enter(&mut attempt, FixPhase::Done);

        match outcome {
            FixOutcome::Resized { outer, geometry } => {
                info!(pid, outer = %outer, %geometry, "Window resized");
            }
            FixOutcome::NotMainProcess => {
                debug!(pid, "not the main process, ignoring");
            }
            FixOutcome::WindowsTimedOut => {
                warn!(
                    pid,
                    retries = attempt.discovery_retries,
                    "main window never appeared, giving up"
                );
            }
            FixOutcome::VisibilityTimedOut => {
                warn!(
                    pid,
                    polls = attempt.visibility_polls,
                    "main window never became visible, giving up"
                );
            }
            FixOutcome::ResizeRejected { outer } => {
                warn!(pid, outer = %outer, "window refused the resize");
            }
        }

        let report = FixReport {
            pid,
            outcome,
            started_at: attempt.started_wall.to_rfc3339(),
            elapsed_ms: self.elapsed_ms(&attempt),
            idle: attempt.idle,
            discovery_retries: attempt.discovery_retries,
            visibility_polls: attempt.visibility_polls,
        };
        if let Ok(json) = serde_json::to_string(&report) {
            debug!(report = %json, "fix attempt finished");
        }
        report
    }

    fn run(&self, attempt: &mut FixAttempt) -> FixOutcome {
        self.wait_for_idle(attempt);

        self.enter(attempt, FixPhase::SearchingForProcess);
        attempt.discovery = locate(&self.desktop, attempt.pid, &self.profile);
        if !attempt.discovery.is_main_process {
            return FixOutcome::NotMainProcess;
        }

        self.enter(attempt, FixPhase::WaitingForWindows);
        let Some((outer, inner)) = self.wait_for_windows(attempt) else {
            return FixOutcome::WindowsTimedOut;
        };
        let geometry = self.desktop.geometry(outer);
        attempt.captured = Some(geometry);
        info!(pid = attempt.pid, outer = %outer, inner = %inner, %geometry, "Window found");

        self.enter(attempt, FixPhase::WaitingForVisibility);
        if !self.wait_for_visibility(attempt, outer, inner) {
            return FixOutcome::VisibilityTimedOut;
        }

        // The app may apply its saved placement while still hidden, so take
        // the placement it has now; fall back to the first reading if the
        // window stopped answering.
        self.enter(attempt, FixPhase::Resizing);
        let current = self.desktop.geometry(outer);
        let geometry = if current.is_empty() { geometry } else { current };
        attempt.captured = Some(geometry);
        self.resize(outer, geometry)
    }

    fn enter(&self, attempt: &mut FixAttempt, phase: FixPhase) {
        attempt.phase = phase;
        debug!(
            pid = attempt.pid,
            ?phase,
            elapsed_ms = self.elapsed_ms(attempt),
            "phase"
        );
    }

    fn elapsed(&self, since: Duration) -> Duration {
        self.clock.now().saturating_sub(since)
    }

    fn elapsed_ms(&self, attempt: &FixAttempt) -> u64 {
        self.elapsed(attempt.started_at).as_millis() as u64
    }

    fn wait_for_idle(&self, attempt: &mut FixAttempt) {
        let idle = self
            .desktop
            .wait_for_input_idle(attempt.pid, self.timings.idle_timeout);
        attempt.idle = Some(idle);

        // Input-idle can fire before the window subsystem is usable.
        let waited = self.elapsed(attempt.started_at);
        if waited < self.timings.idle_floor {
            self.clock.sleep(self.timings.idle_floor - waited);
        }
        debug!(pid = attempt.pid, ?idle, waited_ms = waited.as_millis() as u64, "input idle");
    }

    fn wait_for_windows(&self, attempt: &mut FixAttempt) -> Option<(WindowHandle, WindowHandle)> {
        let phase_start = self.clock.now();
        loop {
            if let Some(windows) = attempt.discovery.windows() {
                return Some(windows);
            }
            if self.elapsed(phase_start) >= self.timings.discovery_budget {
                return None;
            }
            self.clock.sleep(self.timings.discovery_interval);
            attempt.discovery = locate(&self.desktop, attempt.pid, &self.profile);
            attempt.discovery_retries += 1;
        }
    }

    fn wait_for_visibility(
        &self,
        attempt: &mut FixAttempt,
        outer: WindowHandle,
        inner: WindowHandle,
    ) -> bool {
        let phase_start = self.clock.now();
        loop {
            attempt.visibility_polls += 1;
            if visibility_ready(&self.desktop, outer, inner) {
                return true;
            }
            if self.elapsed(phase_start) >= self.timings.visibility_budget {
                return false;
            }
            self.clock.sleep(self.timings.visibility_interval);
        }
    }

    /// Collapse the window to zero size at its origin, then put it back.
    /// The round trip makes the shell rebuild the taskbar thumbnail.
    fn resize(&self, outer: WindowHandle, original: WindowGeometry) -> FixOutcome {
        if original.is_empty() {
            return FixOutcome::ResizeRejected { outer };
        }
        if !self.desktop.move_window(outer, original.collapsed()) {
            return FixOutcome::ResizeRejected { outer };
        }
        if !self.timings.settle_delay.is_zero() {
            self.clock.sleep(self.timings.settle_delay);
        }
        if !self.desktop.move_window(outer, original) {
            return FixOutcome::ResizeRejected { outer };
        }
        FixOutcome::Resized {
            outer,
            geometry: original,
        }
    }
}

/// Handle notifications one at a time until every sink is gone.
///
/// Every delivered event gets its own attempt, even when the OS reuses a
/// pid. Returns the number of attempts made.
pub fn run_worker<D: Desktop, C: Clock>(
    events: &Receiver<ProcessStartEvent>,
    fixer: &TaskbarFixer<D, C>,
) -> usize {
    let mut attempts = 0;
    for event in events.iter() {
        info!(
            pid = event.pid,
            parent_pid = ?event.parent_pid,
            image = %event.image_name,
            observed_at = %event.observed_at.format("%H:%M:%S%.3f"),
            "{} process started: 0x{:08X}",
            fixer.profile().process_name,
            event.pid
        );
        fixer.handle(event.pid);
        attempts += 1;
    }
    attempts
}
