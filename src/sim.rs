//! Scripted desktop and virtual clock for driving the fixer in tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use crate::error::DesktopError;
use crate::locator::TargetProfile;
use crate::window::{
    Clock, Desktop, IdleWait, ProcessId, ThreadId, WindowGeometry, WindowHandle,
    WindowInspector, WindowStyleFlags,
};

pub(crate) fn test_profile() -> TargetProfile {
    TargetProfile {
        process_name: "Spotify.exe".to_string(),
        root_class: "root-surface".to_string(),
        render_class: "render-surface".to_string(),
        legacy_marker_class: "GDI+ Hook Window Class".to_string(),
        legacy_marker_title: "G".to_string(),
    }
}

pub(crate) fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// Clock that only moves when someone sleeps or a test advances it.
#[derive(Debug, Clone, Default)]
pub(crate) struct SimClock {
    now: Rc<Cell<Duration>>,
    sleeps: Rc<RefCell<Vec<Duration>>>,
}

impl SimClock {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub(crate) fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Clock for SimClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
        self.advance(duration);
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SimWindow {
    handle: WindowHandle,
    thread: Option<ThreadId>,
    parent: Option<WindowHandle>,
    class_name: String,
    title: String,
    appears_at: Duration,
    geometry: WindowGeometry,
    placements: Vec<(Duration, WindowGeometry)>,
    styles: Vec<(Duration, WindowStyleFlags)>,
}

impl SimWindow {
    pub(crate) fn top_level(handle: isize, thread: ThreadId, class_name: &str, title: &str) -> Self {
        Self {
            handle: WindowHandle(handle),
            thread: Some(thread),
            parent: None,
            class_name: class_name.to_string(),
            title: title.to_string(),
            appears_at: Duration::ZERO,
            geometry: WindowGeometry::new(120, 80, 1280, 800),
            placements: Vec::new(),
            styles: Vec::new(),
        }
    }

    pub(crate) fn child(handle: isize, parent: isize, class_name: &str) -> Self {
        Self {
            handle: WindowHandle(handle),
            thread: None,
            parent: Some(WindowHandle(parent)),
            class_name: class_name.to_string(),
            title: String::new(),
            appears_at: Duration::ZERO,
            geometry: WindowGeometry::new(0, 0, 1280, 760),
            placements: Vec::new(),
            styles: Vec::new(),
        }
    }

    pub(crate) fn appearing_at(mut self, at: Duration) -> Self {
        self.appears_at = at;
        self
    }

    pub(crate) fn with_geometry(mut self, geometry: WindowGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// From `at` onwards the window carries `flags`.
    pub(crate) fn styled_from(mut self, at: Duration, flags: WindowStyleFlags) -> Self {
        self.styles.push((at, flags));
        self.styles.sort_by_key(|(at, _)| *at);
        self
    }
}

#[derive(Debug)]
pub(crate) struct SimDesktop {
    clock: SimClock,
    threads: RefCell<Vec<(ProcessId, ThreadId)>>,
    windows: RefCell<Vec<SimWindow>>,
    fail_snapshots: Cell<bool>,
    snapshots: Cell<usize>,
    moves: RefCell<Vec<(WindowHandle, WindowGeometry)>>,
    class_queries: RefCell<HashMap<WindowHandle, usize>>,
    idle: Cell<(IdleWait, Duration)>,
}

impl SimDesktop {
    pub(crate) fn new(clock: SimClock) -> Self {
        Self {
            clock,
            threads: RefCell::new(Vec::new()),
            windows: RefCell::new(Vec::new()),
            fail_snapshots: Cell::new(false),
            snapshots: Cell::new(0),
            moves: RefCell::new(Vec::new()),
            class_queries: RefCell::new(HashMap::new()),
            idle: Cell::new((IdleWait::Idle, Duration::ZERO)),
        }
    }

    pub(crate) fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub(crate) fn add_thread(&self, pid: ProcessId, thread: ThreadId) {
        self.threads.borrow_mut().push((pid, thread));
    }

    pub(crate) fn add_window(&self, window: SimWindow) {
        self.windows.borrow_mut().push(window);
    }

    /// From `at` onwards the owner has moved `hwnd` to `geometry`, unless we
    /// move it ourselves later.
    pub(crate) fn place_window(&self, hwnd: WindowHandle, at: Duration, geometry: WindowGeometry) {
        if let Some(window) = self.windows.borrow_mut().iter_mut().find(|w| w.handle == hwnd) {
            window.placements.push((at, geometry));
            window.placements.sort_by_key(|(at, _)| *at);
        }
    }

    /// Drop a window as if its owner destroyed it.
    pub(crate) fn destroy_window(&self, hwnd: WindowHandle) {
        self.windows.borrow_mut().retain(|w| w.handle != hwnd);
    }

    pub(crate) fn fail_snapshots(&self, fail: bool) {
        self.fail_snapshots.set(fail);
    }

    /// The input-idle wait reports `outcome` after `takes` of virtual time.
    pub(crate) fn set_idle(&self, outcome: IdleWait, takes: Duration) {
        self.idle.set((outcome, takes));
    }

    pub(crate) fn snapshots(&self) -> usize {
        self.snapshots.get()
    }

    pub(crate) fn moves(&self) -> Vec<(WindowHandle, WindowGeometry)> {
        self.moves.borrow().clone()
    }

    pub(crate) fn class_queries_for(&self, hwnd: WindowHandle) -> usize {
        self.class_queries.borrow().get(&hwnd).copied().unwrap_or(0)
    }

    fn live<R>(&self, hwnd: WindowHandle, f: impl FnOnce(&SimWindow) -> R) -> Option<R> {
        let now = self.clock.now();
        self.windows
            .borrow()
            .iter()
            .find(|w| w.handle == hwnd && w.appears_at <= now)
            .map(f)
    }

    fn children_of(&self, parent: WindowHandle) -> Vec<WindowHandle> {
        let now = self.clock.now();
        self.windows
            .borrow()
            .iter()
            .filter(|w| w.parent == Some(parent) && w.appears_at <= now)
            .map(|w| w.handle)
            .collect()
    }
}

impl WindowInspector for SimDesktop {
    fn title(&self, hwnd: WindowHandle) -> String {
        self.live(hwnd, |w| w.title.clone()).unwrap_or_default()
    }

    fn class_name(&self, hwnd: WindowHandle) -> String {
        *self.class_queries.borrow_mut().entry(hwnd).or_insert(0) += 1;
        self.live(hwnd, |w| w.class_name.clone()).unwrap_or_default()
    }

    fn geometry(&self, hwnd: WindowHandle) -> WindowGeometry {
        let now = self.clock.now();
        self.live(hwnd, |w| {
            w.placements
                .iter()
                .rev()
                .find(|(at, _)| *at <= now)
                .map_or(w.geometry, |(_, geometry)| *geometry)
        })
        .unwrap_or_default()
    }

    fn style(&self, hwnd: WindowHandle) -> WindowStyleFlags {
        let now = self.clock.now();
        self.live(hwnd, |w| {
            w.styles
                .iter()
                .rev()
                .find(|(at, _)| *at <= now)
                .map(|(_, flags)| *flags)
                .unwrap_or_default()
        })
        .unwrap_or_default()
    }

    fn ex_style(&self, _hwnd: WindowHandle) -> WindowStyleFlags {
        WindowStyleFlags::NONE
    }
}

impl Desktop for SimDesktop {
    fn process_threads(&self, pid: ProcessId) -> Result<Vec<ThreadId>, DesktopError> {
        self.snapshots.set(self.snapshots.get() + 1);
        if self.fail_snapshots.get() {
            return Err(DesktopError::SnapshotUnavailable { code: 5 });
        }
        Ok(self
            .threads
            .borrow()
            .iter()
            .filter(|(owner, _)| *owner == pid)
            .map(|(_, thread)| *thread)
            .collect())
    }

    fn thread_windows(&self, thread: ThreadId) -> Vec<WindowHandle> {
        let now = self.clock.now();
        self.windows
            .borrow()
            .iter()
            .filter(|w| w.thread == Some(thread) && w.parent.is_none() && w.appears_at <= now)
            .map(|w| w.handle)
            .collect()
    }

    fn descendant_windows(&self, parent: WindowHandle) -> Vec<WindowHandle> {
        let mut found = Vec::new();
        let mut stack = self.children_of(parent);
        stack.reverse();
        while let Some(hwnd) = stack.pop() {
            found.push(hwnd);
            let mut children = self.children_of(hwnd);
            children.reverse();
            stack.extend(children);
        }
        found
    }

    fn move_window(&self, hwnd: WindowHandle, geometry: WindowGeometry) -> bool {
        let now = self.clock.now();
        let mut windows = self.windows.borrow_mut();
        match windows
            .iter_mut()
            .find(|w| w.handle == hwnd && w.appears_at <= now)
        {
            Some(window) => {
                window.geometry = geometry;
                window.placements.retain(|(at, _)| *at > now);
                self.moves.borrow_mut().push((hwnd, geometry));
                true
            }
            None => false,
        }
    }

    fn wait_for_input_idle(&self, _pid: ProcessId, timeout: Duration) -> IdleWait {
        let (outcome, takes) = self.idle.get();
        self.clock.advance(takes.min(timeout));
        outcome
    }
}
