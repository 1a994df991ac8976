//! Screen geometry: rectangles, monitors, windows and the [`Desktop`] seam
//!
//! All rectangles are in physical screen pixels. The process declares
//! per-monitor DPI awareness at startup, so monitor and window bounds coming
//! from the OS are already unscaled.

pub mod region;

pub use region::{ClampRegion, RegionResolver};

use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn area(&self) -> i64 {
        i64::from(self.width.max(0)) * i64::from(self.height.max(0))
    }

    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} at ({}, {})", self.width, self.height, self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorInfo {
    pub index: usize,
    pub bounds: Rect,
    pub primary: bool,
    pub name: String,
}

/// Opaque OS window handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

/// Top-level window eligible as a target
#[derive(Debug, Clone, PartialEq)]
pub struct WindowInfo {
    pub handle: WindowHandle,
    pub title: String,
    pub class: String,
    /// Client area in screen coordinates
    pub client: Rect,
}

/// Monitor and window queries
pub trait Desktop {
    /// Monitors in enumeration order
    fn monitors(&self) -> Vec<MonitorInfo>;

    /// Visible, unowned, non-tool top-level windows
    fn windows(&self) -> Vec<WindowInfo>;

    /// Current client area of a window in screen coordinates; `None` when
    /// the window is gone, minimized or has no usable area
    fn client_bounds(&self, handle: WindowHandle) -> Option<Rect>;

    /// Union of all monitor bounds
    fn virtual_bounds(&self) -> Rect {
        self.monitors()
            .iter()
            .fold(Rect::default(), |acc, m| acc.union(&m.bounds))
    }

    fn find_window(&self, class: &str, title: &str) -> Option<WindowInfo> {
        select_window(&self.windows(), class, title).cloned()
    }
}

/// Picks the target window.
///
/// An exact class match is preferred; otherwise the title must contain
/// `title` (case-insensitive). Among several matches the largest client area
/// wins. Windows without a usable client area are never selected.
pub fn select_window<'a>(windows: &'a [WindowInfo], class: &str, title: &str) -> Option<&'a WindowInfo> {
    let class = class.trim();
    let title = title.trim().to_lowercase();

    let largest = |matches: Vec<&'a WindowInfo>| matches.into_iter().max_by_key(|w| w.client.area());
    let usable = || windows.iter().filter(|w| !w.client.is_empty());

    if !class.is_empty() {
        let by_class: Vec<_> = usable().filter(|w| w.class == class).collect();
        if !by_class.is_empty() {
            return largest(by_class);
        }
    }

    if !title.is_empty() {
        let by_title: Vec<_> = usable()
            .filter(|w| w.title.to_lowercase().contains(&title))
            .collect();
        return largest(by_title);
    }

    None
}
