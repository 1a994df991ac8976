//! Clamp regions and target window tracking

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{Anchor, ClampSpace, InputConfig, WindowAnchor};
use crate::geometry::{Desktop, Rect, WindowHandle};

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("No monitors reported by the desktop")]
    NoMonitors,
}

/// Region the target is expressed in and clamped to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClampRegion {
    Monitor(Rect),
    VirtualDesktop(Rect),
    WindowClient(WindowHandle, Rect),
}

impl ClampRegion {
    pub fn bounds(&self) -> Rect {
        match self {
            ClampRegion::Monitor(r) | ClampRegion::VirtualDesktop(r) => *r,
            ClampRegion::WindowClient(_, r) => *r,
        }
    }

    /// Limits a region-relative target to `0 ..= size - 1`
    pub fn clamp_relative(&self, x: f64, y: f64) -> (f64, f64) {
        let b = self.bounds();
        (
            x.clamp(0.0, f64::from((b.width - 1).max(0))),
            y.clamp(0.0, f64::from((b.height - 1).max(0))),
        )
    }

    /// Absolute screen position of a region-relative target, clamped to
    /// `origin ..= origin + size - 1`
    pub fn to_screen(&self, x: f64, y: f64) -> (i32, i32) {
        let b = self.bounds();
        let sx = (f64::from(b.x) + x).round() as i32;
        let sy = (f64::from(b.y) + y).round() as i32;
        (
            sx.clamp(b.x, (b.right() - 1).max(b.x)),
            sy.clamp(b.y, (b.bottom() - 1).max(b.y)),
        )
    }
}

/// Base anchor relative to `bounds`
pub fn anchor_point(anchor: Anchor, bounds: Rect) -> (f64, f64) {
    match anchor {
        Anchor::Fraction { x, y } => (x * f64::from(bounds.width), y * f64::from(bounds.height)),
        Anchor::Pixel { x, y } => (f64::from(x), f64::from(y)),
    }
}

/// Window anchor relative to the client area
pub fn window_anchor_point(anchor: WindowAnchor, client: Rect) -> (f64, f64) {
    match anchor {
        WindowAnchor::Fraction { x, y } => (x * f64::from(client.width), y * f64::from(client.height)),
        WindowAnchor::Pixel { x, y } => (f64::from(x), f64::from(y)),
        WindowAnchor::Center => (f64::from(client.width) / 2.0, f64::from(client.height) / 2.0),
    }
}

/// Resolves and tracks the clamp region.
///
/// Monitor and virtual bounds are fixed at startup. The target window is
/// searched on activation and its client area re-read before every apply; if
/// it disappears, is minimized or reports an empty client area, the last
/// known bounds stay in use and the search is retried at most once per
/// repeat interval.
#[derive(Debug, Clone)]
pub struct RegionResolver {
    space: ClampSpace,
    monitor: Rect,
    virtual_bounds: Rect,
    class: String,
    title: String,
    window: Option<(WindowHandle, Rect)>,
    missing: bool,
    retry: Duration,
    last_lookup: Option<Instant>,
    debug_window: bool,
}

impl RegionResolver {
    pub fn new(input: &InputConfig, desktop: &dyn Desktop) -> Result<Self, GeometryError> {
        let monitors = desktop.monitors();
        if monitors.is_empty() {
            return Err(GeometryError::NoMonitors);
        }

        let monitor = match monitors.get(input.monitor_index) {
            Some(m) => m.bounds,
            None => {
                warn!(
                    "monitor_index {} out of range ({} monitors), using monitor 0",
                    input.monitor_index,
                    monitors.len()
                );
                monitors[0].bounds
            }
        };

        Ok(Self {
            space: input.clamp_space,
            monitor,
            virtual_bounds: desktop.virtual_bounds(),
            class: input.focus_window_class.clone(),
            title: input.focus_window_title.clone(),
            window: None,
            missing: false,
            retry: Duration::from_millis(input.repeat_ms),
            last_lookup: None,
            debug_window: input.debug_window,
        })
    }

    pub fn monitor(&self) -> Rect {
        self.monitor
    }

    /// Full window search by class and title
    pub fn lookup_window(&mut self, desktop: &dyn Desktop, now: Instant) -> Option<WindowHandle> {
        self.last_lookup = Some(now);
        match desktop.find_window(&self.class, &self.title) {
            Some(found) => {
                if self.debug_window || self.window.map(|(h, _)| h) != Some(found.handle) {
                    info!(
                        "Target window '{}' [{}] client {}",
                        found.title, found.class, found.client
                    );
                }
                self.window = Some((found.handle, found.client));
                self.missing = false;
            }
            None => self.note_miss(),
        }
        self.window.map(|(h, _)| h)
    }

    /// Re-reads the client area of the tracked window before an apply
    pub fn refresh(&mut self, desktop: &dyn Desktop, now: Instant) {
        if self.space != ClampSpace::Window {
            return;
        }
        let current = self
            .window
            .and_then(|(handle, _)| desktop.client_bounds(handle).map(|b| (handle, b)));
        match current {
            Some((handle, bounds)) => {
                if self.window != Some((handle, bounds)) && self.debug_window {
                    info!("Window client area now {}", bounds);
                }
                self.window = Some((handle, bounds));
                self.missing = false;
            }
            None => {
                let due = self
                    .last_lookup
                    .map_or(true, |last| now.saturating_duration_since(last) >= self.retry);
                if due {
                    self.lookup_window(desktop, now);
                } else {
                    self.note_miss();
                }
            }
        }
    }

    fn note_miss(&mut self) {
        if !self.missing {
            match self.window {
                Some((_, bounds)) => warn!("Target window not found, reusing last bounds {}", bounds),
                None => warn!("Target window not found"),
            }
        } else {
            debug!("Target window still missing");
        }
        self.missing = true;
    }

    /// Current clamp region; a window region that was never found falls back
    /// to the monitor
    pub fn region(&self) -> ClampRegion {
        match self.space {
            ClampSpace::Monitor => ClampRegion::Monitor(self.monitor),
            ClampSpace::Virtual => ClampRegion::VirtualDesktop(self.virtual_bounds),
            ClampSpace::Window => match self.window {
                Some((handle, bounds)) => ClampRegion::WindowClient(handle, bounds),
                None => ClampRegion::Monitor(self.monitor),
            },
        }
    }

    /// Target a fresh activation starts from, relative to the current region
    pub fn initial_target(
        &self,
        anchor: Anchor,
        window_anchor: WindowAnchor,
        center_in_window: bool,
    ) -> (f64, f64) {
        let region = self.region();
        let origin = region.bounds();
        let in_window = matches!(region, ClampRegion::WindowClient(..)) || center_in_window;

        if let (true, Some((_, client))) = (in_window, self.window) {
            let (wx, wy) = window_anchor_point(window_anchor, client);
            return (
                f64::from(client.x - origin.x) + wx,
                f64::from(client.y - origin.y) + wy,
            );
        }
        anchor_point(anchor, origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::geometry::tests::FakeDesktop;

    fn input(extra: &str) -> InputConfig {
        Config::from_toml_str(&format!(
            "[input]\nbutton_toggle = \"1\"\nx_frac = 0.5\ny_frac = 0.5\n{}",
            extra
        ))
        .unwrap()
        .input
    }

    fn two_monitors() -> FakeDesktop {
        FakeDesktop::with_monitors(&[Rect::new(0, 0, 2560, 1440), Rect::new(2560, 0, 1920, 1080)])
    }

    #[test]
    fn clamp_is_inclusive_of_last_pixel() {
        let region = ClampRegion::Monitor(Rect::new(100, 50, 1920, 1080));
        assert_eq!(region.to_screen(-10.0, -10.0), (100, 50));
        assert_eq!(region.to_screen(1919.0, 1079.0), (2019, 1129));
        assert_eq!(region.to_screen(5000.0, 5000.0), (2019, 1129));
        assert_eq!(region.clamp_relative(2000.0, -1.0), (1919.0, 0.0));
    }

    #[test]
    fn degenerate_region_does_not_panic() {
        let region = ClampRegion::Monitor(Rect::new(10, 10, 0, 0));
        assert_eq!(region.to_screen(3.0, 3.0), (10, 10));
        assert_eq!(region.clamp_relative(3.0, 3.0), (0.0, 0.0));
    }

    #[test]
    fn centre_of_second_monitor() {
        let desktop = two_monitors();
        let resolver = RegionResolver::new(&input("monitor_index = 1\n"), &desktop).unwrap();
        let target = resolver.initial_target(
            Anchor::Fraction { x: 0.5, y: 0.5 },
            WindowAnchor::Center,
            false,
        );
        assert_eq!(target, (960.0, 540.0));
        assert_eq!(resolver.region().to_screen(target.0, target.1), (3520, 540));
    }

    #[test]
    fn out_of_range_monitor_falls_back_to_first() {
        let desktop = two_monitors();
        let resolver = RegionResolver::new(&input("monitor_index = 7\n"), &desktop).unwrap();
        assert_eq!(resolver.monitor(), Rect::new(0, 0, 2560, 1440));
    }

    #[test]
    fn no_monitors_is_an_error() {
        let desktop = FakeDesktop::default();
        let err = RegionResolver::new(&input(""), &desktop).unwrap_err();
        assert_eq!(err, GeometryError::NoMonitors);
    }

    #[test]
    fn virtual_space_spans_all_monitors() {
        let desktop = two_monitors();
        let resolver = RegionResolver::new(&input("clamp_space = \"virtual\"\n"), &desktop).unwrap();
        assert_eq!(resolver.region().bounds(), Rect::new(0, 0, 4480, 1440));
    }

    #[test]
    fn pixel_anchor_is_region_relative() {
        assert_eq!(
            anchor_point(Anchor::Pixel { x: 10, y: 20 }, Rect::new(500, 500, 100, 100)),
            (10.0, 20.0)
        );
    }

    #[test]
    fn window_miss_reuses_prior_bounds() {
        let desktop = two_monitors();
        desktop.add_window(7, "Sim", "Simulator", Rect::new(200, 100, 1280, 720));
        let t0 = Instant::now();
        let mut resolver = RegionResolver::new(
            &input("clamp_space = \"window\"\nfocus_window_class = \"Sim\"\n"),
            &desktop,
        )
        .unwrap();

        // before lookup the monitor stands in
        assert!(matches!(resolver.region(), ClampRegion::Monitor(_)));

        assert_eq!(resolver.lookup_window(&desktop, t0), Some(WindowHandle(7)));
        let expected = ClampRegion::WindowClient(WindowHandle(7), Rect::new(200, 100, 1280, 720));
        assert_eq!(resolver.region(), expected);

        desktop.close_windows();
        resolver.refresh(&desktop, t0);
        assert_eq!(resolver.region(), expected);
    }

    #[test]
    fn refresh_follows_moved_window() {
        let desktop = two_monitors();
        desktop.add_window(7, "Sim", "Simulator", Rect::new(200, 100, 1280, 720));
        let t0 = Instant::now();
        let mut resolver = RegionResolver::new(
            &input("clamp_space = \"window\"\nfocus_window_title = \"simul\"\n"),
            &desktop,
        )
        .unwrap();
        resolver.lookup_window(&desktop, t0);

        desktop.windows.borrow_mut()[0].client = Rect::new(300, 150, 800, 600);
        resolver.refresh(&desktop, t0);
        assert_eq!(resolver.region().bounds(), Rect::new(300, 150, 800, 600));
    }

    #[test]
    fn window_anchor_inside_monitor_space() {
        let desktop = two_monitors();
        desktop.add_window(3, "Sim", "Simulator", Rect::new(2760, 100, 1000, 800));
        let t0 = Instant::now();
        let mut resolver = RegionResolver::new(
            &input("monitor_index = 1\ncenter_in_window_on_toggle = true\nfocus_window_class = \"Sim\"\n"),
            &desktop,
        )
        .unwrap();
        resolver.lookup_window(&desktop, t0);
        let target = resolver.initial_target(
            Anchor::Fraction { x: 0.5, y: 0.5 },
            WindowAnchor::Center,
            true,
        );
        // window centre (3260, 500) relative to the monitor at x = 2560
        assert_eq!(target, (700.0, 500.0));

        let target = resolver.initial_target(
            Anchor::Fraction { x: 0.5, y: 0.5 },
            WindowAnchor::Fraction { x: 0.25, y: 0.5 },
            true,
        );
        assert_eq!(target, (450.0, 500.0));
    }

    #[test]
    fn empty_client_area_keeps_prior_bounds() {
        let desktop = two_monitors();
        desktop.add_window(7, "Sim", "Simulator", Rect::new(200, 100, 1280, 720));
        let t0 = Instant::now();
        let mut resolver = RegionResolver::new(
            &input("clamp_space = \"window\"\nfocus_window_class = \"Sim\"\n"),
            &desktop,
        )
        .unwrap();
        resolver.lookup_window(&desktop, t0);
        let expected = ClampRegion::WindowClient(WindowHandle(7), Rect::new(200, 100, 1280, 720));

        // minimized windows report a zero-size client area far off screen
        desktop.windows.borrow_mut()[0].client = Rect::new(-32000, -32000, 0, 0);
        resolver.refresh(&desktop, t0 + Duration::from_millis(10));
        assert_eq!(resolver.region(), expected);

        // a later search does not pick up the empty area either
        resolver.refresh(&desktop, t0 + Duration::from_secs(5));
        assert_eq!(resolver.region(), expected);

        desktop.windows.borrow_mut()[0].client = Rect::new(200, 100, 1280, 720);
        resolver.refresh(&desktop, t0 + Duration::from_secs(6));
        assert_eq!(resolver.region(), expected);
    }

    #[test]
    fn missing_window_search_is_throttled() {
        let desktop = two_monitors();
        desktop.add_window(7, "Sim", "Simulator", Rect::new(200, 100, 1280, 720));
        let t0 = Instant::now();
        let mut resolver = RegionResolver::new(
            &input("clamp_space = \"window\"\nfocus_window_class = \"Sim\"\nrepeat_ms = 1000\n"),
            &desktop,
        )
        .unwrap();
        resolver.lookup_window(&desktop, t0);
        desktop.close_windows();
        let searched = desktop.enumerations.get();

        // one apply per 4 ms for half a second
        for step in 1..=125u64 {
            resolver.refresh(&desktop, t0 + Duration::from_millis(step * 4));
        }
        assert_eq!(desktop.enumerations.get(), searched);

        resolver.refresh(&desktop, t0 + Duration::from_millis(1000));
        assert_eq!(desktop.enumerations.get(), searched + 1);

        desktop.add_window(8, "Sim", "Simulator", Rect::new(0, 0, 800, 600));
        resolver.refresh(&desktop, t0 + Duration::from_millis(1500));
        assert_eq!(resolver.region().bounds(), Rect::new(200, 100, 1280, 720));
        resolver.refresh(&desktop, t0 + Duration::from_millis(2000));
        assert_eq!(
            resolver.region(),
            ClampRegion::WindowClient(WindowHandle(8), Rect::new(0, 0, 800, 600))
        );
    }
}
