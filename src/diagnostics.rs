//! Startup listings for devices, monitors and windows

use std::fmt::Write;

use tracing::info;

use crate::config::Config;
use crate::controller::device::DeviceInfo;
use crate::controller::gilrs_sampler::{AXES, BUTTONS};
use crate::geometry::{MonitorInfo, RegionResolver, WindowInfo};
use crate::mapping::{Action, ActionTable};

pub fn format_devices(devices: &[DeviceInfo]) -> String {
    if devices.is_empty() {
        return "No controllers found\n".to_string();
    }
    let mut out = String::new();
    for d in devices {
        let _ = writeln!(
            out,
            "[{}] {}  id={}  buttons={} axes={}",
            d.index, d.name, d.identifier, d.button_count, d.axis_count
        );
    }
    out
}

/// Binding numbers of the gilrs buttons and axes
pub fn format_capabilities() -> String {
    let mut out = String::from("Buttons (button:N):\n");
    for (i, b) in BUTTONS.iter().enumerate() {
        let _ = writeln!(out, "  {:>2} = {:?}", i + 1, b);
    }
    out.push_str("Axes (axis:N):\n");
    for (i, a) in AXES.iter().enumerate() {
        let _ = writeln!(out, "  {:>2} = {:?}", i, a);
    }
    out
}

pub fn format_monitors(monitors: &[MonitorInfo]) -> String {
    let mut out = String::new();
    for m in monitors {
        let _ = writeln!(
            out,
            "[{}] {} {}{}",
            m.index,
            m.name,
            m.bounds,
            if m.primary { " (primary)" } else { "" }
        );
    }
    out
}

pub fn format_windows(windows: &[WindowInfo]) -> String {
    if windows.is_empty() {
        return "No eligible top-level windows\n".to_string();
    }
    let mut out = String::new();
    for w in windows {
        let _ = writeln!(
            out,
            "class=\"{}\" title=\"{}\" client {}",
            w.class, w.title, w.client
        );
    }
    out
}

/// Logs the resolved setup once before polling starts
pub fn log_startup(
    devices: &[DeviceInfo],
    monitors: &[MonitorInfo],
    table: &ActionTable,
    region: &RegionResolver,
    config: &Config,
) {
    let input = &config.input;

    for line in format_devices(devices).lines() {
        info!("Device {}", line);
    }
    for line in format_monitors(monitors).lines() {
        info!("Monitor {}", line);
    }
    info!("Pinned monitor bounds {}", region.monitor());

    for action in Action::ALL {
        let bindings = table.bindings(action);
        if !bindings.is_empty() {
            let list: Vec<String> = bindings.iter().map(ToString::to_string).collect();
            info!("{} -> {}", action, list.join(", "));
        }
    }
    for (name, bindings) in [("axis_x", &table.axis_x), ("axis_y", &table.axis_y)] {
        if !bindings.is_empty() {
            let list: Vec<String> = bindings.iter().map(ToString::to_string).collect();
            info!("{} -> {}", name, list.join(", "));
        }
    }
    match &table.modifier {
        Some(m) => info!(
            "modifier -> {}{}",
            m,
            if input.modifier_layer { " (layer mode)" } else { "" }
        ),
        None => info!("modifier -> unbound"),
    }

    if let Ok(anchor) = config.anchor() {
        let region_now = region.region();
        let (x, y) = crate::geometry::region::anchor_point(anchor, region_now.bounds());
        let (sx, sy) = region_now.to_screen(x, y);
        info!(
            "Base target ({}, {}) in {:?}, clamp {:?}",
            sx, sy, anchor, input.clamp_space
        );
    }
    info!(
        "Timing: poll {} Hz, repeat {} ms, grace {} ms, debounce {} ms",
        input.poll_hz, input.repeat_ms, input.startup_grace_ms, input.toggle_debounce_ms
    );
}
