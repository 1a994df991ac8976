//! Configuration loading and validation
//!
//! The configuration is a TOML file with a single `[input]` table. It is read
//! once at startup, validated completely, and then treated as an immutable
//! snapshot for the lifetime of the engine.
//!
//! ```toml
//! [input]
//! button_toggle = "devIdx:0:button:1"
//! axis_x = ["dev:030000005e0400008e02000000007200:axis:0"]
//! x_frac = 0.5
//! y_frac = 0.5
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// File name looked up in the working directory and the user config dir
pub const CONFIG_FILE_NAME: &str = "padpin.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("clamp_space = \"window\" requires focus_window_class or focus_window_title")]
    MissingWindowSelector,

    #[error("No config file found (looked in {0})")]
    NotFound(String),
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Region the target position is expressed in and clamped to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClampSpace {
    #[default]
    Monitor,
    Virtual,
    Window,
}

/// One or more binding expressions.
///
/// Accepts either a TOML array of strings or a single comma separated string.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "RawBindingList")]
pub struct BindingList(pub Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBindingList {
    One(String),
    Many(Vec<String>),
}

impl From<RawBindingList> for BindingList {
    fn from(raw: RawBindingList) -> Self {
        let items = match raw {
            RawBindingList::One(s) => s.split(',').map(str::to_string).collect(),
            RawBindingList::Many(v) => v,
        };
        BindingList(
            items
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }
}

impl BindingList {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub input: InputConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    // bindings
    pub modifier: String,
    pub modifier_layer: bool,
    pub button_toggle: BindingList,
    pub button_on: BindingList,
    pub button_off: BindingList,
    pub button_inc_x: BindingList,
    pub button_dec_x: BindingList,
    pub button_inc_y: BindingList,
    pub button_dec_y: BindingList,
    pub button_mouse_left: BindingList,
    pub button_mouse_right: BindingList,
    pub button_wheel_up: BindingList,
    pub button_wheel_down: BindingList,
    pub axis_x: BindingList,
    pub axis_y: BindingList,

    // motion
    pub axis_deadzone: f32,
    pub axis_deadzone_x: Option<f32>,
    pub axis_deadzone_y: Option<f32>,
    pub axis_invert_x: bool,
    pub axis_invert_y: bool,
    pub axis_velocity_px_s: f64,
    pub axis_button_hysteresis: f32,
    pub nudge_velocity_px_s: f64,
    pub hold_accel_enable: bool,
    pub hold_accel_after_ms: u64,
    pub hold_accel_ramp_ms: u64,
    pub hold_accel_max: f64,

    // target
    pub monitor_index: usize,
    pub x_frac: Option<f64>,
    pub y_frac: Option<f64>,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub clamp_space: ClampSpace,

    // timing
    pub poll_hz: u32,
    pub repeat_ms: u64,
    pub startup_grace_ms: u64,
    pub toggle_debounce_ms: u64,

    // behaviour
    pub restore_on_off: bool,
    pub wiggle_one_pixel: bool,
    pub wheel_ticks_per_second: f64,

    // window
    pub focus_on_toggle: bool,
    pub center_in_window_on_toggle: bool,
    pub focus_window_title: String,
    pub focus_window_class: String,
    pub window_restore_if_minimized: bool,
    pub window_force_foreground: bool,
    pub window_x_frac: Option<f64>,
    pub window_y_frac: Option<f64>,
    pub window_x: Option<i32>,
    pub window_y: Option<i32>,

    // logging
    pub toggle_feedback: bool,
    pub log_apply: bool,
    pub debug_buttons: bool,
    pub debug_io: bool,
    pub debug_window: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            modifier: String::new(),
            modifier_layer: false,
            button_toggle: BindingList::default(),
            button_on: BindingList::default(),
            button_off: BindingList::default(),
            button_inc_x: BindingList::default(),
            button_dec_x: BindingList::default(),
            button_inc_y: BindingList::default(),
            button_dec_y: BindingList::default(),
            button_mouse_left: BindingList::default(),
            button_mouse_right: BindingList::default(),
            button_wheel_up: BindingList::default(),
            button_wheel_down: BindingList::default(),
            axis_x: BindingList::default(),
            axis_y: BindingList::default(),
            axis_deadzone: 0.15,
            axis_deadzone_x: None,
            axis_deadzone_y: None,
            axis_invert_x: false,
            axis_invert_y: false,
            axis_velocity_px_s: 800.0,
            axis_button_hysteresis: 0.10,
            nudge_velocity_px_s: 600.0,
            hold_accel_enable: false,
            hold_accel_after_ms: 400,
            hold_accel_ramp_ms: 1500,
            hold_accel_max: 3.0,
            monitor_index: 0,
            x_frac: None,
            y_frac: None,
            x: None,
            y: None,
            clamp_space: ClampSpace::Monitor,
            poll_hz: 250,
            repeat_ms: 1000,
            startup_grace_ms: 200,
            toggle_debounce_ms: 150,
            restore_on_off: false,
            wiggle_one_pixel: false,
            wheel_ticks_per_second: 30.0,
            focus_on_toggle: false,
            center_in_window_on_toggle: false,
            focus_window_title: String::new(),
            focus_window_class: String::new(),
            window_restore_if_minimized: true,
            window_force_foreground: false,
            window_x_frac: None,
            window_y_frac: None,
            window_x: None,
            window_y: None,
            toggle_feedback: true,
            log_apply: false,
            debug_buttons: false,
            debug_io: false,
            debug_window: false,
        }
    }
}

/// Base target inside the clamp region
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Anchor {
    Fraction { x: f64, y: f64 },
    Pixel { x: i32, y: i32 },
}

/// Target inside a window client area
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowAnchor {
    Fraction { x: f64, y: f64 },
    Pixel { x: i32, y: i32 },
    Center,
}

impl Config {
    /// Reads, parses and validates a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading config from {}", path.display());
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        debug!("Config validated: {:?}", config.input);
        Ok(config)
    }

    /// Checks ranges and cross-field requirements
    pub fn validate(&self) -> Result<(), ConfigError> {
        let input = &self.input;

        if input.button_toggle.is_empty() && input.button_on.is_empty() {
            return Err(ConfigError::invalid(
                "button_toggle",
                "button_toggle or button_on must be bound",
            ));
        }

        check_deadzone("axis_deadzone", input.axis_deadzone)?;
        if let Some(dz) = input.axis_deadzone_x {
            check_deadzone("axis_deadzone_x", dz)?;
        }
        if let Some(dz) = input.axis_deadzone_y {
            check_deadzone("axis_deadzone_y", dz)?;
        }
        check_positive("axis_velocity_px_s", input.axis_velocity_px_s)?;
        check_positive("nudge_velocity_px_s", input.nudge_velocity_px_s)?;
        if !(input.axis_button_hysteresis >= 0.0 && input.axis_button_hysteresis.is_finite()) {
            return Err(ConfigError::invalid(
                "axis_button_hysteresis",
                "must be a finite number >= 0",
            ));
        }
        if !(input.hold_accel_max >= 1.0 && input.hold_accel_max.is_finite()) {
            return Err(ConfigError::invalid("hold_accel_max", "must be >= 1"));
        }
        if !(input.wheel_ticks_per_second >= 0.0 && input.wheel_ticks_per_second.is_finite()) {
            return Err(ConfigError::invalid(
                "wheel_ticks_per_second",
                "must be a finite number >= 0",
            ));
        }
        if input.poll_hz < 10 {
            return Err(ConfigError::invalid("poll_hz", "must be at least 10"));
        }
        if input.repeat_ms < 1 {
            return Err(ConfigError::invalid("repeat_ms", "must be at least 1"));
        }

        self.anchor()?;
        self.window_anchor()?;

        if input.clamp_space == ClampSpace::Window && !self.has_window_selector() {
            return Err(ConfigError::MissingWindowSelector);
        }
        if (input.focus_on_toggle || input.center_in_window_on_toggle) && !self.has_window_selector()
        {
            return Err(ConfigError::invalid(
                "focus_window_class",
                "focus_on_toggle and center_in_window_on_toggle need a window selector",
            ));
        }

        Ok(())
    }

    /// Configured base anchor; a fraction pair wins over a pixel pair
    pub fn anchor(&self) -> Result<Anchor, ConfigError> {
        let input = &self.input;
        if let Some((x, y)) = pair("x_frac", input.x_frac, "y_frac", input.y_frac)? {
            if !x.is_finite() || !y.is_finite() {
                return Err(ConfigError::invalid("x_frac", "must be a finite number"));
            }
            return Ok(Anchor::Fraction { x, y });
        }
        match pair("x", input.x, "y", input.y)? {
            Some((x, y)) => Ok(Anchor::Pixel { x, y }),
            None => Err(ConfigError::invalid(
                "x_frac",
                "an anchor is required: set x_frac/y_frac or x/y",
            )),
        }
    }

    pub fn window_anchor(&self) -> Result<WindowAnchor, ConfigError> {
        let input = &self.input;
        if let Some((x, y)) = pair(
            "window_x_frac",
            input.window_x_frac,
            "window_y_frac",
            input.window_y_frac,
        )? {
            if !x.is_finite() || !y.is_finite() {
                return Err(ConfigError::invalid(
                    "window_x_frac",
                    "must be a finite number",
                ));
            }
            return Ok(WindowAnchor::Fraction { x, y });
        }
        if let Some((x, y)) = pair("window_x", input.window_x, "window_y", input.window_y)? {
            return Ok(WindowAnchor::Pixel { x, y });
        }
        Ok(WindowAnchor::Center)
    }

    pub fn has_window_selector(&self) -> bool {
        !self.input.focus_window_class.trim().is_empty()
            || !self.input.focus_window_title.trim().is_empty()
    }

    /// Whether the target window must be looked up when activating
    pub fn needs_window(&self) -> bool {
        self.input.clamp_space == ClampSpace::Window
            || self.input.focus_on_toggle
            || self.input.center_in_window_on_toggle
    }
}

impl InputConfig {
    pub fn deadzone_x(&self) -> f32 {
        self.axis_deadzone_x.unwrap_or(self.axis_deadzone)
    }

    pub fn deadzone_y(&self) -> f32 {
        self.axis_deadzone_y.unwrap_or(self.axis_deadzone)
    }
}

fn pair<T>(
    key_x: &'static str,
    x: Option<T>,
    key_y: &'static str,
    y: Option<T>,
) -> Result<Option<(T, T)>, ConfigError> {
    match (x, y) {
        (Some(x), Some(y)) => Ok(Some((x, y))),
        (None, None) => Ok(None),
        (Some(_), None) => Err(ConfigError::invalid(key_y, format!("set together with {}", key_x))),
        (None, Some(_)) => Err(ConfigError::invalid(key_x, format!("set together with {}", key_y))),
    }
}

fn check_deadzone(key: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(key, "must be in [0, 1)"))
    }
}

fn check_positive(key: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::invalid(key, "must be a finite number > 0"))
    }
}

/// Resolves the config path: explicit argument, `./padpin.toml`, then the
/// per-user config directory.
pub fn find_config_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let mut candidates = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("padpin").join(CONFIG_FILE_NAME));
    }

    for candidate in &candidates {
        if candidate.is_file() {
            debug!("Using config at {}", candidate.display());
            return Ok(candidate.clone());
        }
    }

    Err(ConfigError::NotFound(
        candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", "),
    ))
}
