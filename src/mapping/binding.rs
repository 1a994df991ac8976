//! Binding expression parsing and resolution
//!
//! Expressions are parsed once at startup into [`BindingRef`] and then
//! resolved against the enumerated devices into [`ResolvedBinding`]. The hot
//! path only ever sees resolved bindings.
//!
//! ```text
//! devIdx:<n>:button:<b>[M|:M]          dev:<id>:button:<b>[M|:M]
//! devIdx:<n>:axis:<a>[M|:M]            dev:<id>:axis:<a>[M|:M]
//! devIdx:<n>:axis:<a>:<pos|neg|abs>:<thr>[M|:M]
//! <b>[M|:M]                            (legacy: device 0)
//! ```
//!
//! Buttons are written 1-based and become 0-based during resolution. Axes are
//! 0-based on both sides.

use std::fmt;

use crate::controller::device::DeviceInfo;
use crate::mapping::error::BindingError;

/// How a binding names its device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSelector {
    /// `dev:` token; matched against identifiers first, then as an index
    Identifier(String),
    /// `devIdx:` number
    Index(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Pos,
    Neg,
    Abs,
}

impl Polarity {
    fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "pos" => Some(Polarity::Pos),
            "neg" => Some(Polarity::Neg),
            "abs" => Some(Polarity::Abs),
            _ => None,
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Polarity::Pos => write!(f, "pos"),
            Polarity::Neg => write!(f, "neg"),
            Polarity::Abs => write!(f, "abs"),
        }
    }
}

/// Binding kind; only axis-as-button carries a threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BindingKind {
    Button,
    AxisAnalog,
    AxisButton { polarity: Polarity, threshold: f32 },
}

/// Which kinds an action accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accepts {
    /// Buttons and axis-as-button thresholds
    Buttons,
    /// Analog axes only
    Analog,
    /// Plain buttons only (the modifier)
    ButtonOnly,
}

/// Parsed, not yet resolved binding
#[derive(Debug, Clone, PartialEq)]
pub struct BindingRef {
    pub source: String,
    pub device: DeviceSelector,
    pub kind: BindingKind,
    /// Index as written: 1-based for buttons, 0-based for axes
    pub index: usize,
    pub requires_modifier: bool,
}

/// Binding bound to a device slot with a 0-based index
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBinding {
    pub source: String,
    pub device: usize,
    pub kind: BindingKind,
    pub index: usize,
    pub requires_modifier: bool,
}

impl fmt::Display for ResolvedBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            BindingKind::Button => write!(f, "dev{} button#{}", self.device, self.index)?,
            BindingKind::AxisAnalog => write!(f, "dev{} axis{}", self.device, self.index)?,
            BindingKind::AxisButton {
                polarity,
                threshold,
            } => write!(
                f,
                "dev{} axis{} {} {:.2}",
                self.device, self.index, polarity, threshold
            )?,
        }
        if self.requires_modifier {
            write!(f, " +mod")?;
        }
        write!(f, " ({})", self.source)
    }
}

/// Parses one expression. Empty input means "unbound".
pub fn parse_binding(expr: &str, accepts: Accepts) -> Result<Option<BindingRef>, BindingError> {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let (core, requires_modifier) = strip_modifier(trimmed);
    if core.is_empty() {
        return Err(BindingError::invalid(expr, "missing input"));
    }

    // legacy bare number on device 0
    if core.chars().all(|c| c.is_ascii_digit()) {
        let index = parse_index(expr, core)?;
        let kind = match accepts {
            Accepts::Analog => BindingKind::AxisAnalog,
            Accepts::Buttons | Accepts::ButtonOnly => BindingKind::Button,
        };
        return Ok(Some(BindingRef {
            source: trimmed.to_string(),
            device: DeviceSelector::Index(0),
            kind,
            index,
            requires_modifier,
        }));
    }

    let parts: Vec<&str> = core.split(':').map(str::trim).collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(BindingError::invalid(expr, "empty field"));
    }
    if parts.len() < 4 {
        return Err(BindingError::invalid(
            expr,
            "expected <dev|devIdx>:<device>:<button|axis>:<index>",
        ));
    }

    let device = match parts[0].to_ascii_lowercase().as_str() {
        "dev" | "device" => DeviceSelector::Identifier(parts[1].to_string()),
        "devidx" | "index" => DeviceSelector::Index(parse_index(expr, parts[1])?),
        other => {
            return Err(BindingError::invalid(
                expr,
                format!("unknown device prefix '{}'", other),
            ))
        }
    };

    let index = parse_index(expr, parts[3])?;
    let kind = match (parts[2].to_ascii_lowercase().as_str(), parts.len()) {
        ("button", 4) => BindingKind::Button,
        ("axis", 4) => BindingKind::AxisAnalog,
        ("axis", 6) => {
            let polarity = Polarity::parse(parts[4]).ok_or_else(|| {
                BindingError::invalid(expr, format!("polarity '{}' is not pos|neg|abs", parts[4]))
            })?;
            let threshold: f32 = parts[5].parse().map_err(|_| {
                BindingError::invalid(expr, format!("threshold '{}' is not a number", parts[5]))
            })?;
            if !(threshold > 0.0 && threshold <= 1.0) {
                return Err(BindingError::invalid(expr, "threshold must be in (0, 1]"));
            }
            BindingKind::AxisButton {
                polarity,
                threshold,
            }
        }
        ("button", _) | ("axis", _) => {
            return Err(BindingError::invalid(expr, "wrong number of fields"));
        }
        (other, _) => {
            return Err(BindingError::invalid(
                expr,
                format!("unknown input type '{}'", other),
            ))
        }
    };

    let accepted = match (accepts, kind) {
        (Accepts::Analog, BindingKind::AxisAnalog) => true,
        (Accepts::Buttons, BindingKind::Button | BindingKind::AxisButton { .. }) => true,
        (Accepts::ButtonOnly, BindingKind::Button) => true,
        _ => false,
    };
    if !accepted {
        let reason = match accepts {
            Accepts::Analog => "this action takes analog axes (dev:<d>:axis:<a>)",
            Accepts::Buttons => "this action takes buttons or axis thresholds (axis:<a>:<pos|neg|abs>:<thr>)",
            Accepts::ButtonOnly => "this action takes a button",
        };
        return Err(BindingError::invalid(expr, reason));
    }

    Ok(Some(BindingRef {
        source: trimmed.to_string(),
        device,
        kind,
        index,
        requires_modifier,
    }))
}

impl BindingRef {
    /// Binds to a device slot and converts the index to 0-based form.
    pub fn resolve(&self, devices: &[DeviceInfo]) -> Result<ResolvedBinding, BindingError> {
        let device = match &self.device {
            DeviceSelector::Identifier(token) => devices
                .iter()
                .find(|d| d.identifier.eq_ignore_ascii_case(token))
                .or_else(|| token.parse::<usize>().ok().and_then(|i| devices.get(i))),
            DeviceSelector::Index(i) => devices.get(*i),
        }
        .ok_or_else(|| BindingError::UnknownDevice {
            expr: self.source.clone(),
            selector: match &self.device {
                DeviceSelector::Identifier(token) => token.clone(),
                DeviceSelector::Index(i) => i.to_string(),
            },
        })?;

        let index = match self.kind {
            BindingKind::Button => {
                if self.index == 0 || self.index > device.button_count {
                    return Err(BindingError::IndexOutOfRange {
                        expr: self.source.clone(),
                        index: self.index,
                        available: device.button_count,
                        what: "buttons, numbered from 1",
                    });
                }
                self.index - 1
            }
            BindingKind::AxisAnalog | BindingKind::AxisButton { .. } => {
                if self.index >= device.axis_count {
                    return Err(BindingError::IndexOutOfRange {
                        expr: self.source.clone(),
                        index: self.index,
                        available: device.axis_count,
                        what: "axes, numbered from 0",
                    });
                }
                self.index
            }
        };

        Ok(ResolvedBinding {
            source: self.source.clone(),
            device: device.index,
            kind: self.kind,
            index,
            requires_modifier: self.requires_modifier,
        })
    }
}

/// Parses and resolves in one step
pub fn resolve_binding(
    expr: &str,
    accepts: Accepts,
    devices: &[DeviceInfo],
) -> Result<Option<ResolvedBinding>, BindingError> {
    match parse_binding(expr, accepts)? {
        Some(binding) => binding.resolve(devices).map(Some),
        None => Ok(None),
    }
}

/// Accepts a trailing `M` or `:M` (any case)
fn strip_modifier(expr: &str) -> (&str, bool) {
    let lower = expr.to_ascii_lowercase();
    if lower.ends_with(":m") {
        (expr[..expr.len() - 2].trim_end(), true)
    } else if lower.ends_with('m') {
        (expr[..expr.len() - 1].trim_end(), true)
    } else {
        (expr, false)
    }
}

fn parse_index(expr: &str, token: &str) -> Result<usize, BindingError> {
    token
        .parse::<usize>()
        .map_err(|_| BindingError::invalid(expr, format!("'{}' is not an index", token)))
}
