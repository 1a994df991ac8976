//! Error definitions for the mapping module

use thiserror::Error;

/// Errors raised while resolving binding expressions
///
/// All variants are configuration errors: they surface once at startup and
/// stop the process before the polling loop begins.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindingError {
    /// Malformed binding syntax, or a binding kind the action does not accept
    #[error("invalid binding '{expr}': {reason}")]
    InvalidBinding { expr: String, reason: String },

    /// The device selector matches no enumerated device
    #[error("unknown device '{selector}' in binding '{expr}'")]
    UnknownDevice { expr: String, selector: String },

    /// Button or axis index outside the device's capability
    #[error("index {index} out of range in binding '{expr}' (device has {available} {what})")]
    IndexOutOfRange {
        expr: String,
        index: usize,
        available: usize,
        what: &'static str,
    },
}

impl BindingError {
    pub(crate) fn invalid(expr: &str, reason: impl Into<String>) -> Self {
        BindingError::InvalidBinding {
            expr: expr.to_string(),
            reason: reason.into(),
        }
    }
}
