//! Binding resolution and input-to-motion mapping.
//!
//! [`binding`] parses and resolves single expressions, [`actions`] builds the
//! full action table and runs the per-tick detectors, [`motion`] turns the
//! resulting frame into a pixel displacement.

pub mod actions;
pub mod binding;
pub mod error;
pub mod motion;

pub use actions::{Action, ActionTable, InputFrame, InputMapper};
pub use binding::{BindingKind, BindingRef, Polarity, ResolvedBinding};
pub use error::BindingError;
pub use motion::{MotionIntegrator, MotionSettings};
