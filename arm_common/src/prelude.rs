//! Prelude module for common re-exports.
//!
//! `use arm_common::prelude::*;` pulls in the types nearly every consumer
//! needs without listing individual paths.

// ─── Control context ────────────────────────────────────────────────
pub use crate::context::{ControlContext, Mode};

// ─── Commands & status ──────────────────────────────────────────────
pub use crate::command::{Command, CommandParseError};
pub use crate::status::StatusReport;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ArmConfig, ConfigError, ConfigLoader};

// ─── System constants ───────────────────────────────────────────────
pub use crate::consts::{MAX_ANGLE_DEG, MAX_JOINTS};
