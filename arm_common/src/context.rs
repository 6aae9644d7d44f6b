//! Shared control context: the mode, running and halt flags.
//!
//! Both execution contexts — command intake and the control loop — hold an
//! `Arc<ControlContext>`. All fields are lock-free atomics: single scalars
//! read far more often than written, with no ordering requirement beyond
//! visibility (mode changes are idempotent with respect to the next loop
//! iteration).

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

/// Arbitration mode of the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum Mode {
    /// Autonomous proximity-triggered actuation.
    Auto = 0,
    /// Only remote commands drive actuation.
    Manual = 1,
}

impl Mode {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Auto),
            1 => Some(Self::Manual),
            _ => None,
        }
    }

    /// Token used by the command grammar and the status snapshot.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "AUTO",
            Self::Manual => "MANUAL",
        }
    }
}

impl Default for Mode {
    fn default() -> Self {
        Self::Auto
    }
}

/// Process-wide control flags shared between command intake and the
/// control loop. Replaces hidden global state — constructed once in `main`
/// and passed by `Arc` into both tasks.
#[derive(Debug)]
pub struct ControlContext {
    /// Current [`Mode`], stored as its `u8` discriminant.
    mode: AtomicU8,
    /// Cleared exactly once to request shutdown; never set again.
    running: AtomicBool,
    /// Motion preempt signal. Raised by a STOP command, observed between
    /// interpolation steps, cleared by the control loop once honored.
    halt: AtomicBool,
}

impl ControlContext {
    /// Create a context in the initial state: `Auto`, running, no halt.
    pub fn new() -> Self {
        Self {
            mode: AtomicU8::new(Mode::Auto as u8),
            running: AtomicBool::new(true),
            halt: AtomicBool::new(false),
        }
    }

    /// Current arbitration mode.
    #[inline]
    pub fn mode(&self) -> Mode {
        // Visibility only; written exclusively by command intake.
        Mode::from_u8(self.mode.load(Ordering::Relaxed)).unwrap_or_default()
    }

    /// Switch mode. Only command intake calls this.
    #[inline]
    pub fn set_mode(&self, mode: Mode) {
        self.mode.store(mode as u8, Ordering::Relaxed);
    }

    /// Whether the system should keep running.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Request shutdown. Monotonic — the flag is never reset.
    #[inline]
    pub fn request_shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Raise the motion preempt signal.
    #[inline]
    pub fn request_halt(&self) {
        self.halt.store(true, Ordering::Relaxed);
    }

    /// Re-arm the preempt signal once the pending halt has been honored.
    /// Only the control loop calls this.
    #[inline]
    pub fn clear_halt(&self) {
        self.halt.store(false, Ordering::Relaxed);
    }

    /// Whether a halt is pending.
    #[inline]
    pub fn halt_requested(&self) -> bool {
        self.halt.load(Ordering::Relaxed)
    }

    /// Whether in-flight motion must be abandoned — either a halt is
    /// pending or the system is shutting down.
    #[inline]
    pub fn should_abort_motion(&self) -> bool {
        self.halt_requested() || !self.is_running()
    }
}

impl Default for ControlContext {
    fn default() -> Self {
        Self::new()
    }
}
