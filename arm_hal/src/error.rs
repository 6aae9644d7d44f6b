//! Error types for HAL operations.

use thiserror::Error;

/// Error type for hardware-abstraction operations.
///
/// Any of these during startup handle acquisition is fatal for the whole
/// system; during operation they are logged and the affected command or
/// sequence step is dropped.
#[derive(Debug, Clone, Error)]
pub enum HalError {
    /// Backend initialization failed.
    #[error("GPIO backend initialization failed: {0}")]
    InitFailed(String),

    /// The pin is already claimed or cannot be acquired.
    #[error("pin {pin} unavailable: {reason}")]
    PinUnavailable {
        /// BCM pin number.
        pin: u8,
        /// Backend-specific reason.
        reason: String,
    },

    /// A write to an output pin failed.
    #[error("write to pin {0} failed: {1}")]
    WriteFailed(u8, String),

    /// A read from an input pin failed.
    #[error("read from pin {0} failed: {1}")]
    ReadFailed(u8, String),

    /// A PWM duty value exceeds the output's configured range.
    #[error("duty {duty} exceeds PWM range {range} on pin {pin}")]
    DutyOutOfRange {
        /// BCM pin number.
        pin: u8,
        /// Requested duty value.
        duty: u32,
        /// Configured range of the output.
        range: u32,
    },
}
