//! GPIO capability traits and the pluggable backend trait.
//!
//! This module defines:
//! - `Level` - digital pin level
//! - `DigitalOutput` / `DigitalInput` / `PwmOutput` - owned pin handles
//! - `GpioBackend` - factory for handles, one implementation per hardware
//!   target (simulation, Raspberry Pi)

use crate::error::HalError;

/// Digital pin level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    /// Logic low.
    Low,
    /// Logic high.
    High,
}

impl Level {
    /// Returns true for [`Level::High`].
    #[inline]
    pub const fn is_high(&self) -> bool {
        matches!(self, Self::High)
    }
}

/// An owned digital output pin.
pub trait DigitalOutput: Send {
    /// Drive the pin to the given level.
    fn write(&mut self, level: Level) -> Result<(), HalError>;
}

/// An owned digital input pin.
pub trait DigitalInput: Send {
    /// Sample the current pin level.
    fn read(&self) -> Result<Level, HalError>;
}

/// An owned PWM-capable output pin.
///
/// `duty` is expressed in units of the range passed at creation
/// (software-PWM semantics: one unit = 100 µs of high time per period).
pub trait PwmOutput: Send {
    /// Write a duty value in `0..=range`.
    fn write(&mut self, duty: u32) -> Result<(), HalError>;

    /// Silence the output immediately. A subsequent [`PwmOutput::write`]
    /// re-energizes it.
    fn disable(&mut self) -> Result<(), HalError>;

    /// Configured duty range of this output.
    fn range(&self) -> u32;
}

/// Factory for pin handles, one implementation per hardware target.
///
/// Each acquisition claims the pin exclusively and can fail; acquisition
/// failure at startup is fatal for the whole system.
pub trait GpioBackend {
    /// Backend identifier (e.g. "simulation", "raspi").
    fn name(&self) -> &'static str;

    /// Claim a pin as a digital output, initially low.
    fn digital_output(&mut self, pin: u8) -> Result<Box<dyn DigitalOutput>, HalError>;

    /// Claim a pin as a digital input.
    fn digital_input(&mut self, pin: u8) -> Result<Box<dyn DigitalInput>, HalError>;

    /// Claim a pin as a PWM output with the given duty range, initially
    /// silent.
    fn pwm_output(&mut self, pin: u8, range: u32) -> Result<Box<dyn PwmOutput>, HalError>;
}
