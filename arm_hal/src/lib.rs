//! # Smart-Arm HAL
//!
//! Hardware abstraction consumed by the controllers: digital-output write,
//! digital-input read and PWM-capable output create/write, each acquired as
//! an owned handle whose one-time initialization can fail. Controllers never
//! touch pins directly — they are constructed from handles produced by a
//! [`gpio::GpioBackend`].
//!
//! # Module Structure
//!
//! - [`error`] - `HalError` type
//! - [`gpio`] - Capability traits and the backend trait
//! - [`sim`] - In-memory simulation backend (tests, `--simulate`)
//! - `raspi` - Raspberry Pi GPIO backend (`raspi` feature, Linux only)

pub mod error;
pub mod gpio;
pub mod sim;

#[cfg(all(feature = "raspi", target_os = "linux"))]
pub mod raspi;

pub use crate::error::HalError;
pub use crate::gpio::{DigitalInput, DigitalOutput, GpioBackend, Level, PwmOutput};
pub use crate::sim::SimBackend;
