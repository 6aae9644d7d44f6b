//! Raspberry Pi GPIO backend (rppal).
//!
//! Servo and motor PWM use rppal's software PWM with the classic soft-PWM
//! timing: one duty unit = 100 µs of high time, period = range × 100 µs
//! (range 200 → 20 ms servo period at 50 Hz).
//!
//! Only compiled with the `raspi` feature on Linux targets.

use std::time::Duration;

use rppal::gpio::{Gpio, InputPin, OutputPin};
use tracing::info;

use crate::error::HalError;
use crate::gpio::{DigitalInput, DigitalOutput, GpioBackend, Level, PwmOutput};

/// One soft-PWM duty unit.
const PWM_UNIT: Duration = Duration::from_micros(100);

/// Raspberry Pi GPIO backend.
pub struct RaspiBackend {
    gpio: Gpio,
}

impl RaspiBackend {
    /// Open the GPIO character device.
    ///
    /// # Errors
    ///
    /// Returns `HalError::InitFailed` when the device is missing or access
    /// is denied — fatal at startup.
    pub fn new() -> Result<Self, HalError> {
        let gpio = Gpio::new().map_err(|e| HalError::InitFailed(e.to_string()))?;
        info!("Raspberry Pi GPIO backend initialized");
        Ok(Self { gpio })
    }

    fn claim(&self, pin: u8) -> Result<rppal::gpio::Pin, HalError> {
        self.gpio.get(pin).map_err(|e| HalError::PinUnavailable {
            pin,
            reason: e.to_string(),
        })
    }
}

impl GpioBackend for RaspiBackend {
    fn name(&self) -> &'static str {
        "raspi"
    }

    fn digital_output(&mut self, pin: u8) -> Result<Box<dyn DigitalOutput>, HalError> {
        let pin = self.claim(pin)?.into_output_low();
        Ok(Box::new(RaspiOutput { pin }))
    }

    fn digital_input(&mut self, pin: u8) -> Result<Box<dyn DigitalInput>, HalError> {
        let pin = self.claim(pin)?.into_input();
        Ok(Box::new(RaspiInput { pin }))
    }

    fn pwm_output(&mut self, pin: u8, range: u32) -> Result<Box<dyn PwmOutput>, HalError> {
        let pin = self.claim(pin)?.into_output_low();
        Ok(Box::new(RaspiPwm { pin, range }))
    }
}

/// Digital output backed by an rppal pin.
struct RaspiOutput {
    pin: OutputPin,
}

impl DigitalOutput for RaspiOutput {
    fn write(&mut self, level: Level) -> Result<(), HalError> {
        match level {
            Level::High => self.pin.set_high(),
            Level::Low => self.pin.set_low(),
        }
        Ok(())
    }
}

/// Digital input backed by an rppal pin.
struct RaspiInput {
    pin: InputPin,
}

impl DigitalInput for RaspiInput {
    fn read(&self) -> Result<Level, HalError> {
        if self.pin.is_high() {
            Ok(Level::High)
        } else {
            Ok(Level::Low)
        }
    }
}

/// Software-PWM output backed by an rppal pin.
struct RaspiPwm {
    pin: OutputPin,
    range: u32,
}

impl PwmOutput for RaspiPwm {
    fn write(&mut self, duty: u32) -> Result<(), HalError> {
        if duty > self.range {
            return Err(HalError::DutyOutOfRange {
                pin: self.pin.pin(),
                duty,
                range: self.range,
            });
        }
        let period = PWM_UNIT * self.range;
        let pulse = PWM_UNIT * duty;
        self.pin
            .set_pwm(period, pulse)
            .map_err(|e| HalError::WriteFailed(self.pin.pin(), e.to_string()))
    }

    fn disable(&mut self) -> Result<(), HalError> {
        self.pin
            .clear_pwm()
            .map_err(|e| HalError::WriteFailed(self.pin.pin(), e.to_string()))?;
        self.pin.set_low();
        Ok(())
    }

    fn range(&self) -> u32 {
        self.range
    }
}
