//! Drive-motor controller.
//!
//! One H-bridge channel: two direction outputs and a PWM duty output.
//! Direction is derived from the sign of the commanded speed, never stored
//! separately. Out-of-range speeds are clamped here as a mechanical safety
//! net; command intake has already rejected invalid input at the boundary.

use tracing::debug;

use arm_common::consts::{MAX_MOTOR_SPEED, MOTOR_PWM_RANGE};
use arm_hal::gpio::{DigitalOutput, GpioBackend, Level, PwmOutput};
use arm_hal::HalError;

/// Controller owning the drive motor.
pub struct MotorController {
    /// Direction output 1 (high = forward).
    dir1: Box<dyn DigitalOutput>,
    /// Direction output 2 (high = reverse).
    dir2: Box<dyn DigitalOutput>,
    /// Duty output, range = speed magnitude.
    pwm: Box<dyn PwmOutput>,
    /// Last commanded speed.
    speed: i8,
}

impl MotorController {
    /// Claim the motor pins and make sure the motor is stopped.
    ///
    /// # Errors
    ///
    /// Propagates pin acquisition failures — fatal at startup.
    pub fn new(
        backend: &mut dyn GpioBackend,
        pwm_pin: u8,
        dir1_pin: u8,
        dir2_pin: u8,
    ) -> Result<Self, HalError> {
        let dir1 = backend.digital_output(dir1_pin)?;
        let dir2 = backend.digital_output(dir2_pin)?;
        let pwm = backend.pwm_output(pwm_pin, MOTOR_PWM_RANGE)?;
        let mut motor = Self {
            dir1,
            dir2,
            pwm,
            speed: 0,
        };
        motor.stop()?;
        Ok(motor)
    }

    /// Set the signed speed. Zero behaves exactly like [`Self::stop`].
    pub fn set_speed(&mut self, speed: i8) -> Result<(), HalError> {
        let speed = speed.clamp(-MAX_MOTOR_SPEED, MAX_MOTOR_SPEED);
        if speed == 0 {
            return self.stop();
        }

        if speed > 0 {
            self.dir1.write(Level::High)?;
            self.dir2.write(Level::Low)?;
        } else {
            self.dir1.write(Level::Low)?;
            self.dir2.write(Level::High)?;
        }
        self.pwm.write(speed.unsigned_abs() as u32)?;
        self.speed = speed;
        debug!("motor speed {speed}");
        Ok(())
    }

    /// De-assert both direction pins and zero the duty output. Idempotent.
    pub fn stop(&mut self) -> Result<(), HalError> {
        self.dir1.write(Level::Low)?;
        self.dir2.write(Level::Low)?;
        self.pwm.write(0)?;
        self.speed = 0;
        Ok(())
    }

    /// Last commanded speed.
    #[inline]
    pub fn speed(&self) -> i8 {
        self.speed
    }
}
