//! Ultrasonic distance sensor: pulse timing and filtering.
//!
//! Ranging is pulse-width based: a short trigger pulse, then the echo pin is
//! high for the round-trip time of the sound burst. Edge detection is a
//! bounded spin loop with an explicit deadline check — a deliberate design
//! choice, not an oversight: the timing is microsecond-scale and no
//! interrupt capability is assumed, so busy-polling is the simplest correct
//! strategy, and the deadline guarantees a disconnected or faulty sensor
//! cannot hang the control loop.

use std::time::Instant;

use thiserror::Error;
use tracing::debug;

use arm_common::consts::{ECHO_TIMEOUT, MIN_DISTANCE_CM, SAMPLE_INTERVAL, SOUND_CM_PER_US,
                         TRIGGER_PULSE};
use arm_hal::gpio::{DigitalInput, DigitalOutput, GpioBackend, Level};
use arm_hal::HalError;

/// Error type for distance measurements.
///
/// All variants are non-fatal for the control loop: a failed sample is
/// treated as "no object detected".
#[derive(Debug, Clone, Error)]
pub enum SensorError {
    /// No echo edge within the deadline.
    #[error("echo timeout")]
    EchoTimeout,

    /// Reading outside the physically plausible window.
    #[error("reading {0:.1} cm out of range")]
    OutOfRange(f32),

    /// Every sample of an averaging pass failed.
    #[error("all samples invalid")]
    AllSamplesInvalid,

    /// Underlying pin fault.
    #[error(transparent)]
    Hal(#[from] HalError),
}

/// HC-SR04-style ultrasonic sensor over two owned pin handles.
pub struct UltrasonicSensor {
    /// Trigger output.
    trigger: Box<dyn DigitalOutput>,
    /// Echo input.
    echo: Box<dyn DigitalInput>,
    /// Upper bound for valid readings [cm].
    max_distance_cm: f32,
}

impl UltrasonicSensor {
    /// Claim the trigger/echo pins and settle the trigger low.
    ///
    /// # Errors
    ///
    /// Propagates pin acquisition failures — fatal at startup.
    pub fn new(
        backend: &mut dyn GpioBackend,
        trigger_pin: u8,
        echo_pin: u8,
        max_distance_cm: f32,
    ) -> Result<Self, HalError> {
        let mut trigger = backend.digital_output(trigger_pin)?;
        let echo = backend.digital_input(echo_pin)?;
        trigger.write(Level::Low)?;
        Ok(Self {
            trigger,
            echo,
            max_distance_cm,
        })
    }

    /// Take one distance measurement.
    ///
    /// # Errors
    ///
    /// - [`SensorError::EchoTimeout`] when either echo edge misses its 30 ms
    ///   deadline
    /// - [`SensorError::OutOfRange`] for readings below 2 cm or above the
    ///   configured maximum
    pub fn measure(&mut self) -> Result<f32, SensorError> {
        // Trigger pulse.
        self.trigger.write(Level::High)?;
        std::thread::sleep(TRIGGER_PULSE);
        self.trigger.write(Level::Low)?;

        // Echo high time, both edges bounded by their own deadline.
        let rise = self.wait_for_edge(Level::High, Instant::now() + ECHO_TIMEOUT)?;
        let fall = self.wait_for_edge(Level::Low, rise + ECHO_TIMEOUT)?;

        let high_time_us = (fall - rise).as_micros() as f32;
        // Half the round trip.
        let distance = high_time_us * SOUND_CM_PER_US / 2.0;

        if distance < MIN_DISTANCE_CM || distance > self.max_distance_cm {
            return Err(SensorError::OutOfRange(distance));
        }
        Ok(distance)
    }

    /// Average `samples` successive measurements, discarding failed ones.
    ///
    /// `samples` is coerced to at least 1. Samples are separated by the
    /// fixed inter-sample delay so echoes of consecutive pings cannot
    /// interfere.
    ///
    /// # Errors
    ///
    /// [`SensorError::AllSamplesInvalid`] when no sample survives.
    pub fn average(&mut self, samples: usize) -> Result<f32, SensorError> {
        let samples = samples.max(1);
        let mut sum = 0.0f32;
        let mut valid = 0usize;

        for _ in 0..samples {
            match self.measure() {
                Ok(distance) => {
                    sum += distance;
                    valid += 1;
                }
                Err(e) => debug!("discarding sample: {e}"),
            }
            std::thread::sleep(SAMPLE_INTERVAL);
        }

        if valid == 0 {
            return Err(SensorError::AllSamplesInvalid);
        }
        Ok(sum / valid as f32)
    }

    /// Whether an averaged reading falls inside `[min, max]` [cm].
    pub fn is_object_in_range(&mut self, min: f32, max: f32, samples: usize) -> bool {
        matches!(self.average(samples), Ok(d) if d >= min && d <= max)
    }

    /// Spin until the echo pin reaches `level`, returning the edge time.
    fn wait_for_edge(&self, level: Level, deadline: Instant) -> Result<Instant, SensorError> {
        loop {
            if self.echo.read()? == level {
                return Ok(Instant::now());
            }
            if Instant::now() > deadline {
                return Err(SensorError::EchoTimeout);
            }
            std::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arm_hal::SimBackend;
    use std::time::Duration;

    const TRIG: u8 = 23;
    const ECHO: u8 = 24;

    fn rig(max_distance_cm: f32) -> (SimBackend, UltrasonicSensor) {
        let mut backend = SimBackend::new();
        backend.link_ultrasonic(TRIG, ECHO);
        let sensor = UltrasonicSensor::new(&mut backend, TRIG, ECHO, max_distance_cm).unwrap();
        (backend, sensor)
    }

    #[test]
    fn measures_scripted_distance() {
        let (backend, mut sensor) = rig(400.0);
        backend.queue_echo(Some(SimBackend::pulse_for_distance(20.0)));
        let distance = sensor.measure().unwrap();
        assert!((distance - 20.0).abs() < 1.5, "got {distance}");
    }

    #[test]
    fn no_echo_is_a_timeout() {
        let (_backend, mut sensor) = rig(400.0);
        assert!(matches!(sensor.measure(), Err(SensorError::EchoTimeout)));
    }

    #[test]
    fn long_echo_is_out_of_range() {
        let (backend, mut sensor) = rig(400.0);
        backend.queue_echo(Some(SimBackend::pulse_for_distance(450.0)));
        assert!(matches!(sensor.measure(), Err(SensorError::OutOfRange(_))));
    }

    #[test]
    fn sub_two_centimeter_echo_is_out_of_range() {
        let (backend, mut sensor) = rig(400.0);
        backend.queue_echo(Some(Duration::from_micros(50)));
        assert!(matches!(sensor.measure(), Err(SensorError::OutOfRange(_))));
    }

    #[test]
    fn average_skips_invalid_samples() {
        let (backend, mut sensor) = rig(400.0);
        backend.queue_echo(Some(SimBackend::pulse_for_distance(18.0)));
        backend.queue_echo(Some(SimBackend::pulse_for_distance(19.0)));
        backend.queue_echo(None); // timeout
        backend.queue_echo(Some(SimBackend::pulse_for_distance(21.0)));
        let mean = sensor.average(4).unwrap();
        // mean of the three valid samples
        assert!((mean - 19.33).abs() < 1.0, "got {mean}");
    }

    #[test]
    fn average_fails_when_every_sample_is_invalid() {
        let (_backend, mut sensor) = rig(400.0);
        assert!(matches!(
            sensor.average(3),
            Err(SensorError::AllSamplesInvalid)
        ));
    }

    #[test]
    fn zero_samples_is_coerced_to_one() {
        let (backend, mut sensor) = rig(400.0);
        backend.queue_echo(Some(SimBackend::pulse_for_distance(30.0)));
        let mean = sensor.average(0).unwrap();
        assert!((mean - 30.0).abs() < 1.5);
    }

    #[test]
    fn object_in_range_check() {
        let (backend, mut sensor) = rig(400.0);
        backend.queue_echo(Some(SimBackend::pulse_for_distance(15.0)));
        assert!(sensor.is_object_in_range(5.0, 25.0, 1));
        assert!(!sensor.is_object_in_range(5.0, 25.0, 1)); // queue now empty
    }
}
