//! In-memory simulation backend.
//!
//! Emulates the GPIO capabilities without hardware so the control unit can
//! run with `--simulate` and the test suites can observe every output the
//! controllers produce. The backend is a cheap clone over shared state:
//! tests keep one clone for inspection while the controllers own the pin
//! handles created from another.
//!
//! Ultrasonic emulation: after [`SimBackend::link_ultrasonic`], a high→low
//! edge on the trigger pin consumes one scripted pulse from the queue and
//! schedules an echo window on the input pin. An empty queue (or a `None`
//! entry) produces no echo, which the sensor observes as a timeout.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::trace;

use crate::error::HalError;
use crate::gpio::{DigitalInput, DigitalOutput, GpioBackend, Level, PwmOutput};

/// Latency between the trigger edge and the start of the echo window.
const ECHO_LATENCY: Duration = Duration::from_micros(200);

/// Speed of sound [cm/µs], mirrored from the sensor's conversion so scripted
/// distances round-trip through pulse widths.
const SOUND_CM_PER_US: f32 = 0.0343;

/// Scripted ultrasonic pair state.
#[derive(Debug)]
struct UltrasonicSim {
    /// Trigger output pin.
    trigger_pin: u8,
    /// Echo input pin.
    echo_pin: u8,
    /// Whether the trigger is currently driven high.
    trigger_high: bool,
    /// Scripted echo pulse widths; `None` = no echo for that trigger.
    pulses: VecDeque<Option<Duration>>,
    /// Currently active echo window (start, end).
    window: Option<(Instant, Instant)>,
}

/// Shared backend state.
#[derive(Debug, Default)]
struct SimState {
    /// Pins already handed out.
    claimed: HashSet<u8>,
    /// Current level of every digital output.
    levels: HashMap<u8, Level>,
    /// Last duty written per PWM pin.
    duty: HashMap<u8, u32>,
    /// Full duty write history per PWM pin.
    duty_history: HashMap<u8, Vec<u32>>,
    /// PWM pins currently silenced via `disable()`.
    disabled: HashSet<u8>,
    /// Scripted ultrasonic pair, if linked.
    ultrasonic: Option<UltrasonicSim>,
}

impl SimState {
    /// Claim a pin exclusively.
    fn claim(&mut self, pin: u8) -> Result<(), HalError> {
        if !self.claimed.insert(pin) {
            return Err(HalError::PinUnavailable {
                pin,
                reason: "already claimed".to_string(),
            });
        }
        Ok(())
    }

    /// Handle a digital write, driving the scripted echo if the pin is the
    /// linked trigger.
    fn digital_write(&mut self, pin: u8, level: Level) {
        self.levels.insert(pin, level);

        let Some(us) = self.ultrasonic.as_mut() else {
            return;
        };
        if us.trigger_pin != pin {
            return;
        }
        match level {
            Level::High => us.trigger_high = true,
            Level::Low if us.trigger_high => {
                // Falling edge fires the ranging cycle.
                us.trigger_high = false;
                let pulse = us.pulses.pop_front().flatten();
                us.window = pulse.map(|width| {
                    let start = Instant::now() + ECHO_LATENCY;
                    (start, start + width)
                });
                trace!("sim trigger fired, echo window: {:?}", us.window);
            }
            Level::Low => {}
        }
    }

    /// Sample a digital input, consulting the echo window for the linked
    /// echo pin.
    fn digital_read(&mut self, pin: u8) -> Level {
        if let Some(us) = self.ultrasonic.as_mut() {
            if us.echo_pin == pin {
                let now = Instant::now();
                if let Some((start, end)) = us.window {
                    if now >= end {
                        us.window = None;
                        return Level::Low;
                    }
                    if now >= start {
                        return Level::High;
                    }
                }
                return Level::Low;
            }
        }
        *self.levels.get(&pin).unwrap_or(&Level::Low)
    }
}

/// Simulation backend. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct SimBackend {
    state: Arc<Mutex<SimState>>,
}

impl SimBackend {
    /// Create an empty simulation backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate a trigger/echo pin pair so scripted pulses drive the echo
    /// input. Call before the sensor claims the pins.
    pub fn link_ultrasonic(&self, trigger_pin: u8, echo_pin: u8) {
        self.state.lock().ultrasonic = Some(UltrasonicSim {
            trigger_pin,
            echo_pin,
            trigger_high: false,
            pulses: VecDeque::new(),
            window: None,
        });
    }

    /// Queue one echo response; `None` yields no echo (sensor timeout).
    ///
    /// # Panics
    ///
    /// Panics if no ultrasonic pair has been linked — scripting without a
    /// link is a test-harness bug.
    pub fn queue_echo(&self, pulse: Option<Duration>) {
        let mut state = self.state.lock();
        state
            .ultrasonic
            .as_mut()
            .expect("link_ultrasonic before queue_echo")
            .pulses
            .push_back(pulse);
    }

    /// Echo pulse width corresponding to a round-trip distance.
    pub fn pulse_for_distance(cm: f32) -> Duration {
        Duration::from_micros((cm * 2.0 / SOUND_CM_PER_US) as u64)
    }

    /// Last duty written to a PWM pin.
    pub fn last_duty(&self, pin: u8) -> Option<u32> {
        self.state.lock().duty.get(&pin).copied()
    }

    /// Full duty write history of a PWM pin.
    pub fn duty_history(&self, pin: u8) -> Vec<u32> {
        self.state
            .lock()
            .duty_history
            .get(&pin)
            .cloned()
            .unwrap_or_default()
    }

    /// Forget all recorded duty writes (state and claims are kept).
    pub fn clear_duty_history(&self) {
        self.state.lock().duty_history.clear();
    }

    /// Whether a PWM pin is currently silenced.
    pub fn is_pwm_disabled(&self, pin: u8) -> bool {
        self.state.lock().disabled.contains(&pin)
    }

    /// Current level of a digital output pin.
    pub fn output_level(&self, pin: u8) -> Option<Level> {
        self.state.lock().levels.get(&pin).copied()
    }
}

impl GpioBackend for SimBackend {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn digital_output(&mut self, pin: u8) -> Result<Box<dyn DigitalOutput>, HalError> {
        let mut state = self.state.lock();
        state.claim(pin)?;
        state.levels.insert(pin, Level::Low);
        Ok(Box::new(SimDigitalOutput {
            pin,
            state: Arc::clone(&self.state),
        }))
    }

    fn digital_input(&mut self, pin: u8) -> Result<Box<dyn DigitalInput>, HalError> {
        self.state.lock().claim(pin)?;
        Ok(Box::new(SimDigitalInput {
            pin,
            state: Arc::clone(&self.state),
        }))
    }

    fn pwm_output(&mut self, pin: u8, range: u32) -> Result<Box<dyn PwmOutput>, HalError> {
        self.state.lock().claim(pin)?;
        Ok(Box::new(SimPwm {
            pin,
            range,
            state: Arc::clone(&self.state),
        }))
    }
}

/// Simulated digital output handle.
struct SimDigitalOutput {
    pin: u8,
    state: Arc<Mutex<SimState>>,
}

impl DigitalOutput for SimDigitalOutput {
    fn write(&mut self, level: Level) -> Result<(), HalError> {
        self.state.lock().digital_write(self.pin, level);
        Ok(())
    }
}

/// Simulated digital input handle.
struct SimDigitalInput {
    pin: u8,
    state: Arc<Mutex<SimState>>,
}

impl DigitalInput for SimDigitalInput {
    fn read(&self) -> Result<Level, HalError> {
        Ok(self.state.lock().digital_read(self.pin))
    }
}

/// Simulated PWM output handle.
struct SimPwm {
    pin: u8,
    range: u32,
    state: Arc<Mutex<SimState>>,
}

impl PwmOutput for SimPwm {
    fn write(&mut self, duty: u32) -> Result<(), HalError> {
        if duty > self.range {
            return Err(HalError::DutyOutOfRange {
                pin: self.pin,
                duty,
                range: self.range,
            });
        }
        let mut state = self.state.lock();
        state.duty.insert(self.pin, duty);
        state.duty_history.entry(self.pin).or_default().push(duty);
        state.disabled.remove(&self.pin);
        Ok(())
    }

    fn disable(&mut self) -> Result<(), HalError> {
        self.state.lock().disabled.insert(self.pin);
        Ok(())
    }

    fn range(&self) -> u32 {
        self.range
    }
}
