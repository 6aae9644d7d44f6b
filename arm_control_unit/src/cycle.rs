//! Control loop: autonomous detection, the grab sequence and the status
//! cadence.
//!
//! The loop runs at a fixed base period. In AUTO mode each pass averages a
//! few sensor samples and, below the proximity threshold, executes the grab
//! choreography; in MANUAL it performs no autonomous sampling or movement.
//! Status snapshots are time-driven, once per second, independent of mode.
//!
//! Preemption: every smooth move checks the shared halt/running flags per
//! interpolation step and the in-sequence pauses sleep in small slices, so
//! a STOP command or shutdown interrupts the choreography with bounded
//! latency. The post-grab cooldown is a deadline, not a sleep — the loop
//! keeps cycling (and publishing status) while detection re-arms.

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use arm_common::config::SensorConfig;
use arm_common::consts::{GRAB_COOLDOWN, GRAB_PAUSE, HALT_POLL, LOOP_PERIOD, STATUS_INTERVAL};
use arm_common::context::{ControlContext, Mode};
use arm_common::status::StatusReport;

use crate::motor::MotorController;
use crate::sensor::UltrasonicSensor;
use crate::servo::{JointController, ServoError};
use crate::transport::StatusSink;

// ─── Grab choreography ──────────────────────────────────────────────

const SHOULDER_JOINT: u8 = 1;
const ELBOW_JOINT: u8 = 2;
const GRIPPER_JOINT: u8 = 4;

/// Shoulder lowered to the pick position [deg].
const SHOULDER_PICK_DEG: u8 = 45;
/// Shoulder raised to carry [deg].
const SHOULDER_CARRY_DEG: u8 = 90;
/// Elbow extended over the object [deg].
const ELBOW_EXTENDED_DEG: u8 = 120;
/// Elbow retracted [deg].
const ELBOW_RETRACTED_DEG: u8 = 90;
/// Gripper fully open [deg].
const GRIPPER_OPEN_DEG: u8 = 0;
/// Gripper fully closed [deg].
const GRIPPER_CLOSED_DEG: u8 = 180;

/// Interpolation steps for shoulder/elbow moves.
const ARM_MOVE_STEPS: u32 = 5;
/// Interpolation steps for gripper moves.
const GRIPPER_MOVE_STEPS: u32 = 3;

/// The orchestrating control loop.
pub struct ControlLoop {
    ctx: Arc<ControlContext>,
    joints: Arc<Mutex<JointController>>,
    motor: Arc<Mutex<MotorController>>,
    /// Owned exclusively — only the loop samples the sensor.
    sensor: UltrasonicSensor,
    sink: Box<dyn StatusSink>,
    /// Proximity threshold arming the grab sequence [cm].
    grab_threshold_cm: f32,
    /// Samples averaged per detection pass.
    samples: usize,
    /// Latest averaged reading since the last status snapshot.
    last_distance: Option<f32>,
    /// Detection re-arm deadline after a grab.
    cooldown_until: Option<Instant>,
    /// Time of the previous status snapshot.
    last_status: Instant,
}

impl ControlLoop {
    /// Assemble the loop around the shared controllers.
    pub fn new(
        ctx: Arc<ControlContext>,
        joints: Arc<Mutex<JointController>>,
        motor: Arc<Mutex<MotorController>>,
        sensor: UltrasonicSensor,
        sink: Box<dyn StatusSink>,
        sensor_config: &SensorConfig,
    ) -> Self {
        Self {
            ctx,
            joints,
            motor,
            sensor,
            sink,
            grab_threshold_cm: sensor_config.grab_threshold_cm,
            samples: sensor_config.samples,
            last_distance: None,
            cooldown_until: None,
            last_status: Instant::now(),
        }
    }

    /// Run until shutdown, then silence all outputs.
    pub fn run(&mut self) {
        info!(
            "control loop running ({} samples per pass, grab below {} cm)",
            self.samples, self.grab_threshold_cm
        );

        while self.ctx.is_running() {
            self.tick();
            thread::sleep(LOOP_PERIOD);
        }

        // Outputs must go quiet regardless of shutdown cause.
        if let Err(e) = self.joints.lock().emergency_stop() {
            warn!("shutdown emergency stop failed: {e}");
        }
        if let Err(e) = self.motor.lock().stop() {
            warn!("shutdown motor stop failed: {e}");
        }
        info!("control loop stopped");
    }

    /// One loop pass: re-arm the halt signal, run detection when armed,
    /// publish a due status snapshot.
    pub fn tick(&mut self) {
        // Any pending halt has been honored by the time the loop regains
        // control; re-arm so the next sequence is preemptible again.
        self.ctx.clear_halt();

        if self.ctx.mode() == Mode::Auto && self.cooldown_over() {
            self.detect_and_grab();
        }

        self.publish_due_status();
    }

    fn cooldown_over(&self) -> bool {
        self.cooldown_until.is_none_or(|t| Instant::now() >= t)
    }

    /// Sample the sensor; a valid reading strictly below the threshold
    /// triggers the grab sequence and starts the cooldown.
    fn detect_and_grab(&mut self) {
        match self.sensor.average(self.samples) {
            Ok(distance) => {
                self.last_distance = Some(distance);
                if proximity_trigger(distance, self.grab_threshold_cm) {
                    info!("object at {distance:.1} cm — executing grab sequence");
                    match self.grab_sequence() {
                        Ok(()) => info!("grab sequence completed"),
                        Err(ServoError::Interrupted) => warn!("grab sequence preempted"),
                        Err(e) => warn!("grab sequence failed: {e}"),
                    }
                    self.cooldown_until = Some(Instant::now() + GRAB_COOLDOWN);
                }
            }
            Err(e) => {
                self.last_distance = None;
                debug!("no object detected: {e}");
            }
        }
    }

    /// The fixed pick-and-lift choreography.
    fn grab_sequence(&mut self) -> Result<(), ServoError> {
        self.guarded_move(SHOULDER_JOINT, SHOULDER_PICK_DEG, ARM_MOVE_STEPS)?;
        self.guarded_move(ELBOW_JOINT, ELBOW_EXTENDED_DEG, ARM_MOVE_STEPS)?;
        self.guarded_move(GRIPPER_JOINT, GRIPPER_OPEN_DEG, GRIPPER_MOVE_STEPS)?;
        self.pause()?;
        self.guarded_move(GRIPPER_JOINT, GRIPPER_CLOSED_DEG, GRIPPER_MOVE_STEPS)?;
        self.pause()?;
        self.guarded_move(SHOULDER_JOINT, SHOULDER_CARRY_DEG, ARM_MOVE_STEPS)?;
        self.guarded_move(ELBOW_JOINT, ELBOW_RETRACTED_DEG, ARM_MOVE_STEPS)
    }

    /// One smooth move under the joint lock. The lock is released between
    /// moves so intake commands interleave with bounded latency.
    fn guarded_move(&self, id: u8, target: u8, steps: u32) -> Result<(), ServoError> {
        self.joints.lock().smooth_move(id, target, steps, &self.ctx)
    }

    /// Sleep [`GRAB_PAUSE`] in small slices, abandoning the sequence when a
    /// halt or shutdown is signaled.
    fn pause(&self) -> Result<(), ServoError> {
        let deadline = Instant::now() + GRAB_PAUSE;
        loop {
            if self.ctx.should_abort_motion() {
                return Err(ServoError::Interrupted);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            thread::sleep(HALT_POLL.min(deadline - now));
        }
    }

    /// Publish a snapshot once per interval. The distance slot is consumed
    /// on publish: `-1` on the wire means no valid reading this cycle.
    fn publish_due_status(&mut self) {
        if self.last_status.elapsed() < STATUS_INTERVAL {
            return;
        }
        let report = StatusReport::new(
            self.ctx.mode(),
            self.last_distance.take(),
            self.joints.lock().angles(),
            self.motor.lock().speed(),
        );
        self.sink.publish(&report);
        self.last_status = Instant::now();
    }
}

/// Strictly-below comparison arming the grab sequence: a reading exactly at
/// the threshold does not trigger.
#[inline]
fn proximity_trigger(distance: f32, threshold_cm: f32) -> bool {
    distance < threshold_cm
}
