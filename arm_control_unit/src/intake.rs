//! Command intake: parsing, mode arbitration and application.
//!
//! Invoked once per inbound line. Actuation commands are gated on the
//! current mode; STOP and HOME are honored unconditionally. Invalid input
//! is dropped with a diagnostic and never mutates state — no acknowledgment
//! is sent either way.

use std::sync::Arc;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use parking_lot::Mutex;
use tracing::{info, warn};

use arm_common::command::Command;
use arm_common::consts::LOOP_PERIOD;
use arm_common::context::{ControlContext, Mode};

use crate::motor::MotorController;
use crate::servo::JointController;

/// Applies remote commands against the shared controllers.
pub struct CommandIntake {
    ctx: Arc<ControlContext>,
    joints: Arc<Mutex<JointController>>,
    motor: Arc<Mutex<MotorController>>,
}

impl CommandIntake {
    /// Create an intake bound to the shared control state.
    pub fn new(
        ctx: Arc<ControlContext>,
        joints: Arc<Mutex<JointController>>,
        motor: Arc<Mutex<MotorController>>,
    ) -> Self {
        Self { ctx, joints, motor }
    }

    /// Drain the command channel until shutdown.
    ///
    /// The bounded receive keeps the running flag observed promptly; on
    /// exit the outputs are silenced regardless of shutdown cause
    /// (idempotent with the control loop doing the same).
    pub fn run(&self, commands: Receiver<String>) {
        info!("command intake running");
        while self.ctx.is_running() {
            match commands.recv_timeout(LOOP_PERIOD) {
                Ok(line) => self.handle_line(&line),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    info!("command channel closed");
                    break;
                }
            }
        }

        if let Err(e) = self.joints.lock().emergency_stop() {
            warn!("shutdown emergency stop failed: {e}");
        }
        if let Err(e) = self.motor.lock().stop() {
            warn!("shutdown motor stop failed: {e}");
        }
        info!("command intake stopped");
    }

    /// Parse and apply one message line.
    pub fn handle_line(&self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        match Command::parse(line) {
            Ok(command) => self.apply(command),
            Err(e) => warn!("dropping command '{}': {e}", line.trim()),
        }
    }

    /// Apply one parsed command under the arbitration rules.
    pub fn apply(&self, command: Command) {
        match command {
            Command::SetMode(mode) => {
                self.ctx.set_mode(mode);
                info!("switched to {} mode", mode.as_str());
            }
            Command::SetServo { id, angle } => {
                if self.ctx.mode() != Mode::Manual {
                    warn!("SERVO {id} {angle} ignored in AUTO mode");
                    return;
                }
                match self.joints.lock().set_angle(id, angle) {
                    Ok(()) => info!("manual servo {id} -> {angle}°"),
                    Err(e) => warn!("manual servo {id} failed: {e}"),
                }
            }
            Command::SetMotor { speed } => {
                if self.ctx.mode() != Mode::Manual {
                    warn!("MOTOR {speed} ignored in AUTO mode");
                    return;
                }
                match self.motor.lock().set_speed(speed) {
                    Ok(()) => info!("manual motor speed {speed}"),
                    Err(e) => warn!("manual motor command failed: {e}"),
                }
            }
            Command::Stop => {
                // Raise the preempt signal first: an in-flight grab sequence
                // yields the joint lock within one interpolation step, which
                // bounds how long the stop can wait below.
                self.ctx.request_halt();
                if let Err(e) = self.joints.lock().emergency_stop() {
                    warn!("emergency stop failed: {e}");
                }
                if let Err(e) = self.motor.lock().stop() {
                    warn!("motor stop failed: {e}");
                }
                info!("emergency stop applied");
            }
            Command::Home => match self.joints.lock().home() {
                Ok(()) => info!("moved to home position"),
                Err(e) => warn!("homing failed: {e}"),
            },
        }
    }
}
