//! Joint controller: validated and interpolated servo motion.
//!
//! Owns the per-joint angle state exclusively. Angles are validated at the
//! boundary (reject, not clamp); only the derived duty value is clamped into
//! a conservative sub-range as a mechanical safety net against overdrive.
//!
//! Smooth moves observe the shared halt/running flags before every
//! interpolation step, so a STOP command or shutdown preempts an in-flight
//! move within one step's delay.

use std::thread;

use heapless::Vec;
use thiserror::Error;
use tracing::warn;

use arm_common::consts::{HOME_ANGLE_DEG, MAX_ANGLE_DEG, MAX_JOINTS, SERVO_DUTY_MAX,
                         SERVO_DUTY_MIN, SERVO_PWM_RANGE, SERVO_SETTLE_DELAY,
                         SMOOTH_STEP_DELAY};
use arm_common::context::ControlContext;
use arm_hal::gpio::{GpioBackend, PwmOutput};
use arm_hal::HalError;

/// Error type for joint operations.
#[derive(Debug, Error)]
pub enum ServoError {
    /// Joint id outside the arm.
    #[error("invalid joint id {0}")]
    InvalidJoint(u8),

    /// Angle outside [0, 180].
    #[error("invalid angle {0}°")]
    InvalidAngle(u8),

    /// A slice argument does not have one entry per joint.
    #[error("expected one entry per joint, got {0}")]
    LengthMismatch(usize),

    /// `smooth_move` called with zero steps.
    #[error("smooth move requires at least one step")]
    InvalidStepCount,

    /// Motion abandoned because a halt or shutdown was signaled.
    #[error("motion interrupted")]
    Interrupted,

    /// Underlying pin fault.
    #[error(transparent)]
    Hal(#[from] HalError),
}

/// One controllable rotational actuator.
struct Joint {
    /// Owned PWM handle.
    pwm: Box<dyn PwmOutput>,
    /// Last commanded angle [deg].
    current_angle: u8,
}

/// Controller owning every joint of the arm.
///
/// Index = joint id: base, shoulder, elbow, wrist, gripper.
pub struct JointController {
    joints: Vec<Joint, MAX_JOINTS>,
}

impl JointController {
    /// Claim one PWM pin per joint and move the arm to the home posture.
    ///
    /// # Errors
    ///
    /// Propagates pin acquisition failures — fatal at startup.
    pub fn new(backend: &mut dyn GpioBackend, pins: &[u8]) -> Result<Self, ServoError> {
        if pins.len() != MAX_JOINTS {
            return Err(ServoError::LengthMismatch(pins.len()));
        }
        let mut joints = Vec::new();
        for &pin in pins {
            let pwm = backend.pwm_output(pin, SERVO_PWM_RANGE)?;
            joints
                .push(Joint {
                    pwm,
                    current_angle: HOME_ANGLE_DEG,
                })
                .map_err(|_| ServoError::LengthMismatch(pins.len()))?;
        }
        let mut controller = Self { joints };
        controller.home()?;
        Ok(controller)
    }

    /// Number of joints.
    #[inline]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Stored angle of one joint.
    pub fn angle(&self, id: u8) -> Result<u8, ServoError> {
        self.joints
            .get(id as usize)
            .map(|j| j.current_angle)
            .ok_or(ServoError::InvalidJoint(id))
    }

    /// Stored angle of every joint, index = joint id.
    pub fn angles(&self) -> Vec<u8, MAX_JOINTS> {
        self.joints.iter().map(|j| j.current_angle).collect()
    }

    /// Move one joint to an absolute angle.
    ///
    /// Rejects invalid input without touching hardware; on success the duty
    /// is written, the angle recorded, and the settle delay observed.
    pub fn set_angle(&mut self, id: u8, angle: u8) -> Result<(), ServoError> {
        if angle > MAX_ANGLE_DEG {
            return Err(ServoError::InvalidAngle(angle));
        }
        let joint = self
            .joints
            .get_mut(id as usize)
            .ok_or(ServoError::InvalidJoint(id))?;

        joint.pwm.write(duty_for_angle(angle))?;
        joint.current_angle = angle;
        thread::sleep(SERVO_SETTLE_DELAY);
        Ok(())
    }

    /// Apply one angle per joint.
    ///
    /// Attempts every joint even after a failure and returns the first
    /// error after the full pass.
    pub fn set_angles(&mut self, angles: &[u8]) -> Result<(), ServoError> {
        if angles.len() != self.joints.len() {
            return Err(ServoError::LengthMismatch(angles.len()));
        }
        let mut first_err = None;
        for (id, &angle) in angles.iter().enumerate() {
            if let Err(e) = self.set_angle(id as u8, angle) {
                warn!("joint {id}: {e}");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Linearly interpolate from the current angle to `target` over `steps`
    /// writes, with the fixed per-step delay.
    ///
    /// The final step snaps exactly to `target`, eliminating rounding drift
    /// from the truncated step size. The halt/running flags are checked
    /// before every step; a raised flag abandons the move with
    /// [`ServoError::Interrupted`].
    pub fn smooth_move(
        &mut self,
        id: u8,
        target: u8,
        steps: u32,
        ctx: &ControlContext,
    ) -> Result<(), ServoError> {
        if steps == 0 {
            return Err(ServoError::InvalidStepCount);
        }
        if target > MAX_ANGLE_DEG {
            return Err(ServoError::InvalidAngle(target));
        }
        let current = self.angle(id)?;

        for angle in interpolated_angles(current, target, steps) {
            if ctx.should_abort_motion() {
                return Err(ServoError::Interrupted);
            }
            self.set_angle(id, angle)?;
            thread::sleep(SMOOTH_STEP_DELAY);
        }
        Ok(())
    }

    /// Move every joint to the neutral midpoint.
    pub fn home(&mut self) -> Result<(), ServoError> {
        self.set_angles(&[HOME_ANGLE_DEG; MAX_JOINTS])
    }

    /// Silence every joint output immediately, independent of any
    /// interpolation in progress.
    ///
    /// Stored angles are deliberately untouched: outputs go quiet but the
    /// last-known positions remain recorded, since no absolute-position
    /// readback exists.
    pub fn emergency_stop(&mut self) -> Result<(), ServoError> {
        let mut first_err = None;
        for joint in &mut self.joints {
            if let Err(e) = joint.pwm.disable() {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), |e| Err(e.into()))
    }
}

/// Duty value for an angle: linear map into the PWM range, clamped into the
/// conservative safe sub-range.
#[inline]
pub fn duty_for_angle(angle: u8) -> u32 {
    let duty = angle as u32 * SERVO_PWM_RANGE / MAX_ANGLE_DEG as u32;
    duty.clamp(SERVO_DUTY_MIN, SERVO_DUTY_MAX)
}

/// The exact write sequence of a smooth move: `steps` angles from `current`
/// towards `target`, truncated integer step size, last entry exactly
/// `target`.
pub fn interpolated_angles(current: u8, target: u8, steps: u32) -> std::vec::Vec<u8> {
    let current = current as i32;
    let target = target as i32;
    let step = (target - current) / steps as i32;

    (1..=steps)
        .map(|i| {
            if i == steps {
                target as u8
            } else {
                (current + step * i as i32) as u8
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arm_hal::SimBackend;

    const PINS: [u8; MAX_JOINTS] = [18, 19, 20, 21, 22];

    fn rig() -> (SimBackend, JointController) {
        let mut backend = SimBackend::new();
        let controller = JointController::new(&mut backend, &PINS).unwrap();
        // forget the duty writes of the startup homing
        backend.clear_duty_history();
        (backend, controller)
    }

    #[test]
    fn construction_homes_every_joint() {
        let mut backend = SimBackend::new();
        let controller = JointController::new(&mut backend, &PINS).unwrap();
        assert_eq!(controller.angles().as_slice(), &[90, 90, 90, 90, 90]);
        for pin in PINS {
            assert_eq!(backend.last_duty(pin), Some(duty_for_angle(90)));
        }
    }

    #[test]
    fn wrong_pin_count_is_rejected() {
        let mut backend = SimBackend::new();
        assert!(matches!(
            JointController::new(&mut backend, &[18, 19]),
            Err(ServoError::LengthMismatch(2))
        ));
    }

    #[test]
    fn set_angle_stores_exact_angle_and_safe_duty() {
        let (backend, mut controller) = rig();
        for angle in [0u8, 1, 17, 23, 90, 135, 179, 180] {
            controller.set_angle(0, angle).unwrap();
            assert_eq!(controller.angle(0).unwrap(), angle);
            let duty = backend.last_duty(PINS[0]).unwrap();
            assert!((SERVO_DUTY_MIN..=SERVO_DUTY_MAX).contains(&duty));
        }
    }

    #[test]
    fn set_angle_rejects_invalid_input_without_writing() {
        let (backend, mut controller) = rig();
        assert!(matches!(
            controller.set_angle(0, 181),
            Err(ServoError::InvalidAngle(181))
        ));
        assert!(matches!(
            controller.set_angle(5, 90),
            Err(ServoError::InvalidJoint(5))
        ));
        assert_eq!(controller.angle(0).unwrap(), HOME_ANGLE_DEG);
        assert!(backend.duty_history(PINS[0]).is_empty());
    }

    #[test]
    fn set_angles_attempts_every_joint() {
        let (_backend, mut controller) = rig();
        // joint 2 gets an invalid angle; the rest must still move
        let result = controller.set_angles(&[10, 20, 200, 40, 50]);
        assert!(matches!(result, Err(ServoError::InvalidAngle(200))));
        assert_eq!(controller.angles().as_slice(), &[10, 20, 90, 40, 50]);
    }

    #[test]
    fn set_angles_length_mismatch() {
        let (_backend, mut controller) = rig();
        assert!(matches!(
            controller.set_angles(&[90, 90]),
            Err(ServoError::LengthMismatch(2))
        ));
    }

    #[test]
    fn interpolation_plan_is_exact() {
        assert_eq!(interpolated_angles(90, 0, 5), vec![72, 54, 36, 18, 0]);
        assert_eq!(interpolated_angles(0, 180, 4), vec![45, 90, 135, 180]);
        // non-divisible delta: truncated steps, final snap
        assert_eq!(interpolated_angles(0, 10, 3), vec![3, 6, 10]);
        assert_eq!(interpolated_angles(45, 45, 2), vec![45, 45]);
    }

    #[test]
    fn smooth_move_ends_exactly_on_target() {
        let (backend, mut controller) = rig();
        let ctx = ControlContext::new();
        controller.smooth_move(0, 0, 5, &ctx).unwrap();
        assert_eq!(controller.angle(0).unwrap(), 0);
        // duty trace of the 90→0 plan: 72,54,36,18,0
        assert_eq!(
            backend.duty_history(PINS[0]),
            vec![25, 25, 25, 20, 5]
        );
    }

    #[test]
    fn smooth_move_rejects_zero_steps_without_writing() {
        let (backend, mut controller) = rig();
        let ctx = ControlContext::new();
        assert!(matches!(
            controller.smooth_move(0, 0, 0, &ctx),
            Err(ServoError::InvalidStepCount)
        ));
        assert!(backend.duty_history(PINS[0]).is_empty());
        assert_eq!(controller.angle(0).unwrap(), HOME_ANGLE_DEG);
    }

    #[test]
    fn smooth_move_observes_halt() {
        let (backend, mut controller) = rig();
        let ctx = ControlContext::new();
        ctx.request_halt();
        assert!(matches!(
            controller.smooth_move(0, 0, 5, &ctx),
            Err(ServoError::Interrupted)
        ));
        assert!(backend.duty_history(PINS[0]).is_empty());
    }

    #[test]
    fn emergency_stop_silences_outputs_and_keeps_angles() {
        let (backend, mut controller) = rig();
        controller.set_angle(1, 45).unwrap();
        controller.emergency_stop().unwrap();
        for pin in PINS {
            assert!(backend.is_pwm_disabled(pin));
        }
        assert_eq!(controller.angle(1).unwrap(), 45);
    }

    #[test]
    fn home_returns_to_neutral() {
        let (_backend, mut controller) = rig();
        controller.set_angle(0, 10).unwrap();
        controller.set_angle(4, 170).unwrap();
        controller.home().unwrap();
        assert_eq!(controller.angles().as_slice(), &[90; 5]);
    }
}
