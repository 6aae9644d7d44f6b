//! End-to-end tests against the simulation backend: mode arbitration,
//! stop preemption and the autonomous grab behavior.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use arm_common::command::Command;
use arm_common::config::SensorConfig;
use arm_common::consts::NO_READING;
use arm_common::context::{ControlContext, Mode};
use arm_common::status::StatusReport;
use arm_control_unit::cycle::ControlLoop;
use arm_control_unit::intake::CommandIntake;
use arm_control_unit::motor::MotorController;
use arm_control_unit::sensor::UltrasonicSensor;
use arm_control_unit::servo::{JointController, ServoError};
use arm_control_unit::transport::StatusSink;
use arm_hal::SimBackend;

const SERVO_PINS: [u8; 5] = [18, 19, 20, 21, 22];
const TRIG: u8 = 23;
const ECHO: u8 = 24;
const MOTOR_PWM: u8 = 12;
const MOTOR_DIR1: u8 = 16;
const MOTOR_DIR2: u8 = 26;

/// Gripper joint PWM pin (joint 4).
const GRIPPER_PIN: u8 = 22;

/// Shared fixture: simulation backend plus the full controller set.
struct Rig {
    backend: SimBackend,
    ctx: Arc<ControlContext>,
    joints: Arc<Mutex<JointController>>,
    motor: Arc<Mutex<MotorController>>,
}

impl Rig {
    fn new() -> Self {
        let mut backend = SimBackend::new();
        backend.link_ultrasonic(TRIG, ECHO);
        let joints = JointController::new(&mut backend, &SERVO_PINS).unwrap();
        let motor = MotorController::new(&mut backend, MOTOR_PWM, MOTOR_DIR1, MOTOR_DIR2).unwrap();
        backend.clear_duty_history();
        Self {
            backend,
            ctx: Arc::new(ControlContext::new()),
            joints: Arc::new(Mutex::new(joints)),
            motor: Arc::new(Mutex::new(motor)),
        }
    }

    fn intake(&self) -> CommandIntake {
        CommandIntake::new(
            Arc::clone(&self.ctx),
            Arc::clone(&self.joints),
            Arc::clone(&self.motor),
        )
    }

    fn sensor(&mut self) -> UltrasonicSensor {
        UltrasonicSensor::new(&mut self.backend, TRIG, ECHO, 400.0).unwrap()
    }

    fn control_loop(&mut self, sink: Box<dyn StatusSink>, samples: usize) -> ControlLoop {
        let sensor = self.sensor();
        let sensor_config = SensorConfig {
            max_distance_cm: 400.0,
            grab_threshold_cm: 20.0,
            samples,
        };
        ControlLoop::new(
            Arc::clone(&self.ctx),
            Arc::clone(&self.joints),
            Arc::clone(&self.motor),
            sensor,
            sink,
            &sensor_config,
        )
    }

    fn queue_distance(&self, cm: f32, times: usize) {
        for _ in 0..times {
            self.backend
                .queue_echo(Some(SimBackend::pulse_for_distance(cm)));
        }
    }
}

/// Sink collecting snapshots for inspection.
#[derive(Clone, Default)]
struct CollectingSink(Arc<Mutex<Vec<StatusReport>>>);

impl StatusSink for CollectingSink {
    fn publish(&mut self, report: &StatusReport) {
        self.0.lock().push(report.clone());
    }
}

#[test]
fn servo_command_is_gated_on_manual_mode() {
    let rig = Rig::new();
    let intake = rig.intake();

    // AUTO: ignored, angle unchanged
    intake.apply(Command::SetServo { id: 0, angle: 45 });
    assert_eq!(rig.joints.lock().angle(0).unwrap(), 90);

    // MANUAL: honored
    intake.apply(Command::SetMode(Mode::Manual));
    intake.apply(Command::SetServo { id: 0, angle: 45 });
    assert_eq!(rig.joints.lock().angle(0).unwrap(), 45);
}

#[test]
fn motor_command_is_gated_on_manual_mode() {
    let rig = Rig::new();
    let intake = rig.intake();

    intake.apply(Command::SetMotor { speed: 70 });
    assert_eq!(rig.motor.lock().speed(), 0);

    intake.apply(Command::SetMode(Mode::Manual));
    intake.apply(Command::SetMotor { speed: 70 });
    assert_eq!(rig.motor.lock().speed(), 70);
    assert_eq!(rig.backend.last_duty(MOTOR_PWM), Some(70));
}

#[test]
fn home_is_honored_in_any_mode() {
    let rig = Rig::new();
    let intake = rig.intake();

    intake.apply(Command::SetMode(Mode::Manual));
    intake.apply(Command::SetServo { id: 2, angle: 150 });
    intake.apply(Command::SetMode(Mode::Auto));
    intake.apply(Command::Home);
    assert_eq!(rig.joints.lock().angles().as_slice(), &[90; 5]);
}

#[test]
fn stop_preempts_an_inflight_smooth_move() {
    let rig = Rig::new();
    let intake = rig.intake();

    // Long move: 20 steps from 90° to 180°, ~70 ms per step.
    let ctx = Arc::clone(&rig.ctx);
    let joints = Arc::clone(&rig.joints);
    let mover = thread::spawn(move || joints.lock().smooth_move(0, 180, 20, &ctx));

    // Let a few steps land, then stop.
    thread::sleep(Duration::from_millis(200));
    let issued = Instant::now();
    intake.apply(Command::Stop);
    let stop_latency = issued.elapsed();

    let result = mover.join().unwrap();
    assert!(matches!(result, Err(ServoError::Interrupted)));
    // Bounded by one interpolation step plus scheduling slack.
    assert!(
        stop_latency < Duration::from_millis(500),
        "stop took {stop_latency:?}"
    );

    for pin in SERVO_PINS {
        assert!(rig.backend.is_pwm_disabled(pin), "pin {pin} still driven");
    }
    assert_eq!(rig.motor.lock().speed(), 0);
    assert_eq!(rig.backend.last_duty(MOTOR_PWM), Some(0));
}

#[test]
fn grab_runs_below_threshold_and_cooldown_rearms() {
    let mut rig = Rig::new();
    let mut control = rig.control_loop(Box::new(CollectingSink::default()), 3);

    rig.queue_distance(10.0, 3);
    control.tick();

    // Gripper opened (duty 5 for 0°) and closed again.
    let gripper_trace = rig.backend.duty_history(GRIPPER_PIN);
    assert!(gripper_trace.contains(&5), "gripper never opened: {gripper_trace:?}");
    let joints = rig.joints.lock();
    assert_eq!(joints.angle(1).unwrap(), 90); // shoulder carried back up
    assert_eq!(joints.angle(2).unwrap(), 90); // elbow retracted
    assert_eq!(joints.angle(4).unwrap(), 180); // gripper closed
    drop(joints);
    // The drive motor plays no part in the grab.
    assert_eq!(rig.motor.lock().speed(), 0);

    // Cooldown: queued echoes are not even sampled on the next pass.
    rig.backend.clear_duty_history();
    rig.queue_distance(10.0, 3);
    control.tick();
    assert!(rig.backend.duty_history(GRIPPER_PIN).is_empty());
}

#[test]
fn no_grab_at_or_above_threshold() {
    let mut rig = Rig::new();
    let mut control = rig.control_loop(Box::new(CollectingSink::default()), 3);

    // Above the 20 cm threshold, with margin for sim timing jitter; the
    // exact-equality edge is covered by the unit test on the trigger
    // comparison.
    rig.queue_distance(22.0, 3);
    control.tick();
    assert!(rig.backend.duty_history(GRIPPER_PIN).is_empty());
    assert_eq!(rig.joints.lock().angles().as_slice(), &[90; 5]);
}

#[test]
fn no_grab_on_invalid_reading() {
    let mut rig = Rig::new();
    let mut control = rig.control_loop(Box::new(CollectingSink::default()), 3);

    // Empty echo queue: every sample times out.
    control.tick();
    assert!(rig.backend.duty_history(GRIPPER_PIN).is_empty());
}

#[test]
fn status_snapshot_carries_mode_angles_and_sentinel() {
    let mut rig = Rig::new();
    let sink = CollectingSink::default();
    let mut control = rig.control_loop(Box::new(sink.clone()), 3);

    rig.ctx.set_mode(Mode::Manual);
    rig.intake().apply(Command::SetServo { id: 0, angle: 30 });

    // Nothing published before the interval elapses.
    control.tick();
    assert!(sink.0.lock().is_empty());

    thread::sleep(Duration::from_millis(1050));
    control.tick();

    let reports = sink.0.lock();
    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.mode, Mode::Manual);
    // No sampling happens in MANUAL — sentinel on the wire.
    assert_eq!(report.distance, NO_READING);
    assert_eq!(report.servos.as_slice(), &[30, 90, 90, 90, 90]);
    assert_eq!(report.motor_speed, 0);
}

#[test]
fn shutdown_flag_preempts_a_grab_sequence() {
    let mut rig = Rig::new();
    let mut control = rig.control_loop(Box::new(CollectingSink::default()), 1);

    rig.queue_distance(10.0, 1);
    let ctx = Arc::clone(&rig.ctx);
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(300));
        ctx.request_shutdown();
    });
    let started = Instant::now();
    control.tick();
    stopper.join().unwrap();

    // The full choreography takes seconds; shutdown must cut it short.
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "sequence ran to completion despite shutdown"
    );
}
