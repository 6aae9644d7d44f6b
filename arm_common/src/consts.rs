//! System-wide constants for the smart-arm workspace.
//!
//! Single source of truth for all numeric limits and timing parameters.
//! Imported by all crates — no duplication permitted.

use std::time::Duration;

use static_assertions::const_assert;

/// Number of joints in the arm (base, shoulder, elbow, wrist, gripper).
pub const MAX_JOINTS: usize = 5;

/// Minimum valid joint angle [deg].
pub const MIN_ANGLE_DEG: u8 = 0;

/// Maximum valid joint angle [deg].
pub const MAX_ANGLE_DEG: u8 = 180;

/// Neutral "home" angle — midpoint of the valid range [deg].
pub const HOME_ANGLE_DEG: u8 = 90;

/// Software-PWM range used for servo outputs (one unit = 100 µs).
pub const SERVO_PWM_RANGE: u32 = 200;

/// Lower bound of the conservative servo duty sub-range.
pub const SERVO_DUTY_MIN: u32 = 5;

/// Upper bound of the conservative servo duty sub-range.
pub const SERVO_DUTY_MAX: u32 = 25;

/// Software-PWM range used for the motor output (duty = |speed|).
pub const MOTOR_PWM_RANGE: u32 = 100;

/// Maximum motor speed magnitude.
pub const MAX_MOTOR_SPEED: i8 = 100;

/// Settle delay after each servo write.
pub const SERVO_SETTLE_DELAY: Duration = Duration::from_millis(20);

/// Delay between interpolation steps of a smooth move.
pub const SMOOTH_STEP_DELAY: Duration = Duration::from_millis(50);

/// Width of the ultrasonic trigger pulse.
pub const TRIGGER_PULSE: Duration = Duration::from_micros(10);

/// Deadline for each echo edge (rising and falling).
pub const ECHO_TIMEOUT: Duration = Duration::from_millis(30);

/// Delay between successive samples when averaging.
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(60);

/// Speed of sound [cm/µs] at ambient temperature.
pub const SOUND_CM_PER_US: f32 = 0.0343;

/// Readings below this are discarded as sensor noise [cm].
pub const MIN_DISTANCE_CM: f32 = 2.0;

/// Default upper bound for valid readings [cm].
pub const DEFAULT_MAX_DISTANCE_CM: f32 = 400.0;

/// Default proximity threshold that arms the grab sequence [cm].
pub const DEFAULT_GRAB_THRESHOLD_CM: f32 = 20.0;

/// Number of samples averaged per autonomous detection pass.
pub const DETECTION_SAMPLES: usize = 3;

/// Re-arm delay after a grab sequence.
pub const GRAB_COOLDOWN: Duration = Duration::from_secs(3);

/// Pause between gripper actions inside the grab sequence.
pub const GRAB_PAUSE: Duration = Duration::from_millis(500);

/// Granularity at which pauses and waits observe the halt/running flags.
pub const HALT_POLL: Duration = Duration::from_millis(10);

/// Base period of the control loop.
pub const LOOP_PERIOD: Duration = Duration::from_millis(100);

/// Interval between status snapshots.
pub const STATUS_INTERVAL: Duration = Duration::from_secs(1);

/// Status-snapshot sentinel for "no valid reading this cycle".
pub const NO_READING: f32 = -1.0;

const_assert!(HOME_ANGLE_DEG <= MAX_ANGLE_DEG);
const_assert!(SERVO_DUTY_MIN < SERVO_DUTY_MAX);
const_assert!(SERVO_DUTY_MAX <= SERVO_PWM_RANGE);
const_assert!(MAX_JOINTS > 0);
