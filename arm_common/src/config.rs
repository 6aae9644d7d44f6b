//! Configuration loading traits and types.
//!
//! TOML configuration for the control unit: pin assignments, sensor limits
//! and the (currently unused) vision section. Every table has hardware
//! defaults so a missing file falls back to the stock wiring.
//!
//! # TOML Example
//!
//! ```toml
//! [arm]
//! name = "smartarm-01"
//!
//! [pins]
//! servos = [18, 19, 20, 21, 22]
//! trigger = 23
//! echo = 24
//! motor_pwm = 12
//! motor_dir1 = 16
//! motor_dir2 = 26
//!
//! [sensor]
//! max_distance_cm = 400.0
//! grab_threshold_cm = 20.0
//! samples = 3
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::consts::{DEFAULT_GRAB_THRESHOLD_CM, DEFAULT_MAX_DISTANCE_CM, DETECTION_SAMPLES,
                    MAX_JOINTS, MIN_DISTANCE_CM};

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

/// Identity section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArmSection {
    /// Instance identifier, used in startup logging.
    pub name: String,
}

impl Default for ArmSection {
    fn default() -> Self {
        Self {
            name: "smartarm".to_string(),
        }
    }
}

/// BCM pin assignments for every hardware capability the controllers consume.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PinConfig {
    /// Servo PWM pins, one per joint, index = joint id
    /// (base, shoulder, elbow, wrist, gripper).
    pub servos: Vec<u8>,
    /// Ultrasonic trigger output.
    pub trigger: u8,
    /// Ultrasonic echo input.
    pub echo: u8,
    /// Drive-motor PWM output.
    pub motor_pwm: u8,
    /// Drive-motor direction output 1.
    pub motor_dir1: u8,
    /// Drive-motor direction output 2.
    pub motor_dir2: u8,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            servos: vec![18, 19, 20, 21, 22],
            trigger: 23,
            echo: 24,
            motor_pwm: 12,
            motor_dir1: 16,
            motor_dir2: 26,
        }
    }
}

/// Distance-sensor limits and detection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SensorConfig {
    /// Upper bound for valid readings [cm].
    pub max_distance_cm: f32,
    /// Proximity threshold arming the grab sequence [cm].
    pub grab_threshold_cm: f32,
    /// Samples averaged per detection pass.
    pub samples: usize,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            max_distance_cm: DEFAULT_MAX_DISTANCE_CM,
            grab_threshold_cm: DEFAULT_GRAB_THRESHOLD_CM,
            samples: DETECTION_SAMPLES,
        }
    }
}

/// Vision-tracking parameters. Parsed and validated, consumed by nothing —
/// detection is proximity-based; the camera pipeline never shipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VisionConfig {
    /// Camera frame width [px].
    pub camera_width: u32,
    /// Camera frame height [px].
    pub camera_height: u32,
    /// Minimum detection confidence, `0.0..=1.0`.
    pub detection_confidence: f32,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            camera_width: 640,
            camera_height: 480,
            detection_confidence: 0.5,
        }
    }
}

/// Top-level configuration for the control unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArmConfig {
    /// Identity section.
    pub arm: ArmSection,
    /// Pin assignments.
    pub pins: PinConfig,
    /// Sensor limits.
    pub sensor: SensorConfig,
    /// Vision parameters (unused).
    pub vision: VisionConfig,
}

impl ArmConfig {
    /// Load from `path`, falling back to built-in defaults when the file is
    /// absent. Parse and validation failures are still fatal.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        let config = match Self::load(path) {
            Ok(config) => config,
            Err(ConfigError::FileNotFound) => {
                warn!("no config at {}, using built-in defaults", path.display());
                Self::default()
            }
            Err(e) => return Err(e),
        };
        config.validate()?;
        Ok(config)
    }

    /// Semantic validation.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - the servo pin list does not have exactly one pin per joint
    /// - any pin is assigned twice
    /// - sensor limits are non-positive or inconsistent
    /// - vision parameters are out of range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pins.servos.len() != MAX_JOINTS {
            return Err(ConfigError::ValidationError(format!(
                "expected {} servo pins, got {}",
                MAX_JOINTS,
                self.pins.servos.len()
            )));
        }

        let mut seen = HashSet::new();
        let all_pins = self
            .pins
            .servos
            .iter()
            .copied()
            .chain([
                self.pins.trigger,
                self.pins.echo,
                self.pins.motor_pwm,
                self.pins.motor_dir1,
                self.pins.motor_dir2,
            ]);
        for pin in all_pins {
            if !seen.insert(pin) {
                return Err(ConfigError::ValidationError(format!(
                    "pin {pin} assigned more than once"
                )));
            }
        }

        if self.sensor.max_distance_cm <= MIN_DISTANCE_CM {
            return Err(ConfigError::ValidationError(format!(
                "max_distance_cm must exceed {MIN_DISTANCE_CM}"
            )));
        }
        if self.sensor.grab_threshold_cm <= MIN_DISTANCE_CM
            || self.sensor.grab_threshold_cm > self.sensor.max_distance_cm
        {
            return Err(ConfigError::ValidationError(format!(
                "grab_threshold_cm {} outside ({MIN_DISTANCE_CM}, {}]",
                self.sensor.grab_threshold_cm, self.sensor.max_distance_cm
            )));
        }
        if self.sensor.samples == 0 {
            return Err(ConfigError::ValidationError(
                "samples must be at least 1".to_string(),
            ));
        }

        if self.vision.camera_width == 0 || self.vision.camera_height == 0 {
            return Err(ConfigError::ValidationError(
                "camera resolution must be nonzero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.vision.detection_confidence) {
            return Err(ConfigError::ValidationError(format!(
                "detection_confidence {} outside [0, 1]",
                self.vision.detection_confidence
            )));
        }

        Ok(())
    }
}
